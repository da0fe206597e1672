use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gpu::{GpuError, GraphicsApi};

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture '{path}' is too large ({width}x{height})")]
    TooLarge { path: PathBuf, width: u32, height: u32 },
}

/// Material slot a texture is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Resolution order when a material is turned into mesh textures.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Normal,
        TextureKind::Height,
    ];

    /// Shader samplers are declared as `{prefix}{n}`, n counting from 1 per kind.
    pub fn sampler_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// GPU side storage format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb,
    Srgb,
    SrgbAlpha,
}

impl TextureFormat {
    /// JPEG has no alpha, PNG does. Both are stored gamma encoded.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("jpg") | Some("jpeg") => TextureFormat::Srgb,
            Some("png") => TextureFormat::SrgbAlpha,
            _ => TextureFormat::Rgb,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, TextureFormat::SrgbAlpha)
    }

    pub fn bytes_per_pixel(self) -> usize {
        if self.has_alpha() {
            4
        } else {
            3
        }
    }
}

/// Decoded pixels ready for upload, rows top to bottom.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let img = image::open(path).map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let format = TextureFormat::from_path(path);
        let (width, height, pixels) = if format.has_alpha() {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            (w, h, rgba.into_raw())
        } else {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            (w, h, rgb.into_raw())
        };

        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(TextureError::TooLarge {
                path: path.to_path_buf(),
                width,
                height,
            });
        }

        Ok(TextureImage {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Creates a texture object, uploads the pixels and builds the mip chain.
    pub fn upload<G: GraphicsApi>(&self, api: &mut G) -> Result<G::Texture, GpuError> {
        let texture = api.create_texture()?;
        api.bind_texture(Some(texture));
        api.tex_image_2d(self);
        api.generate_mipmap();
        api.bind_texture(None);
        Ok(texture)
    }
}

/// Joins a material's texture file name onto the asset directory.
///
/// Exporters on Windows write `\` separators, those are turned into `/` elsewhere.
pub fn resolve_texture_path(directory: &Path, file: &str) -> PathBuf {
    let file = file.trim();
    if std::path::MAIN_SEPARATOR == '/' {
        directory.join(file.replace('\\', "/"))
    } else {
        directory.join(file)
    }
}

/// A texture attached to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture<H> {
    pub handle: H,
    pub kind: TextureKind,
    /// Resolved file path, also the cache key
    pub path: PathBuf,
}

/// Load-once cache of uploaded textures, keyed by resolved path.
#[derive(Debug)]
pub struct TextureCache<H> {
    textures: HashMap<PathBuf, H>,
}

impl<H: Copy> TextureCache<H> {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<H> {
        self.textures.get(path).copied()
    }

    pub fn insert(&mut self, path: PathBuf, handle: H) {
        self.textures.insert(path, handle);
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.textures.keys().map(PathBuf::as_path)
    }

    /// Empties the cache, handing every handle back exactly once.
    pub fn drain(&mut self) -> impl Iterator<Item = H> + '_ {
        self.textures.drain().map(|(_, handle)| handle)
    }
}

impl<H: Copy> Default for TextureCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Texture unit and sampler name for one mesh texture.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerBinding<'a, H> {
    pub unit: u32,
    pub uniform: String,
    pub texture: &'a Texture<H>,
}

/// Walks `textures` once, pairing each with its unit (its position in the list) and its
/// sampler name, e.g. the second diffuse texture becomes `texture_diffuse2`.
pub fn sampler_bindings<H>(textures: &[Texture<H>]) -> impl Iterator<Item = SamplerBinding<'_, H>> {
    let mut counters = [0u32; TextureKind::ALL.len()];
    textures.iter().enumerate().map(move |(unit, texture)| {
        let count = &mut counters[texture.kind.slot()];
        *count += 1;
        SamplerBinding {
            unit: unit as u32,
            uniform: format!("{}{}", texture.kind.sampler_prefix(), count),
            texture,
        }
    })
}
