use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use super::mesh::{Mesh, MeshData, MeshError, UploadError};
use super::texture::{
    resolve_texture_path, Texture, TextureCache, TextureError, TextureImage, TextureKind,
};
use crate::gpu::{GpuContext, GpuError, GraphicsApi};
use crate::import::{
    process, ImportError, ImportFlags, ImportedMaterial, ImportedMesh, SceneImporter,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Asset(#[from] ImportError),
    #[error("mesh {index} ('{name}') is malformed: {source}")]
    Mesh {
        index: usize,
        name: String,
        #[source]
        source: MeshError,
    },
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// All meshes of one asset file plus the textures they share.
pub struct Model<G: GraphicsApi> {
    meshes: Vec<Mesh<G>>,
    directory: PathBuf,
    textures: TextureCache<G::Texture>,
    gamma_correction: bool,
}

impl<G: GraphicsApi> Model<G> {
    /// Imports `path` and uploads every mesh and texture it references.
    ///
    /// Either the whole model is built or nothing is left on the GPU. Texture files that
    /// do not exist are skipped with a warning, the mesh simply has no texture in that slot.
    /// `gamma_correction` is recorded for the caller's shaders, texture formats come from
    /// the file extension.
    pub fn load(
        ctx: &mut GpuContext<G>,
        importer: &impl SceneImporter,
        path: impl AsRef<Path>,
        gamma_correction: bool,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let scene = importer.import(path, ImportFlags::MODEL)?;

        let mut model = Model {
            meshes: Vec::with_capacity(scene.meshes.len()),
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            textures: TextureCache::new(),
            gamma_correction,
        };

        for (index, imported) in scene.meshes.iter().enumerate() {
            if let Err(e) = model.process_mesh(ctx, index, imported, scene.material(imported)) {
                model.release(ctx);
                return Err(e);
            }
        }

        info!(
            "Loaded '{}': {} meshes, {} textures",
            path.display(),
            model.meshes.len(),
            model.textures.len()
        );
        Ok(model)
    }

    pub fn draw(&self, ctx: &mut GpuContext<G>, program: G::Program) {
        for mesh in &self.meshes {
            mesh.draw(ctx, program);
        }
    }

    /// Frees every mesh and every cached texture.
    pub fn release(mut self, ctx: &mut GpuContext<G>) {
        for mesh in self.meshes.drain(..) {
            mesh.release(ctx);
        }
        let api = ctx.api();
        for texture in self.textures.drain() {
            api.delete_texture(texture);
        }
    }

    pub fn meshes(&self) -> &[Mesh<G>] {
        &self.meshes
    }

    /// Directory of the asset file, texture names are resolved against it.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of distinct textures uploaded for this model.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_paths(&self) -> impl Iterator<Item = &Path> {
        self.textures.paths()
    }

    pub fn gamma_correction(&self) -> bool {
        self.gamma_correction
    }

    fn process_mesh(
        &mut self,
        ctx: &mut GpuContext<G>,
        index: usize,
        imported: &ImportedMesh,
        material: Option<&ImportedMaterial>,
    ) -> Result<(), LoadError> {
        let data = MeshData {
            positions: imported.positions.clone(),
            normals: imported.normals.clone(),
            tex_coords: process::collapse_uvs(imported),
            tangents: imported.tangents.clone(),
            bitangents: imported.bitangents.clone(),
            indices: imported.indices.clone(),
        };
        let malformed = |source: MeshError| LoadError::Mesh {
            index,
            name: imported.name.clone(),
            source,
        };
        data.validate().map_err(malformed)?;

        let textures = match material {
            Some(material) => self.load_material_textures(ctx, material)?,
            None => Vec::new(),
        };

        let mesh = Mesh::upload(ctx, &data, textures).map_err(|e| match e {
            UploadError::Mesh(source) => malformed(source),
            UploadError::Gpu(e) => LoadError::Gpu(e),
        })?;
        self.meshes.push(mesh);
        Ok(())
    }

    fn load_material_textures(
        &mut self,
        ctx: &mut GpuContext<G>,
        material: &ImportedMaterial,
    ) -> Result<Vec<Texture<G::Texture>>, LoadError> {
        let mut textures = Vec::new();

        for kind in TextureKind::ALL {
            for file in material.textures(kind) {
                let path = resolve_texture_path(&self.directory, file);
                if !path.exists() {
                    warn!(
                        "Material '{}' references missing {:?} texture '{}', skipping",
                        material.name,
                        kind,
                        path.display()
                    );
                    continue;
                }

                let handle = match self.textures.get(&path) {
                    Some(handle) => {
                        debug!("Reusing texture '{}'", path.display());
                        handle
                    }
                    None => {
                        let image = TextureImage::load(&path)?;
                        let handle = image.upload(ctx.api())?;
                        debug!(
                            "Uploaded texture '{}' ({}x{}, {:?})",
                            path.display(),
                            image.width,
                            image.height,
                            image.format
                        );
                        self.textures.insert(path.clone(), handle);
                        handle
                    }
                };

                textures.push(Texture { handle, kind, path });
            }
        }

        Ok(textures)
    }
}

impl<G: GraphicsApi> fmt::Debug for Model<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("meshes", &self.meshes)
            .field("directory", &self.directory)
            .field("textures", &self.textures)
            .field("gamma_correction", &self.gamma_correction)
            .finish()
    }
}
