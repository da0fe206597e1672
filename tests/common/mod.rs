#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use model_viewer::core::texture::{TextureFormat, TextureImage};
use model_viewer::gpu::{BufferTarget, GpuError, GraphicsApi};
use model_viewer::import::{ImportError, ImportFlags, ImportedMesh, ImportedScene, SceneImporter};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    SetInt(String, i32),
    BindVertexArray(Option<u32>),
    Draw(usize),
    TexImage(u32, u32, TextureFormat),
}

/// Graphics api double that only tracks handles and records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingApi {
    next_handle: u32,
    allocations: usize,
    /// Fail the n-th allocation (1 based) of any kind
    pub fail_on: Option<usize>,
    pub buffers: HashSet<u32>,
    pub vertex_arrays: HashSet<u32>,
    pub textures: HashSet<u32>,
    pub texture_uploads: usize,
    pub texture_deletes: usize,
    pub active_unit: u32,
    pub bound_textures: HashMap<u32, u32>,
    pub bound_vertex_array: Option<u32>,
    pub calls: Vec<Call>,
}

impl RecordingApi {
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    pub fn live_objects(&self) -> usize {
        self.buffers.len() + self.vertex_arrays.len() + self.textures.len()
    }

    fn allocate(&mut self) -> Result<u32, GpuError> {
        self.allocations += 1;
        if self.fail_on == Some(self.allocations) {
            return Err(GpuError(format!("allocation {} refused", self.allocations)));
        }
        self.next_handle += 1;
        Ok(self.next_handle)
    }
}

impl GraphicsApi for RecordingApi {
    type Buffer = u32;
    type VertexArray = u32;
    type Texture = u32;
    type Program = u32;

    fn create_vertex_array(&mut self) -> Result<u32, GpuError> {
        let handle = self.allocate()?;
        self.vertex_arrays.insert(handle);
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<u32>) {
        self.bound_vertex_array = vertex_array;
        self.calls.push(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: u32) {
        assert!(self.vertex_arrays.remove(&vertex_array), "double free");
    }

    fn create_buffer(&mut self) -> Result<u32, GpuError> {
        let handle = self.allocate()?;
        self.buffers.insert(handle);
        Ok(handle)
    }

    fn bind_buffer(&mut self, _target: BufferTarget, _buffer: Option<u32>) {}

    fn buffer_data(&mut self, _target: BufferTarget, _data: &[u8]) {}

    fn delete_buffer(&mut self, buffer: u32) {
        assert!(self.buffers.remove(&buffer), "double free");
    }

    fn enable_vertex_attrib(&mut self, _slot: u32) {}

    fn vertex_attrib_pointer(&mut self, _slot: u32, _components: i32) {}

    fn create_texture(&mut self) -> Result<u32, GpuError> {
        let handle = self.allocate()?;
        self.textures.insert(handle);
        Ok(handle)
    }

    fn bind_texture(&mut self, texture: Option<u32>) {
        match texture {
            Some(texture) => self.bound_textures.insert(self.active_unit, texture),
            None => self.bound_textures.remove(&self.active_unit),
        };
        self.calls.push(Call::BindTexture(texture));
    }

    fn tex_image_2d(&mut self, image: &TextureImage) {
        self.texture_uploads += 1;
        self.calls
            .push(Call::TexImage(image.width, image.height, image.format));
    }

    fn generate_mipmap(&mut self) {}

    fn delete_texture(&mut self, texture: u32) {
        assert!(self.textures.remove(&texture), "double free");
        self.texture_deletes += 1;
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.calls.push(Call::ActiveTexture(unit));
    }

    fn use_program(&mut self, _program: Option<u32>) {}

    fn set_uniform_i32(&mut self, _program: u32, name: &str, value: i32) {
        self.calls.push(Call::SetInt(name.to_string(), value));
    }

    fn set_uniform_mat4(&mut self, _program: u32, _name: &str, _value: &Mat4) {}

    fn draw_elements(&mut self, count: usize) {
        self.calls.push(Call::Draw(count));
    }
}

/// Hands back a prepared scene, or an error when there is none.
pub struct StubImporter {
    pub scene: Option<ImportedScene>,
}

impl SceneImporter for StubImporter {
    fn import(&self, path: &Path, _flags: ImportFlags) -> Result<ImportedScene, ImportError> {
        self.scene
            .clone()
            .ok_or_else(|| ImportError::new(path, "stub has no scene"))
    }
}

/// A unit quad in the XY plane with a complete tangent frame.
pub fn quad(name: &str, material: Option<usize>) -> ImportedMesh {
    ImportedMesh {
        name: name.to_string(),
        positions: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        tex_coords: Some(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]),
        tangents: vec![Vec3::X; 4],
        bitangents: vec![Vec3::Y; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
        material,
    }
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "model_viewer_it_{}_{}",
        name,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
        .save(path)
        .unwrap();
}

pub fn write_jpg(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]))
        .save(path)
        .unwrap();
}
