//! Asset import: turning a file on disk into plain vertex/index/material data.
//!
//! The rest of the crate only sees [`ImportedScene`]. Scenes are plain owned data, so
//! "releasing" one is just dropping it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;

use crate::core::texture::TextureKind;

pub mod obj;
pub mod process;

pub use obj::ObjImporter;

#[derive(Debug, Error)]
#[error("could not import '{path}': {reason}")]
pub struct ImportError {
    pub path: PathBuf,
    pub reason: String,
}

impl ImportError {
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Post processing requested from the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportFlags {
    /// Split every polygon into triangles
    pub triangulate: bool,
    /// `v -> 1 - v`, images are uploaded top row first
    pub flip_uvs: bool,
    /// Generate per vertex tangents and bitangents
    pub calc_tangent_space: bool,
}

impl ImportFlags {
    /// What [`crate::core::Model::load`] asks for.
    pub const MODEL: ImportFlags = ImportFlags {
        triangulate: true,
        flip_uvs: true,
        calc_tangent_space: true,
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// First UV channel. The third component is whatever the format stores for W
    pub tex_coords: Option<Vec<Vec3>>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    /// File names as written in the asset, relative to the asset's directory
    pub textures: HashMap<TextureKind, Vec<String>>,
}

impl ImportedMaterial {
    pub fn textures(&self, kind: TextureKind) -> &[String] {
        self.textures.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_texture(&mut self, kind: TextureKind, file: impl Into<String>) {
        self.textures.entry(kind).or_default().push(file.into());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}

impl ImportedScene {
    pub fn material(&self, mesh: &ImportedMesh) -> Option<&ImportedMaterial> {
        mesh.material.and_then(|id| self.materials.get(id))
    }
}

pub trait SceneImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, ImportError>;
}
