use std::path::Path;

use glam::Vec3;
use log::{debug, warn};

use super::{process, ImportError, ImportFlags, ImportedMaterial, ImportedMesh, ImportedScene, SceneImporter};
use crate::core::texture::TextureKind;

/// Wavefront OBJ/MTL importer backed by `tobj`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjImporter;

impl SceneImporter for ObjImporter {
    fn import(&self, path: &Path, flags: ImportFlags) -> Result<ImportedScene, ImportError> {
        let (models, materials_result) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: flags.triangulate,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| ImportError::new(path, e.to_string()))?;

        if models.is_empty() {
            return Err(ImportError::new(path, "file contains no meshes"));
        }

        let materials = match materials_result {
            Ok(materials) => materials.iter().map(convert_material).collect(),
            Err(e) => {
                warn!("Materials for '{}' could not be loaded: {}", path.display(), e);
                Vec::new()
            }
        };

        let mut meshes = Vec::with_capacity(models.len());
        for model in models {
            let mut mesh = convert_mesh(model.name, model.mesh);
            if mesh.indices.len() % 3 != 0 {
                return Err(ImportError::new(
                    path,
                    format!("mesh '{}' is not made of triangles", mesh.name),
                ));
            }
            if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= mesh.positions.len()) {
                return Err(ImportError::new(
                    path,
                    format!("mesh '{}' references missing vertex {}", mesh.name, index),
                ));
            }

            if mesh.normals.len() != mesh.positions.len() {
                debug!("Computing normals for mesh '{}'", mesh.name);
                process::compute_normals(&mut mesh);
            }
            if flags.flip_uvs {
                process::flip_uvs(&mut mesh);
            }
            if flags.calc_tangent_space {
                process::compute_tangents(&mut mesh);
            }
            meshes.push(mesh);
        }

        Ok(ImportedScene { meshes, materials })
    }
}

fn convert_mesh(name: String, mesh: tobj::Mesh) -> ImportedMesh {
    let positions: Vec<Vec3> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| Vec3::new(p[0], p[1], p[2]))
        .collect();

    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|n| Vec3::new(n[0], n[1], n[2]).normalize_or_zero())
        .collect();

    let tex_coords = (mesh.texcoords.len() / 2 == positions.len() && !positions.is_empty())
        .then(|| {
            mesh.texcoords
                .chunks_exact(2)
                .map(|uv| Vec3::new(uv[0], uv[1], 0.0))
                .collect()
        });

    ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents: Vec::new(),
        bitangents: Vec::new(),
        indices: mesh.indices,
        material: mesh.material_id,
    }
}

fn convert_material(material: &tobj::Material) -> ImportedMaterial {
    let mut out = ImportedMaterial {
        name: material.name.clone(),
        ..Default::default()
    };

    let known = [
        (TextureKind::Diffuse, material.diffuse_texture.as_deref()),
        (TextureKind::Specular, material.specular_texture.as_deref()),
        (TextureKind::Normal, material.normal_texture.as_deref()),
    ];
    // Statements tobj does not know about land in unknown_param
    let extra = [
        (TextureKind::Normal, "norm"),
        (TextureKind::Normal, "map_Kn"),
        (TextureKind::Height, "disp"),
        (TextureKind::Height, "map_disp"),
    ]
    .map(|(kind, key)| (kind, material.unknown_param.get(key).map(String::as_str)));

    for (kind, statement) in known.into_iter().chain(extra) {
        let Some(statement) = statement else {
            continue;
        };
        match texture_file_name(statement) {
            Some(file) => out.add_texture(kind, file),
            None => warn!(
                "Material '{}' has a {:?} map without a file name: '{}'",
                material.name, kind, statement
            ),
        }
    }

    out
}

/// Drops the `-option value..` prefix MTL allows in front of a texture file name,
/// e.g. `-bm 0.5 -s 2 2 1 normal.png`.
fn texture_file_name(statement: &str) -> Option<String> {
    let is_option = |t: &&str| t.len() > 1 && t.starts_with('-') && t.parse::<f32>().is_err();
    let is_number = |t: &&str| t.parse::<f32>().is_ok();

    let mut tokens = statement.split_whitespace().peekable();
    while let Some(option) = tokens.next_if(is_option) {
        let arguments = match option {
            "-blendu" | "-blendv" | "-cc" | "-clamp" | "-bm" | "-boost" | "-texres"
            | "-imfchan" | "-type" => 1,
            "-mm" => 2,
            // -o, -s, -t take one to three numbers
            _ => {
                while tokens.next_if(is_number).is_some() {}
                0
            }
        };
        for _ in 0..arguments {
            tokens.next();
        }
    }

    let file = tokens.collect::<Vec<_>>().join(" ");
    (!file.is_empty()).then_some(file)
}
