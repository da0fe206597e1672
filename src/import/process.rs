use glam::{Vec2, Vec3};

use super::ImportedMesh;

const DEGENERATE: f32 = 1e-12;

pub fn compute_normal(mesh: &ImportedMesh, tri: &[u32]) -> Vec3 {
    let v0 = mesh.positions[tri[0] as usize];
    let v1 = mesh.positions[tri[1] as usize];
    let v2 = mesh.positions[tri[2] as usize];

    (v1 - v0).cross(v2 - v0)
}

/// Smooth per vertex normals, area weighted average of the adjacent faces.
pub fn compute_normals(mesh: &mut ImportedMesh) {
    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];

    for tri in mesh.indices.chunks_exact(3) {
        let normal = compute_normal(mesh, tri);
        for &i in tri {
            normals[i as usize] += normal;
        }
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }
    mesh.normals = normals;
}

pub fn flip_uvs(mesh: &mut ImportedMesh) {
    if let Some(uvs) = &mut mesh.tex_coords {
        for uv in uvs {
            uv.y = 1.0 - uv.y;
        }
    }
}

/// Per vertex tangent frame from the UV derivatives of the adjacent triangles.
///
/// Tangents are Gram-Schmidt orthogonalized against the normal. Vertices without usable
/// UVs get an arbitrary frame perpendicular to their normal. Requires normals.
pub fn compute_tangents(mesh: &mut ImportedMesh) {
    let count = mesh.positions.len();
    let mut tangents = vec![Vec3::ZERO; count];
    let mut bitangents = vec![Vec3::ZERO; count];

    if let Some(uvs) = &mesh.tex_coords {
        for tri in mesh.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let edge1 = mesh.positions[i1] - mesh.positions[i0];
            let edge2 = mesh.positions[i2] - mesh.positions[i0];
            let duv1 = uvs[i1].truncate() - uvs[i0].truncate();
            let duv2 = uvs[i2].truncate() - uvs[i0].truncate();

            let det = duv1.perp_dot(duv2);
            if det.abs() < DEGENERATE {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
            let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                bitangents[i] += bitangent;
            }
        }
    }

    for i in 0..count {
        let normal = mesh.normals[i];
        let (tangent, bitangent) = orthonormal_frame(normal, tangents[i], bitangents[i]);
        tangents[i] = tangent;
        bitangents[i] = bitangent;
    }

    mesh.tangents = tangents;
    mesh.bitangents = bitangents;
}

fn orthonormal_frame(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> (Vec3, Vec3) {
    let tangent = (tangent - normal * normal.dot(tangent))
        .try_normalize()
        .unwrap_or_else(|| normal.try_normalize().unwrap_or(Vec3::Y).any_orthonormal_vector());

    let mut fallback = normal.cross(tangent);
    // keep the handedness the UVs asked for
    if fallback.dot(bitangent) < 0.0 {
        fallback = -fallback;
    }
    let bitangent = bitangent.try_normalize().unwrap_or(fallback);
    (tangent, bitangent)
}

/// Drops W from every UV, filling with zeros when the mesh has none.
pub fn collapse_uvs(mesh: &ImportedMesh) -> Vec<Vec2> {
    match &mesh.tex_coords {
        Some(uvs) => uvs.iter().map(|uv| uv.truncate()).collect(),
        None => vec![Vec2::ZERO; mesh.positions.len()],
    }
}
