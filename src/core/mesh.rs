use std::fmt;

use glam::{Vec2, Vec3};
use thiserror::Error;

use super::texture::{sampler_bindings, Texture};
use crate::gpu::{BufferTarget, GpuContext, GpuError, GraphicsApi};

/// Vertex attribute locations shaders must declare.
pub const POSITION_SLOT: u32 = 0;
pub const NORMAL_SLOT: u32 = 1;
pub const TEX_COORDS_SLOT: u32 = 2;
pub const TANGENT_SLOT: u32 = 3;
pub const BITANGENT_SLOT: u32 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("{attribute} has {found} entries, expected one per vertex ({expected})")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{0} indices do not form whole triangles")]
    PartialTriangle(usize),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// CPU side geometry of one mesh, all attribute arrays indexed by vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub tangents: Vec<Vec3>,
    pub bitangents: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        let expected = self.vertex_count();
        let lengths = [
            ("normals", self.normals.len()),
            ("tex_coords", self.tex_coords.len()),
            ("tangents", self.tangents.len()),
            ("bitangents", self.bitangents.len()),
        ];
        for (attribute, found) in lengths {
            if found != expected {
                return Err(MeshError::AttributeLength {
                    attribute,
                    expected,
                    found,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= expected) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: expected,
            });
        }
        Ok(())
    }
}

/// GPU resident mesh. Buffers are filled once in [`Mesh::upload`] and never reallocated.
pub struct Mesh<G: GraphicsApi> {
    vertex_array: G::VertexArray,
    /// position, normal, uv, tangent, bitangent, element
    buffers: Vec<G::Buffer>,
    index_count: usize,
    vertex_count: usize,
    textures: Vec<Texture<G::Texture>>,
}

impl<G: GraphicsApi> Mesh<G> {
    pub fn upload(
        ctx: &mut GpuContext<G>,
        data: &MeshData,
        textures: Vec<Texture<G::Texture>>,
    ) -> Result<Self, UploadError> {
        data.validate()?;

        let api = ctx.api();
        let vertex_array = api.create_vertex_array()?;
        let mut buffers = Vec::with_capacity(6);

        match setup_buffers(api, vertex_array, data, &mut buffers) {
            Ok(()) => Ok(Mesh {
                vertex_array,
                buffers,
                index_count: data.indices.len(),
                vertex_count: data.vertex_count(),
                textures,
            }),
            Err(e) => {
                api.bind_vertex_array(None);
                for buffer in buffers {
                    api.delete_buffer(buffer);
                }
                api.delete_vertex_array(vertex_array);
                Err(e.into())
            }
        }
    }

    /// Binds every texture to the unit matching its position in the texture list, points
    /// the `{kind}{n}` sampler at it and draws the whole index buffer. Units are unbound
    /// again afterwards and unit 0 is left active. `program` must already be in use.
    pub fn draw(&self, ctx: &mut GpuContext<G>, program: G::Program) {
        let api = ctx.api();

        for binding in sampler_bindings(&self.textures) {
            api.active_texture(binding.unit);
            api.set_uniform_i32(program, &binding.uniform, binding.unit as i32);
            api.bind_texture(Some(binding.texture.handle));
        }

        api.bind_vertex_array(Some(self.vertex_array));
        api.draw_elements(self.index_count);
        api.bind_vertex_array(None);

        for unit in 0..self.textures.len() {
            api.active_texture(unit as u32);
            api.bind_texture(None);
        }
        api.active_texture(0);
    }

    /// Frees the buffers and vertex array. Textures belong to the owning model.
    pub fn release(self, ctx: &mut GpuContext<G>) {
        let api = ctx.api();
        for buffer in self.buffers {
            api.delete_buffer(buffer);
        }
        api.delete_vertex_array(self.vertex_array);
    }

    pub fn textures(&self) -> &[Texture<G::Texture>] {
        &self.textures
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

impl<G: GraphicsApi> fmt::Debug for Mesh<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("vertex_array", &self.vertex_array)
            .field("buffers", &self.buffers)
            .field("index_count", &self.index_count)
            .field("vertex_count", &self.vertex_count)
            .field("textures", &self.textures)
            .finish()
    }
}

fn setup_buffers<G: GraphicsApi>(
    api: &mut G,
    vertex_array: G::VertexArray,
    data: &MeshData,
    buffers: &mut Vec<G::Buffer>,
) -> Result<(), GpuError> {
    api.bind_vertex_array(Some(vertex_array));

    let attributes: [(u32, i32, &[u8]); 5] = [
        (POSITION_SLOT, 3, bytemuck::cast_slice(&data.positions)),
        (NORMAL_SLOT, 3, bytemuck::cast_slice(&data.normals)),
        (TEX_COORDS_SLOT, 2, bytemuck::cast_slice(&data.tex_coords)),
        (TANGENT_SLOT, 3, bytemuck::cast_slice(&data.tangents)),
        (BITANGENT_SLOT, 3, bytemuck::cast_slice(&data.bitangents)),
    ];
    for (slot, components, bytes) in attributes {
        let buffer = api.create_buffer()?;
        buffers.push(buffer);
        api.bind_buffer(BufferTarget::Array, Some(buffer));
        api.buffer_data(BufferTarget::Array, bytes);
        api.enable_vertex_attrib(slot);
        api.vertex_attrib_pointer(slot, components);
    }

    let element_buffer = api.create_buffer()?;
    buffers.push(element_buffer);
    api.bind_buffer(BufferTarget::ElementArray, Some(element_buffer));
    api.buffer_data(
        BufferTarget::ElementArray,
        bytemuck::cast_slice(&data.indices),
    );

    // the element binding is recorded in the vertex array, unbind it first
    api.bind_vertex_array(None);
    api.bind_buffer(BufferTarget::Array, None);
    api.bind_buffer(BufferTarget::ElementArray, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z; 3],
            tex_coords: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            tangents: vec![Vec3::X; 3],
            bitangents: vec![Vec3::Y; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn valid_triangle_passes() {
        assert_eq!(triangle().validate(), Ok(()));
    }

    #[test]
    fn mismatched_attribute_is_rejected() {
        let mut data = triangle();
        data.tangents.pop();
        assert_eq!(
            data.validate(),
            Err(MeshError::AttributeLength {
                attribute: "tangents",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut data = triangle();
        data.indices = vec![0, 1, 3];
        assert_eq!(
            data.validate(),
            Err(MeshError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn partial_triangle_is_rejected() {
        let mut data = triangle();
        data.indices.push(0);
        assert_eq!(data.validate(), Err(MeshError::PartialTriangle(4)));
    }
}
