//! The graphics API as seen by meshes and models.
//!
//! Everything here follows GL binding semantics: objects are bound to a target before
//! they are touched, and the current bindings are global state of the context. All calls
//! must come from the thread that owns the context, which [`GpuContext`] enforces by not
//! being `Send`.

use std::fmt::Debug;
use std::marker::PhantomData;

use glam::Mat4;
use thiserror::Error;

use crate::core::texture::TextureImage;

pub mod framebuffer;
pub mod glow_backend;
pub mod rasterizer;
pub mod software;

pub use framebuffer::FrameBuffer;
pub use glow_backend::GlowBackend;
pub use software::SoftwareBackend;

#[derive(Debug, Error)]
#[error("graphics api: {0}")]
pub struct GpuError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Per vertex attribute data
    Array,
    /// Triangle indices, `u32`
    ElementArray,
}

/// The calls the mesh pipeline needs from a GL-like graphics API.
///
/// Handles are backend defined and cheap to copy. Vertex attributes are always tightly
/// packed `f32` components and element buffers always hold `u32` triangle lists.
pub trait GraphicsApi {
    type Buffer: Copy + Debug;
    type VertexArray: Copy + Debug;
    type Texture: Copy + Debug + PartialEq;
    type Program: Copy + Debug;

    fn create_vertex_array(&mut self) -> Result<Self::VertexArray, GpuError>;
    fn bind_vertex_array(&mut self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);

    fn create_buffer(&mut self) -> Result<Self::Buffer, GpuError>;
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Self::Buffer>);
    /// Uploads `data` into the buffer bound to `target`, replacing its contents.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn enable_vertex_attrib(&mut self, slot: u32);
    /// Sources attribute `slot` from the bound array buffer, `components` floats per vertex.
    fn vertex_attrib_pointer(&mut self, slot: u32, components: i32);

    fn create_texture(&mut self) -> Result<Self::Texture, GpuError>;
    fn bind_texture(&mut self, texture: Option<Self::Texture>);
    /// Uploads level 0 of the bound 2D texture.
    fn tex_image_2d(&mut self, image: &TextureImage);
    fn generate_mipmap(&mut self);
    fn delete_texture(&mut self, texture: Self::Texture);
    fn active_texture(&mut self, unit: u32);

    fn use_program(&mut self, program: Option<Self::Program>);
    /// Uniform setters look the name up on `program` but write to the program in use, so
    /// `program` has to be made current with [`use_program`](Self::use_program) first.
    fn set_uniform_i32(&mut self, program: Self::Program, name: &str, value: i32);
    fn set_uniform_mat4(&mut self, program: Self::Program, name: &str, value: &Mat4);

    /// Draws `count` indices from the bound element buffer as triangles.
    fn draw_elements(&mut self, count: usize);
}

/// Explicit handle to a graphics context.
///
/// Model and mesh operations take this instead of reaching for global state. It is pinned to
/// the thread that created it.
pub struct GpuContext<G: GraphicsApi> {
    api: G,
    _not_send: PhantomData<*const ()>,
}

impl<G: GraphicsApi> GpuContext<G> {
    /// `api` must be current on the calling thread.
    pub fn new(api: G) -> Self {
        Self {
            api,
            _not_send: PhantomData,
        }
    }

    pub fn api(&mut self) -> &mut G {
        &mut self.api
    }

    pub fn api_ref(&self) -> &G {
        &self.api
    }

    pub fn into_inner(self) -> G {
        self.api
    }
}
