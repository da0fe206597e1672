//! CPU implementation of [`GraphicsApi`].
//!
//! Buffers and textures live in plain vectors. Draw calls transform the positions bound at
//! [`POSITION_SLOT`] by the current program's `model`, `view` and `projection` uniforms and
//! rasterize every triangle as depth tested wireframe. Enough to look at a model without a
//! GL context, and to run the whole load path headless.

use std::collections::HashMap;

use glam::{Mat4, Vec3, Vec4};
use log::warn;

use super::{BufferTarget, FrameBuffer, GpuError, GraphicsApi};
use crate::core::mesh::POSITION_SLOT;
use crate::core::texture::TextureImage;

use super::rasterizer::{clip_line, project_to_screen};

pub const BACKGROUND: u32 = 0x000d0d0d;
const WIRE: u32 = 0x00d0d0d0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

#[derive(Debug, Default)]
struct VertexArrayState {
    attributes: HashMap<u32, (Handle, i32)>,
    enabled: Vec<u32>,
    elements: Option<Handle>,
}

#[derive(Debug, Default)]
struct ProgramState {
    ints: HashMap<String, i32>,
    matrices: HashMap<String, Mat4>,
}

#[derive(Debug, Clone)]
struct TextureState {
    width: u32,
    height: u32,
    levels: u32,
}

/// Counters for what went through the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub buffers: usize,
    pub vertex_arrays: usize,
    pub textures: usize,
    pub uploaded_bytes: usize,
    pub draw_calls: usize,
    pub triangles: usize,
}

#[derive(Debug)]
pub struct SoftwareBackend {
    framebuffer: FrameBuffer,
    next_handle: u32,
    buffers: HashMap<Handle, Vec<u8>>,
    vertex_arrays: HashMap<Handle, VertexArrayState>,
    textures: HashMap<Handle, Option<TextureState>>,
    programs: HashMap<Handle, ProgramState>,
    bound_vertex_array: Option<Handle>,
    bound_array_buffer: Option<Handle>,
    active_unit: u32,
    texture_units: HashMap<u32, Handle>,
    current_program: Option<Handle>,
    stats: SoftwareStats,
}

impl SoftwareBackend {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            framebuffer: FrameBuffer::new(width, height),
            next_handle: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            bound_vertex_array: None,
            bound_array_buffer: None,
            active_unit: 0,
            texture_units: HashMap::new(),
            current_program: None,
            stats: SoftwareStats::default(),
        }
    }

    /// Programs are just uniform stores here.
    pub fn create_program(&mut self) -> Handle {
        let handle = self.allocate();
        self.programs.insert(handle, ProgramState::default());
        handle
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn clear(&mut self) {
        self.framebuffer.clear(BACKGROUND);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer.resize(width, height);
    }

    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    /// Live objects, useful to spot leaks.
    pub fn live_objects(&self) -> usize {
        self.buffers.len() + self.vertex_arrays.len() + self.textures.len()
    }

    pub fn uniform_i32(&self, program: Handle, name: &str) -> Option<i32> {
        self.programs.get(&program)?.ints.get(name).copied()
    }

    pub fn texture_levels(&self, texture: Handle) -> Option<u32> {
        self.textures.get(&texture)?.as_ref().map(|t| t.levels)
    }

    fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn matrix(&self, name: &str) -> Mat4 {
        self.current_program
            .and_then(|p| self.programs.get(&p))
            .and_then(|p| p.matrices.get(name).copied())
            .unwrap_or(Mat4::IDENTITY)
    }

    fn read_positions(&self, vao: &VertexArrayState) -> Option<Vec<Vec3>> {
        if !vao.enabled.contains(&POSITION_SLOT) {
            return None;
        }
        let (buffer, components) = *vao.attributes.get(&POSITION_SLOT)?;
        if components != 3 {
            return None;
        }
        let bytes = self.buffers.get(&buffer)?;
        Some(
            bytes
                .chunks_exact(12)
                .map(|c| Vec3::from_array(bytemuck::pod_read_unaligned::<[f32; 3]>(c)))
                .collect(),
        )
    }
}

impl GraphicsApi for SoftwareBackend {
    type Buffer = Handle;
    type VertexArray = Handle;
    type Texture = Handle;
    type Program = Handle;

    fn create_vertex_array(&mut self) -> Result<Handle, GpuError> {
        let handle = self.allocate();
        self.vertex_arrays.insert(handle, VertexArrayState::default());
        self.stats.vertex_arrays += 1;
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<Handle>) {
        self.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&mut self, vertex_array: Handle) {
        self.vertex_arrays.remove(&vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn create_buffer(&mut self) -> Result<Handle, GpuError> {
        let handle = self.allocate();
        self.buffers.insert(handle, Vec::new());
        self.stats.buffers += 1;
        Ok(handle)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<Handle>) {
        match target {
            BufferTarget::Array => self.bound_array_buffer = buffer,
            BufferTarget::ElementArray => {
                if let Some(vao) = self
                    .bound_vertex_array
                    .and_then(|v| self.vertex_arrays.get_mut(&v))
                {
                    vao.elements = buffer;
                }
            }
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        let bound = match target {
            BufferTarget::Array => self.bound_array_buffer,
            BufferTarget::ElementArray => self
                .bound_vertex_array
                .and_then(|v| self.vertex_arrays.get(&v))
                .and_then(|vao| vao.elements),
        };
        match bound.and_then(|b| self.buffers.get_mut(&b)) {
            Some(storage) => {
                storage.clear();
                storage.extend_from_slice(data);
                self.stats.uploaded_bytes += data.len();
            }
            None => warn!("buffer_data with nothing bound to {:?}", target),
        }
    }

    fn delete_buffer(&mut self, buffer: Handle) {
        self.buffers.remove(&buffer);
        if self.bound_array_buffer == Some(buffer) {
            self.bound_array_buffer = None;
        }
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        if let Some(vao) = self
            .bound_vertex_array
            .and_then(|v| self.vertex_arrays.get_mut(&v))
        {
            if !vao.enabled.contains(&slot) {
                vao.enabled.push(slot);
            }
        }
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, components: i32) {
        let Some(buffer) = self.bound_array_buffer else {
            warn!("vertex_attrib_pointer({}) without an array buffer", slot);
            return;
        };
        if let Some(vao) = self
            .bound_vertex_array
            .and_then(|v| self.vertex_arrays.get_mut(&v))
        {
            vao.attributes.insert(slot, (buffer, components));
        }
    }

    fn create_texture(&mut self) -> Result<Handle, GpuError> {
        let handle = self.allocate();
        self.textures.insert(handle, None);
        self.stats.textures += 1;
        Ok(handle)
    }

    fn bind_texture(&mut self, texture: Option<Handle>) {
        match texture {
            Some(texture) => {
                self.texture_units.insert(self.active_unit, texture);
            }
            None => {
                self.texture_units.remove(&self.active_unit);
            }
        }
    }

    fn tex_image_2d(&mut self, image: &TextureImage) {
        let bound = self.texture_units.get(&self.active_unit).copied();
        match bound.and_then(|t| self.textures.get_mut(&t)) {
            Some(slot) => {
                *slot = Some(TextureState {
                    width: image.width,
                    height: image.height,
                    levels: 1,
                });
                self.stats.uploaded_bytes += image.pixels.len();
            }
            None => warn!("tex_image_2d with no texture bound"),
        }
    }

    fn generate_mipmap(&mut self) {
        let bound = self.texture_units.get(&self.active_unit).copied();
        if let Some(Some(tex)) = bound.and_then(|t| self.textures.get_mut(&t)) {
            tex.levels = 32 - tex.width.max(tex.height).max(1).leading_zeros();
        }
    }

    fn delete_texture(&mut self, texture: Handle) {
        self.textures.remove(&texture);
        self.texture_units.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn use_program(&mut self, program: Option<Handle>) {
        self.current_program = program;
    }

    fn set_uniform_i32(&mut self, program: Handle, name: &str, value: i32) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.ints.insert(name.to_string(), value);
        }
    }

    fn set_uniform_mat4(&mut self, program: Handle, name: &str, value: &Mat4) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.matrices.insert(name.to_string(), *value);
        }
    }

    fn draw_elements(&mut self, count: usize) {
        let Some(vao) = self
            .bound_vertex_array
            .and_then(|v| self.vertex_arrays.get(&v))
        else {
            warn!("draw_elements without a vertex array");
            return;
        };
        let Some(positions) = self.read_positions(vao) else {
            warn!("draw_elements without float3 positions at slot {}", POSITION_SLOT);
            return;
        };
        let Some(indices) = vao.elements.and_then(|e| self.buffers.get(&e)) else {
            warn!("draw_elements without an element buffer");
            return;
        };
        let indices: Vec<u32> = indices
            .chunks_exact(4)
            .take(count)
            .map(bytemuck::pod_read_unaligned::<u32>)
            .collect();

        let mvp = self.matrix("projection") * self.matrix("view") * self.matrix("model");
        let (width, height) = (self.framebuffer.width, self.framebuffer.height);
        let clip: Vec<Vec4> = positions.iter().map(|p| mvp * Vec4::from((*p, 1.0))).collect();

        let mut triangles = 0;
        for tri in indices.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| clip.get(i as usize).copied());
            let [Some(a), Some(b), Some(c)] = corners else {
                continue;
            };
            triangles += 1;
            for (start, end) in [(a, b), (b, c), (c, a)] {
                let Some((start, end)) = clip_line(start, end) else {
                    continue;
                };
                if let (Some(start), Some(end)) = (
                    project_to_screen(start, width, height),
                    project_to_screen(end, width, height),
                ) {
                    self.framebuffer.draw_line(start, end, WIRE);
                }
            }
        }

        self.stats.draw_calls += 1;
        self.stats.triangles += triangles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::{Mesh, MeshData};
    use crate::gpu::GpuContext;
    use glam::Vec2;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.0, 0.5, 0.0),
            ],
            normals: vec![Vec3::Z; 3],
            tex_coords: vec![Vec2::ZERO; 3],
            tangents: vec![Vec3::X; 3],
            bitangents: vec![Vec3::Y; 3],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn identity_triangle_is_drawn() {
        let mut ctx = GpuContext::new(SoftwareBackend::new(64, 64));
        let program = ctx.api().create_program();
        let mesh = Mesh::upload(&mut ctx, &triangle(), Vec::new()).unwrap();

        ctx.api().clear();
        ctx.api().use_program(Some(program));
        mesh.draw(&mut ctx, program);

        let api = ctx.api_ref();
        assert_eq!(api.stats().draw_calls, 1);
        assert_eq!(api.stats().triangles, 1);
        assert!(api.framebuffer().covered_pixels(BACKGROUND) > 0);
    }

    #[test]
    fn triangle_behind_the_camera_is_skipped() {
        let mut ctx = GpuContext::new(SoftwareBackend::new(64, 64));
        let program = ctx.api().create_program();
        let mesh = Mesh::upload(&mut ctx, &triangle(), Vec::new()).unwrap();

        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -6.0), Vec3::Y);
        let projection = Mat4::perspective_rh_gl(45f32.to_radians(), 1.0, 0.1, 100.0);
        let api = ctx.api();
        api.clear();
        api.use_program(Some(program));
        api.set_uniform_mat4(program, "view", &view);
        api.set_uniform_mat4(program, "projection", &projection);
        mesh.draw(&mut ctx, program);

        assert_eq!(ctx.api_ref().framebuffer().covered_pixels(BACKGROUND), 0);
    }

    #[test]
    fn wide_triangle_close_to_the_camera_is_clipped() {
        let mut ctx = GpuContext::new(SoftwareBackend::new(64, 64));
        let program = ctx.api().create_program();
        let data = MeshData {
            positions: vec![
                Vec3::new(-1e8, 0.0, -1.0),
                Vec3::new(1e8, 0.0, -1.0),
                Vec3::new(0.0, 1.0, -1.0),
            ],
            ..triangle()
        };
        let mesh = Mesh::upload(&mut ctx, &data, Vec::new()).unwrap();

        let projection = crate::core::Camera::default().projection_matrix(1.0, 0.1, 100.0);
        let api = ctx.api();
        api.clear();
        api.use_program(Some(program));
        api.set_uniform_mat4(program, "projection", &projection);
        mesh.draw(&mut ctx, program);

        let api = ctx.api_ref();
        assert_eq!(api.stats().triangles, 1);
        let covered = api.framebuffer().covered_pixels(BACKGROUND);
        assert!(covered > 0 && covered < 64 * 64, "{covered}");
    }

    #[test]
    fn triangle_crossing_the_eye_plane_draws_the_visible_part() {
        let mut ctx = GpuContext::new(SoftwareBackend::new(64, 64));
        let program = ctx.api().create_program();
        let data = MeshData {
            positions: vec![
                Vec3::new(-0.5, -0.2, -2.0),
                Vec3::new(0.5, -0.2, -2.0),
                Vec3::new(0.0, -0.2, 5.0),
            ],
            ..triangle()
        };
        let mesh = Mesh::upload(&mut ctx, &data, Vec::new()).unwrap();

        let projection = crate::core::Camera::default().projection_matrix(1.0, 0.1, 100.0);
        let api = ctx.api();
        api.clear();
        api.use_program(Some(program));
        api.set_uniform_mat4(program, "projection", &projection);
        mesh.draw(&mut ctx, program);

        assert!(ctx.api_ref().framebuffer().covered_pixels(BACKGROUND) > 0);
    }

    #[test]
    fn release_leaves_nothing_alive() {
        let mut ctx = GpuContext::new(SoftwareBackend::new(8, 8));
        let mesh = Mesh::upload(&mut ctx, &triangle(), Vec::new()).unwrap();
        assert_eq!(ctx.api_ref().live_objects(), 7);
        mesh.release(&mut ctx);
        assert_eq!(ctx.api_ref().live_objects(), 0);
    }

    #[test]
    fn mipmaps_cover_the_largest_side() {
        let mut api = SoftwareBackend::new(1, 1);
        let image = TextureImage {
            width: 256,
            height: 64,
            format: crate::core::texture::TextureFormat::Rgb,
            pixels: vec![0; 256 * 64 * 3],
        };
        let texture = image.upload(&mut api).unwrap();
        assert_eq!(api.texture_levels(texture), Some(9));
    }
}
