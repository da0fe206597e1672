//! [`GraphicsApi`] over an OpenGL 3.3 core context through `glow`.

use glam::Mat4;
use glow::HasContext;

use super::{BufferTarget, GpuError, GraphicsApi};
use crate::core::texture::{TextureFormat, TextureImage};

pub struct GlowBackend {
    gl: glow::Context,
}

impl GlowBackend {
    /// `gl` must be current on this thread for as long as the backend lives.
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Compiles and links a vertex/fragment pair.
    pub fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<glow::Program, GpuError> {
        let gl = &self.gl;
        unsafe {
            let program = gl.create_program().map_err(GpuError)?;
            let stages = [
                (glow::VERTEX_SHADER, vertex_source),
                (glow::FRAGMENT_SHADER, fragment_source),
            ];

            let mut shaders = Vec::with_capacity(stages.len());
            for (stage, source) in stages {
                let shader = match gl.create_shader(stage) {
                    Ok(shader) => shader,
                    Err(e) => {
                        delete_all(gl, program, &shaders);
                        return Err(GpuError(e));
                    }
                };
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                shaders.push(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    delete_all(gl, program, &shaders);
                    return Err(GpuError(format!("shader compilation failed: {}", log)));
                }
                gl.attach_shader(program, shader);
            }

            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                delete_all(gl, program, &shaders);
                return Err(GpuError(format!("program link failed: {}", log)));
            }

            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            Ok(program)
        }
    }

    pub fn delete_program(&mut self, program: glow::Program) {
        unsafe { self.gl.delete_program(program) }
    }
}

unsafe fn delete_all(gl: &glow::Context, program: glow::Program, shaders: &[glow::Shader]) {
    for &shader in shaders {
        gl.delete_shader(shader);
    }
    gl.delete_program(program);
}

fn gl_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

/// (internal format, pixel format)
fn gl_formats(format: TextureFormat) -> (u32, u32) {
    match format {
        TextureFormat::Rgb => (glow::RGB8, glow::RGB),
        TextureFormat::Srgb => (glow::SRGB8, glow::RGB),
        TextureFormat::SrgbAlpha => (glow::SRGB8_ALPHA8, glow::RGBA),
    }
}

impl GraphicsApi for GlowBackend {
    type Buffer = glow::Buffer;
    type VertexArray = glow::VertexArray;
    type Texture = glow::Texture;
    type Program = glow::Program;

    fn create_vertex_array(&mut self) -> Result<glow::VertexArray, GpuError> {
        unsafe { self.gl.create_vertex_array().map_err(GpuError) }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<glow::VertexArray>) {
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&mut self, vertex_array: glow::VertexArray) {
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_buffer(&mut self) -> Result<glow::Buffer, GpuError> {
        unsafe { self.gl.create_buffer().map_err(GpuError) }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<glow::Buffer>) {
        unsafe { self.gl.bind_buffer(gl_target(target), buffer) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(gl_target(target), data, glow::STATIC_DRAW)
        }
    }

    fn delete_buffer(&mut self, buffer: glow::Buffer) {
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(slot) }
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, components: i32) {
        let stride = components * std::mem::size_of::<f32>() as i32;
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(slot, components, glow::FLOAT, false, stride, 0)
        }
    }

    fn create_texture(&mut self) -> Result<glow::Texture, GpuError> {
        unsafe { self.gl.create_texture().map_err(GpuError) }
    }

    fn bind_texture(&mut self, texture: Option<glow::Texture>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_image_2d(&mut self, image: &TextureImage) {
        let (internal, format) = gl_formats(image.format);
        let gl = &self.gl;
        unsafe {
            // RGB rows are not 4 byte aligned in general
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                image.width as i32,
                image.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&image.pixels)),
            );
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);

            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        }
    }

    fn generate_mipmap(&mut self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { self.gl.delete_texture(texture) }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn use_program(&mut self, program: Option<glow::Program>) {
        unsafe { self.gl.use_program(program) }
    }

    // glUniform* writes to the current program, `program` only resolves the location
    fn set_uniform_i32(&mut self, program: glow::Program, name: &str, value: i32) {
        unsafe {
            let location = self.gl.get_uniform_location(program, name);
            self.gl.uniform_1_i32(location.as_ref(), value);
        }
    }

    fn set_uniform_mat4(&mut self, program: glow::Program, name: &str, value: &Mat4) {
        unsafe {
            let location = self.gl.get_uniform_location(program, name);
            self.gl
                .uniform_matrix_4_f32_slice(location.as_ref(), false, &value.to_cols_array());
        }
    }

    fn draw_elements(&mut self, count: usize) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, count as i32, glow::UNSIGNED_INT, 0)
        }
    }
}
