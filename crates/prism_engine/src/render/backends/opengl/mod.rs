//! OpenGL 3.3 core backend
//!
//! Implements [`RenderBackend`] on top of `glow`. Engine handles are small
//! integers mapped to the GL object names, so a stale handle can never alias a
//! recycled GL name. Uniform locations are looked up once per (program, name).

mod shader;
mod target;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use glow::HasContext;

use crate::foundation::color::Color;
use crate::render::api::{
    BackendResult, BufferHandle, BufferKind, ClearFlags, ProgramHandle, RenderBackend,
    RenderTargetHandle, TextureDescriptor, TextureFilter, TextureFormat, TextureHandle,
    TextureWrap, UniformValue, VertexArrayHandle, VertexLayout,
};
use crate::render::window::GameWindow;
use crate::render::RenderError;

use target::GlRenderTarget;

struct GlBuffer {
    buffer: glow::Buffer,
    len: usize,
}

struct GlProgram {
    program: glow::Program,
    locations: HashMap<String, Option<glow::UniformLocation>>,
}

#[derive(Default)]
struct GlObjects {
    buffers: HashMap<u32, GlBuffer>,
    vertex_arrays: HashMap<u32, glow::VertexArray>,
    textures: HashMap<u32, glow::Texture>,
    programs: HashMap<u32, GlProgram>,
    targets: HashMap<u32, (GlRenderTarget, u32)>,
}

/// OpenGL rendering backend
pub struct GlBackend {
    gl: glow::Context,
    next_id: Cell<u32>,
    current_program: Cell<Option<u32>>,
    objects: RefCell<GlObjects>,
    fullscreen_vertex_array: glow::VertexArray,
}

impl GlBackend {
    /// Load GL function pointers from the window's current context
    pub fn from_window(window: &mut GameWindow) -> BackendResult<Self> {
        // SAFETY: `GameWindow::new` made its context current on this thread and
        // the loader only resolves symbol names.
        let gl = unsafe { glow::Context::from_loader_function(|name| window.get_proc_address(name)) };
        Self::new(gl)
    }

    /// Wrap an existing context and set the global state the pipeline expects
    pub fn new(gl: glow::Context) -> BackendResult<Self> {
        // SAFETY: the context is current on this thread for the backend's lifetime.
        let fullscreen_vertex_array = unsafe {
            let version = gl.get_parameter_string(glow::VERSION);
            log::info!("OpenGL context: {}", version);

            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.enable(glow::MULTISAMPLE);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

            gl.create_vertex_array().map_err(RenderError::CannotInitialize)?
        };

        Ok(Self {
            gl,
            next_id: Cell::new(1),
            current_program: Cell::new(None),
            objects: RefCell::new(GlObjects::default()),
            fullscreen_vertex_array,
        })
    }

    fn allocate(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn texture_formats(descriptor: &TextureDescriptor) -> (u32, u32, u32) {
        match (descriptor.format, descriptor.srgb) {
            (TextureFormat::R8, _) => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
            (TextureFormat::Rgb8, false) => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
            (TextureFormat::Rgb8, true) => (glow::SRGB8, glow::RGB, glow::UNSIGNED_BYTE),
            (TextureFormat::Rgba8, false) => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
            (TextureFormat::Rgba8, true) => (glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE),
            (TextureFormat::Rgb32F, _) => (glow::RGB16F, glow::RGB, glow::FLOAT),
            (TextureFormat::Rgba32F, _) => (glow::RGBA16F, glow::RGBA, glow::FLOAT),
        }
    }

    fn use_program_id(&self, id: u32, program: glow::Program) {
        if self.current_program.get() != Some(id) {
            // SAFETY: see `new`.
            unsafe { self.gl.use_program(Some(program)) };
            self.current_program.set(Some(id));
        }
    }
}

impl RenderBackend for GlBackend {
    fn name(&self) -> &'static str {
        "opengl"
    }

    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        // Uploads go through ARRAY_BUFFER so a bound vertex array never captures
        // an index buffer by accident.
        // SAFETY: see `new`.
        let buffer = unsafe {
            let buffer = self.gl.create_buffer().map_err(RenderError::Backend)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            buffer
        };
        let handle = BufferHandle(self.allocate());
        self.objects.borrow_mut().buffers.insert(handle.0, GlBuffer { buffer, len: data.len() });
        log::trace!("Created {:?} buffer {} ({} bytes)", kind, handle, data.len());
        Ok(handle)
    }

    fn read_buffer(&self, buffer: BufferHandle) -> BackendResult<Vec<u8>> {
        let objects = self.objects.borrow();
        let record = objects
            .buffers
            .get(&buffer.0)
            .ok_or_else(|| RenderError::Backend(format!("unknown buffer {buffer}")))?;
        let mut data = vec![0u8; record.len];
        // SAFETY: see `new`.
        unsafe {
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, Some(record.buffer));
            self.gl.get_buffer_sub_data(glow::COPY_READ_BUFFER, 0, &mut data);
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, None);
        }
        Ok(data)
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        if let Some(record) = self.objects.borrow_mut().buffers.remove(&buffer.0) {
            // SAFETY: see `new`.
            unsafe { self.gl.delete_buffer(record.buffer) };
        }
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> BackendResult<VertexArrayHandle> {
        let mut objects = self.objects.borrow_mut();
        let (vbo, ebo) = match (objects.buffers.get(&vertex_buffer.0), objects.buffers.get(&index_buffer.0)) {
            (Some(vbo), Some(ebo)) => (vbo.buffer, ebo.buffer),
            _ => return Err(RenderError::Backend("vertex layout references a deleted buffer".to_string())),
        };

        // SAFETY: see `new`.
        let vertex_array = unsafe {
            let vertex_array = self.gl.create_vertex_array().map_err(RenderError::Backend)?;
            self.gl.bind_vertex_array(Some(vertex_array));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            for attribute in &layout.attributes {
                self.gl.enable_vertex_attrib_array(attribute.location);
                self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    layout.stride,
                    attribute.offset,
                );
            }
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            vertex_array
        };

        let handle = VertexArrayHandle(self.allocate());
        objects.vertex_arrays.insert(handle.0, vertex_array);
        Ok(handle)
    }

    fn bind_vertex_array(&self, vertex_array: VertexArrayHandle) {
        let objects = self.objects.borrow();
        match objects.vertex_arrays.get(&vertex_array.0) {
            // SAFETY: see `new`.
            Some(&vao) => unsafe { self.gl.bind_vertex_array(Some(vao)) },
            None => log::warn!("Binding unknown vertex array {}", vertex_array),
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        if let Some(vao) = self.objects.borrow_mut().vertex_arrays.remove(&vertex_array.0) {
            // SAFETY: see `new`.
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor, pixels: &[u8]) -> BackendResult<TextureHandle> {
        if pixels.len() != descriptor.expected_len() {
            return Err(RenderError::Backend(format!(
                "texture data is {} bytes, expected {}",
                pixels.len(),
                descriptor.expected_len()
            )));
        }

        let (internal_format, format, data_type) = Self::texture_formats(descriptor);
        let wrap = match descriptor.wrap {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        };
        let (min_filter, mag_filter) = match (descriptor.filter, descriptor.generate_mipmaps) {
            (TextureFilter::Linear, true) => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
            (TextureFilter::Linear, false) => (glow::LINEAR, glow::LINEAR),
            (TextureFilter::Nearest, _) => (glow::NEAREST, glow::NEAREST),
        };

        // SAFETY: see `new`.
        let texture = unsafe {
            let texture = self.gl.create_texture().map_err(RenderError::Backend)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min_filter as i32);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag_filter as i32);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format as i32,
                descriptor.width as i32,
                descriptor.height as i32,
                0,
                format,
                data_type,
                Some(pixels),
            );
            if descriptor.generate_mipmaps {
                self.gl.generate_mipmap(glow::TEXTURE_2D);
            }
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            texture
        };

        let handle = TextureHandle(self.allocate());
        self.objects.borrow_mut().textures.insert(handle.0, texture);
        log::debug!(
            "Uploaded {}x{} {:?} texture {}",
            descriptor.width,
            descriptor.height,
            descriptor.format,
            handle
        );
        Ok(handle)
    }

    fn bind_texture(&self, unit: u32, texture: TextureHandle) {
        let objects = self.objects.borrow();
        let Some(&gl_texture) = objects.textures.get(&texture.0) else {
            log::warn!("Binding unknown texture {}", texture);
            return;
        };
        // SAFETY: see `new`.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(gl_texture));
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        if let Some(gl_texture) = self.objects.borrow_mut().textures.remove(&texture.0) {
            // SAFETY: see `new`.
            unsafe { self.gl.delete_texture(gl_texture) };
        }
    }

    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> BackendResult<ProgramHandle> {
        let program = shader::link_program(&self.gl, vertex_source, fragment_source)
            .map_err(RenderError::CannotInitialize)?;
        let handle = ProgramHandle(self.allocate());
        self.objects.borrow_mut().programs.insert(
            handle.0,
            GlProgram {
                program,
                locations: HashMap::new(),
            },
        );
        log::debug!("Linked shader program {}", handle);
        Ok(handle)
    }

    fn use_program(&self, program: ProgramHandle) {
        let objects = self.objects.borrow();
        match objects.programs.get(&program.0) {
            Some(record) => self.use_program_id(program.0, record.program),
            None => log::warn!("Using unknown program {}", program),
        }
    }

    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue) {
        let mut objects = self.objects.borrow_mut();
        let Some(record) = objects.programs.get_mut(&program.0) else {
            log::warn!("Setting '{}' on unknown program {}", name, program);
            return;
        };
        self.use_program_id(program.0, record.program);

        let gl = &self.gl;
        let gl_program = record.program;
        let location = record
            .locations
            .entry(name.to_string())
            // SAFETY: see `new`.
            .or_insert_with(|| unsafe { gl.get_uniform_location(gl_program, name) });
        let Some(location) = location.as_ref() else {
            return;
        };

        // SAFETY: see `new`.
        unsafe {
            match value {
                UniformValue::Bool(v) => gl.uniform_1_i32(Some(location), i32::from(v)),
                UniformValue::Int(v) => gl.uniform_1_i32(Some(location), v),
                UniformValue::Float(v) => gl.uniform_1_f32(Some(location), v),
                UniformValue::Vec3([x, y, z]) => gl.uniform_3_f32(Some(location), x, y, z),
                UniformValue::Vec4([x, y, z, w]) => gl.uniform_4_f32(Some(location), x, y, z, w),
                UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(Some(location), false, &m),
                UniformValue::Sampler(unit) => gl.uniform_1_i32(Some(location), unit as i32),
            }
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        if let Some(record) = self.objects.borrow_mut().programs.remove(&program.0) {
            if self.current_program.get() == Some(program.0) {
                self.current_program.set(None);
            }
            // SAFETY: see `new`.
            unsafe { self.gl.delete_program(record.program) };
        }
    }

    fn create_render_target(&self, width: u32, height: u32, samples: u32) -> BackendResult<RenderTargetHandle> {
        let target = GlRenderTarget::create(&self.gl, width, height, samples).map_err(RenderError::Backend)?;
        let texture_id = self.allocate();
        let handle = RenderTargetHandle(self.allocate());
        let mut objects = self.objects.borrow_mut();
        objects.textures.insert(texture_id, target.resolve_texture);
        objects.targets.insert(handle.0, (target, texture_id));
        log::info!("Created {}x{} HDR target with {}x MSAA", width, height, samples);
        Ok(handle)
    }

    fn bind_render_target(&self, target: Option<RenderTargetHandle>) {
        let objects = self.objects.borrow();
        let framebuffer = match target {
            Some(handle) => match objects.targets.get(&handle.0) {
                Some((target, _)) => Some(target.framebuffer),
                None => {
                    log::warn!("Binding unknown render target {}", handle);
                    return;
                }
            },
            None => None,
        };
        // SAFETY: see `new`.
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn resolve_render_target(&self, target: RenderTargetHandle) -> BackendResult<()> {
        let objects = self.objects.borrow();
        let (record, _) = objects
            .targets
            .get(&target.0)
            .ok_or_else(|| RenderError::Backend(format!("unknown render target {target}")))?;
        record.resolve(&self.gl);
        Ok(())
    }

    fn render_target_texture(&self, target: RenderTargetHandle) -> BackendResult<TextureHandle> {
        self.objects
            .borrow()
            .targets
            .get(&target.0)
            .map(|(_, texture_id)| TextureHandle(*texture_id))
            .ok_or_else(|| RenderError::Backend(format!("unknown render target {target}")))
    }

    fn delete_render_target(&self, target: RenderTargetHandle) {
        let mut objects = self.objects.borrow_mut();
        if let Some((record, texture_id)) = objects.targets.remove(&target.0) {
            objects.textures.remove(&texture_id);
            record.destroy(&self.gl);
        }
    }

    fn set_viewport(&self, width: u32, height: u32) {
        // SAFETY: see `new`.
        unsafe { self.gl.viewport(0, 0, width as i32, height as i32) };
    }

    fn clear(&self, flags: ClearFlags, color: Color) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        // SAFETY: see `new`.
        unsafe {
            self.gl.clear_color(color.r, color.g, color.b, color.a);
            self.gl.clear(mask);
        }
    }

    fn set_depth_write(&self, enabled: bool) {
        // SAFETY: see `new`.
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn draw_indexed(&self, index_count: u32) {
        // SAFETY: see `new`.
        unsafe { self.gl.draw_elements(glow::TRIANGLES, index_count as i32, glow::UNSIGNED_INT, 0) };
    }

    fn draw_fullscreen_triangle(&self) {
        // SAFETY: see `new`.
        unsafe {
            self.gl.bind_vertex_array(Some(self.fullscreen_vertex_array));
            self.gl.draw_arrays(glow::TRIANGLES, 0, 3);
        }
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        let objects = self.objects.get_mut();
        log::debug!(
            "Releasing GL backend ({} buffers, {} textures, {} programs still alive)",
            objects.buffers.len(),
            objects.textures.len(),
            objects.programs.len()
        );
        // SAFETY: see `new`.
        unsafe {
            for (target, texture_id) in objects.targets.values() {
                objects.textures.remove(texture_id);
                target.destroy(&self.gl);
            }
            for record in objects.buffers.values() {
                self.gl.delete_buffer(record.buffer);
            }
            for &vao in objects.vertex_arrays.values() {
                self.gl.delete_vertex_array(vao);
            }
            for &texture in objects.textures.values() {
                self.gl.delete_texture(texture);
            }
            for record in objects.programs.values() {
                self.gl.delete_program(record.program);
            }
            self.gl.delete_vertex_array(self.fullscreen_vertex_array);
        }
    }
}
