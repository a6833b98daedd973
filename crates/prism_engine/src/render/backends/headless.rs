//! Recording backend
//!
//! Implements [`RenderBackend`] without a GPU. Every call is appended to a
//! command log, buffer contents are kept in memory, and the last value written
//! to each uniform is remembered per program. Tests inspect this state to check
//! the resource lifecycle and the pipeline's ordering; the viewer uses it for
//! `--headless` runs.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::foundation::color::Color;
use crate::render::api::{
    BackendResult, BufferHandle, BufferKind, ClearFlags, ProgramHandle, RenderBackend,
    RenderTargetHandle, TextureDescriptor, TextureFilter, TextureFormat, TextureHandle,
    TextureWrap, UniformValue, VertexArrayHandle, VertexLayout,
};
use crate::render::window::Surface;
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A buffer was created
    CreateBuffer(BufferHandle, BufferKind, usize),
    /// A buffer was deleted
    DeleteBuffer(BufferHandle),
    /// A vertex layout was created
    CreateVertexArray(VertexArrayHandle),
    /// A vertex layout was bound
    BindVertexArray(VertexArrayHandle),
    /// A vertex layout was deleted
    DeleteVertexArray(VertexArrayHandle),
    /// A texture was created
    CreateTexture(TextureHandle, TextureDescriptor),
    /// A texture was bound to a unit
    BindTexture(u32, TextureHandle),
    /// A texture was deleted
    DeleteTexture(TextureHandle),
    /// A program was linked
    CreateProgram(ProgramHandle),
    /// A program was made current
    UseProgram(ProgramHandle),
    /// A program was deleted
    DeleteProgram(ProgramHandle),
    /// A render target was created
    CreateRenderTarget(RenderTargetHandle, u32, u32, u32),
    /// A render target (or the default framebuffer) was bound
    BindRenderTarget(Option<RenderTargetHandle>),
    /// A render target was resolved
    ResolveRenderTarget(RenderTargetHandle),
    /// A render target was deleted
    DeleteRenderTarget(RenderTargetHandle),
    /// The viewport changed
    SetViewport(u32, u32),
    /// The bound target was cleared
    Clear(ClearFlags, Color),
    /// Depth writes were toggled
    SetDepthWrite(bool),
    /// An indexed draw was issued
    DrawIndexed(u32),
    /// A fullscreen triangle was drawn
    DrawFullscreen,
}

#[derive(Debug, Default)]
struct TargetRecord {
    resolve_texture: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    commands: Vec<Command>,
    buffers: HashMap<u32, Vec<u8>>,
    vertex_arrays: HashMap<u32, (BufferHandle, BufferHandle)>,
    textures: HashMap<u32, TextureDescriptor>,
    programs: HashSet<u32>,
    targets: HashMap<u32, TargetRecord>,
    uniforms: HashMap<(u32, String), UniformValue>,
}

/// GPU-free backend that records every call
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: Cell<u32>,
    state: RefCell<HeadlessState>,
}

impl HeadlessBackend {
    /// Create an empty recording backend
    pub fn new() -> Self {
        log::info!("Creating headless render backend");
        Self {
            next_id: Cell::new(1),
            state: RefCell::new(HeadlessState::default()),
        }
    }

    fn allocate(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, command: Command) {
        log::trace!("headless: {:?}", command);
        self.state.borrow_mut().commands.push(command);
    }

    /// Snapshot of the command log
    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    /// Drop all recorded commands, keeping live objects and uniforms
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Number of recorded commands matching `predicate`
    pub fn count_commands(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.state.borrow().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Last value written to `name` on `program`
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.state.borrow().uniforms.get(&(program.0, name.to_string())).copied()
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Number of vertex layouts currently alive
    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    /// Number of textures currently alive, render target attachments included
    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Number of programs currently alive
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Whether `texture` is alive
    pub fn is_texture_alive(&self, texture: TextureHandle) -> bool {
        self.state.borrow().textures.contains_key(&texture.0)
    }

    /// Descriptor a texture was created with
    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.state.borrow().textures.get(&texture.0).copied()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        let handle = BufferHandle(self.allocate());
        self.state.borrow_mut().buffers.insert(handle.0, data.to_vec());
        self.record(Command::CreateBuffer(handle, kind, data.len()));
        Ok(handle)
    }

    fn read_buffer(&self, buffer: BufferHandle) -> BackendResult<Vec<u8>> {
        self.state
            .borrow()
            .buffers
            .get(&buffer.0)
            .cloned()
            .ok_or_else(|| RenderError::Backend(format!("unknown buffer {buffer}")))
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.state.borrow_mut().buffers.remove(&buffer.0);
        self.record(Command::DeleteBuffer(buffer));
    }

    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> BackendResult<VertexArrayHandle> {
        {
            let state = self.state.borrow();
            if !state.buffers.contains_key(&vertex_buffer.0) || !state.buffers.contains_key(&index_buffer.0) {
                return Err(RenderError::Backend("vertex layout references a deleted buffer".to_string()));
            }
        }
        if layout.attributes.is_empty() {
            return Err(RenderError::Backend("vertex layout has no attributes".to_string()));
        }
        let handle = VertexArrayHandle(self.allocate());
        self.state.borrow_mut().vertex_arrays.insert(handle.0, (vertex_buffer, index_buffer));
        self.record(Command::CreateVertexArray(handle));
        Ok(handle)
    }

    fn bind_vertex_array(&self, vertex_array: VertexArrayHandle) {
        self.record(Command::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle) {
        self.state.borrow_mut().vertex_arrays.remove(&vertex_array.0);
        self.record(Command::DeleteVertexArray(vertex_array));
    }

    fn create_texture(&self, descriptor: &TextureDescriptor, pixels: &[u8]) -> BackendResult<TextureHandle> {
        if pixels.len() != descriptor.expected_len() {
            return Err(RenderError::Backend(format!(
                "texture data is {} bytes, expected {}",
                pixels.len(),
                descriptor.expected_len()
            )));
        }
        let handle = TextureHandle(self.allocate());
        self.state.borrow_mut().textures.insert(handle.0, *descriptor);
        self.record(Command::CreateTexture(handle, *descriptor));
        Ok(handle)
    }

    fn bind_texture(&self, unit: u32, texture: TextureHandle) {
        self.record(Command::BindTexture(unit, texture));
    }

    fn delete_texture(&self, texture: TextureHandle) {
        self.state.borrow_mut().textures.remove(&texture.0);
        self.record(Command::DeleteTexture(texture));
    }

    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> BackendResult<ProgramHandle> {
        for (stage, source) in [("vertex", vertex_source), ("fragment", fragment_source)] {
            if !source.contains("void main") {
                log::error!("{} shader has no entry point", stage);
                return Err(RenderError::CannotInitialize(format!("{stage} shader has no entry point")));
            }
        }
        let handle = ProgramHandle(self.allocate());
        self.state.borrow_mut().programs.insert(handle.0);
        self.record(Command::CreateProgram(handle));
        Ok(handle)
    }

    fn use_program(&self, program: ProgramHandle) {
        self.record(Command::UseProgram(program));
    }

    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.state.borrow_mut().uniforms.insert((program.0, name.to_string()), value);
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.0);
        state.uniforms.retain(|(owner, _), _| *owner != program.0);
        drop(state);
        self.record(Command::DeleteProgram(program));
    }

    fn create_render_target(&self, width: u32, height: u32, samples: u32) -> BackendResult<RenderTargetHandle> {
        if width == 0 || height == 0 {
            return Err(RenderError::Backend(format!("render target size {width}x{height} is empty")));
        }
        let handle = RenderTargetHandle(self.allocate());
        let resolve_texture = self.allocate();
        let descriptor = TextureDescriptor {
            width,
            height,
            format: TextureFormat::Rgba32F,
            srgb: false,
            generate_mipmaps: false,
            wrap: TextureWrap::ClampToEdge,
            filter: TextureFilter::Linear,
        };
        {
            let mut state = self.state.borrow_mut();
            state.textures.insert(resolve_texture, descriptor);
            state.targets.insert(handle.0, TargetRecord { resolve_texture });
        }
        self.record(Command::CreateRenderTarget(handle, width, height, samples));
        Ok(handle)
    }

    fn bind_render_target(&self, target: Option<RenderTargetHandle>) {
        self.record(Command::BindRenderTarget(target));
    }

    fn resolve_render_target(&self, target: RenderTargetHandle) -> BackendResult<()> {
        if !self.state.borrow().targets.contains_key(&target.0) {
            return Err(RenderError::Backend(format!("unknown render target {target}")));
        }
        self.record(Command::ResolveRenderTarget(target));
        Ok(())
    }

    fn render_target_texture(&self, target: RenderTargetHandle) -> BackendResult<TextureHandle> {
        self.state
            .borrow()
            .targets
            .get(&target.0)
            .map(|record| TextureHandle(record.resolve_texture))
            .ok_or_else(|| RenderError::Backend(format!("unknown render target {target}")))
    }

    fn delete_render_target(&self, target: RenderTargetHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.targets.remove(&target.0) {
            state.textures.remove(&record.resolve_texture);
        }
        drop(state);
        self.record(Command::DeleteRenderTarget(target));
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.record(Command::SetViewport(width, height));
    }

    fn clear(&self, flags: ClearFlags, color: Color) {
        self.record(Command::Clear(flags, color));
    }

    fn set_depth_write(&self, enabled: bool) {
        self.record(Command::SetDepthWrite(enabled));
    }

    fn draw_indexed(&self, index_count: u32) {
        self.record(Command::DrawIndexed(index_count));
    }

    fn draw_fullscreen_triangle(&self) {
        self.record(Command::DrawFullscreen);
    }
}

/// Presentation surface for headless rendering
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    presents: Cell<u64>,
}

impl HeadlessSurface {
    /// Create a surface with a fixed framebuffer size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            presents: Cell::new(0),
        }
    }

    /// Number of frames presented so far
    pub fn present_count(&self) -> u64 {
        self.presents.get()
    }
}

impl Surface for HeadlessSurface {
    fn present(&mut self) {
        self.presents.set(self.presents.get() + 1);
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_store_and_release_contents() {
        let backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(BufferKind::Vertex, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.read_buffer(buffer).unwrap(), vec![1, 2, 3, 4]);

        backend.delete_buffer(buffer);
        assert_eq!(backend.live_buffers(), 0);
        assert!(backend.read_buffer(buffer).is_err());
    }

    #[test]
    fn test_handles_are_never_zero() {
        let backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(BufferKind::Index, &[]).unwrap();
        assert_ne!(buffer.0, 0);
    }

    #[test]
    fn test_texture_size_is_checked() {
        let backend = HeadlessBackend::new();
        let descriptor = TextureDescriptor::material(2, 2, TextureFormat::Rgba8, false);
        assert!(backend.create_texture(&descriptor, &[0; 15]).is_err());
        assert!(backend.create_texture(&descriptor, &[0; 16]).is_ok());
    }

    #[test]
    fn test_uniforms_are_tracked_per_program() {
        let backend = HeadlessBackend::new();
        let a = backend.create_program("void main() {}", "void main() {}").unwrap();
        let b = backend.create_program("void main() {}", "void main() {}").unwrap();
        backend.set_uniform(a, "shading_model", UniformValue::Int(1));

        assert_eq!(backend.uniform(a, "shading_model"), Some(UniformValue::Int(1)));
        assert_eq!(backend.uniform(b, "shading_model"), None);
    }

    #[test]
    fn test_program_without_entry_point_fails() {
        let backend = HeadlessBackend::new();
        let result = backend.create_program("", "void main() {}");
        assert!(matches!(result, Err(RenderError::CannotInitialize(_))));
    }

    #[test]
    fn test_surface_counts_presents() {
        let mut surface = HeadlessSurface::new(640, 480);
        surface.present();
        surface.present();
        assert_eq!(surface.present_count(), 2);
        assert_eq!(surface.framebuffer_size(), (640, 480));
    }
}
