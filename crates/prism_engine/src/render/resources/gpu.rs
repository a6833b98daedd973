//! Owning wrappers around backend objects
//!
//! Each wrapper keeps a clone of the device and releases its object exactly
//! once when dropped. Anything that only needs to *refer* to an object (a
//! material slot, a uniform) copies the bare handle instead.

use std::path::Path;

use crate::core::config::ShaderPair;
use crate::render::api::{
    BufferHandle, BufferKind, GpuDevice, ProgramHandle, RenderTargetHandle, TextureDescriptor,
    TextureHandle, UniformValue, VertexArrayHandle, VertexLayout,
};
use crate::render::{RenderError, RenderResult};

/// GPU buffer owning one backend buffer object
#[derive(Debug)]
pub struct GpuBuffer {
    device: GpuDevice,
    handle: BufferHandle,
    kind: BufferKind,
    len: usize,
}

impl GpuBuffer {
    /// Create a buffer holding a copy of `data`
    pub fn new(device: &GpuDevice, kind: BufferKind, data: &[u8]) -> RenderResult<Self> {
        let handle = device.create_buffer(kind, data)?;
        Ok(Self {
            device: device.clone(),
            handle,
            kind,
            len: data.len(),
        })
    }

    /// Backend handle
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// What the buffer holds
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the buffer contents back to the CPU
    pub fn read_back(&self) -> RenderResult<Vec<u8>> {
        self.device.read_buffer(self.handle)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.device.delete_buffer(self.handle);
    }
}

/// Vertex layout descriptor owning one backend vertex array
#[derive(Debug)]
pub struct GpuVertexArray {
    device: GpuDevice,
    handle: VertexArrayHandle,
}

impl GpuVertexArray {
    /// Describe how `vertices` is laid out and attach `indices`
    pub fn new(device: &GpuDevice, vertices: &GpuBuffer, indices: &GpuBuffer, layout: &VertexLayout) -> RenderResult<Self> {
        let handle = device.create_vertex_array(vertices.handle(), indices.handle(), layout)?;
        Ok(Self {
            device: device.clone(),
            handle,
        })
    }

    /// Bind for the next draw
    pub fn bind(&self) {
        self.device.bind_vertex_array(self.handle);
    }

    /// Backend handle
    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }
}

impl Drop for GpuVertexArray {
    fn drop(&mut self) {
        self.device.delete_vertex_array(self.handle);
    }
}

/// 2D texture owning one backend texture
#[derive(Debug)]
pub struct GpuTexture {
    device: GpuDevice,
    handle: TextureHandle,
    descriptor: TextureDescriptor,
}

impl GpuTexture {
    /// Upload pixel data described by `descriptor`
    pub fn new(device: &GpuDevice, descriptor: TextureDescriptor, pixels: &[u8]) -> RenderResult<Self> {
        let handle = device.create_texture(&descriptor, pixels)?;
        Ok(Self {
            device: device.clone(),
            handle,
            descriptor,
        })
    }

    /// Bind to a texture unit
    pub fn bind(&self, unit: u32) {
        self.device.bind_texture(unit, self.handle);
    }

    /// Backend handle, for non-owning references
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Upload parameters
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.device.delete_texture(self.handle);
    }
}

/// Linked shader program
#[derive(Debug)]
pub struct ShaderProgram {
    device: GpuDevice,
    handle: ProgramHandle,
}

impl ShaderProgram {
    /// Compile and link a program from source text
    pub fn from_sources(device: &GpuDevice, vertex_source: &str, fragment_source: &str) -> RenderResult<Self> {
        let handle = device.create_program(vertex_source, fragment_source)?;
        Ok(Self {
            device: device.clone(),
            handle,
        })
    }

    /// Read both stages from disk, then compile and link
    ///
    /// Every failure, missing files included, is reported as
    /// [`RenderError::CannotInitialize`].
    pub fn from_files(device: &GpuDevice, shaders: &ShaderPair) -> RenderResult<Self> {
        let (vertex, fragment) = shaders.read_sources().map_err(|e| {
            log::error!("Cannot read shader sources {}: {}", describe(shaders), e);
            RenderError::CannotInitialize(format!("cannot read {}: {e}", describe(shaders)))
        })?;
        Self::from_sources(device, &vertex, &fragment).map_err(|e| {
            RenderError::CannotInitialize(format!("cannot build {}: {e}", describe(shaders)))
        })
    }

    /// Make this program current
    pub fn activate(&self) {
        self.device.use_program(self.handle);
    }

    /// Write a named uniform
    pub fn set(&self, name: &str, value: impl Into<UniformValue>) {
        self.device.set_uniform(self.handle, name, value.into());
    }

    /// Backend handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Device the program lives on
    pub fn device(&self) -> &GpuDevice {
        &self.device
    }
}

fn describe(shaders: &ShaderPair) -> String {
    let name = |path: &Path| path.display().to_string();
    format!("{} + {}", name(&shaders.vertex), name(&shaders.fragment))
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.device.delete_program(self.handle);
    }
}

/// Multisampled HDR target with a single-sampled resolve texture
#[derive(Debug)]
pub struct RenderTarget {
    device: GpuDevice,
    handle: RenderTargetHandle,
    width: u32,
    height: u32,
    samples: u32,
}

impl RenderTarget {
    /// Allocate a target of the given size and sample count
    pub fn new(device: &GpuDevice, width: u32, height: u32, samples: u32) -> RenderResult<Self> {
        let handle = device.create_render_target(width, height, samples)?;
        Ok(Self {
            device: device.clone(),
            handle,
            width,
            height,
            samples,
        })
    }

    /// Bind for drawing
    pub fn bind(&self) {
        self.device.bind_render_target(Some(self.handle));
    }

    /// Resolve multisampled color into the resolve texture
    pub fn resolve(&self) -> RenderResult<()> {
        self.device.resolve_render_target(self.handle)
    }

    /// Resolve texture handle; owned by the target
    pub fn resolved_texture(&self) -> RenderResult<TextureHandle> {
        self.device.render_target_texture(self.handle)
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MSAA sample count
    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        self.device.delete_render_target(self.handle);
    }
}
