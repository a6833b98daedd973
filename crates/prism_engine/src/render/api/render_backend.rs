//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait a rendering backend implements so that the
//! resource lifecycle and the frame pipeline never touch a graphics API
//! directly. The production backend is OpenGL; a recording backend stands in
//! for it in tests and headless runs.
//!
//! All methods take `&self`. The device is shared by every GPU object that
//! needs to release itself on drop, and the whole pipeline runs on a single
//! thread, so backends keep their bookkeeping behind `RefCell`/`Cell`.

use std::rc::Rc;

use bitflags::bitflags;

use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Shared reference to the active backend
///
/// Every RAII GPU object keeps one of these so it can release itself.
pub type GpuDevice = Rc<dyn RenderBackend>;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

gpu_handle!(
    /// Handle to a vertex or index buffer
    BufferHandle
);
gpu_handle!(
    /// Handle to a vertex layout descriptor (vertex array object)
    VertexArrayHandle
);
gpu_handle!(
    /// Handle to a 2D texture
    TextureHandle
);
gpu_handle!(
    /// Handle to a linked shader program
    ProgramHandle
);
gpu_handle!(
    /// Handle to an offscreen multisampled HDR render target
    RenderTargetHandle
);

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Interleaved vertex records
    Vertex,
    /// 32-bit triangle-list indices
    Index,
}

/// One float vertex attribute inside an interleaved vertex record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader attribute location
    pub location: u32,
    /// Number of `f32` components
    pub components: i32,
    /// Byte offset inside the record
    pub offset: i32,
}

/// Interleaved vertex layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Size of one vertex record in bytes
    pub stride: i32,
    /// Attributes in location order
    pub attributes: Vec<VertexAttribute>,
}

/// Pixel format of texture data handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single 8-bit channel
    R8,
    /// Three 8-bit channels
    Rgb8,
    /// Four 8-bit channels
    Rgba8,
    /// Three `f32` channels, stored on the GPU as half floats
    Rgb32F,
    /// Four `f32` channels, stored on the GPU as half floats
    Rgba32F,
}

impl TextureFormat {
    /// Bytes per pixel of the source data
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::R8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
            Self::Rgb32F => 12,
            Self::Rgba32F => 16,
        }
    }

    /// Whether the format carries floating point data
    pub fn is_float(self) -> bool {
        matches!(self, Self::Rgb32F | Self::Rgba32F)
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    /// Tile the texture
    #[default]
    Repeat,
    /// Clamp coordinates to the edge texels
    ClampToEdge,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    /// Trilinear filtering (uses mipmaps when present)
    #[default]
    Linear,
    /// Point sampling, used for lookup tables such as the dither pattern
    Nearest,
}

/// Description of a texture upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Source pixel format
    pub format: TextureFormat,
    /// Store as sRGB so sampling converts gamma-encoded data to linear
    pub srgb: bool,
    /// Generate a full mip chain after upload
    pub generate_mipmaps: bool,
    /// Coordinate wrapping
    pub wrap: TextureWrap,
    /// Sampling filter
    pub filter: TextureFilter,
}

impl TextureDescriptor {
    /// Descriptor for a material texture: mipmapped, repeating, linear
    pub fn material(width: u32, height: u32, format: TextureFormat, srgb: bool) -> Self {
        Self {
            width,
            height,
            format,
            srgb,
            generate_mipmaps: true,
            wrap: TextureWrap::Repeat,
            filter: TextureFilter::Linear,
        }
    }

    /// Number of bytes the pixel data must contain
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// A value written to a named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Boolean flag, uploaded as an integer
    Bool(bool),
    /// Signed integer
    Int(i32),
    /// Scalar float
    Float(f32),
    /// 3-component vector
    Vec3([f32; 3]),
    /// 4-component vector
    Vec4([f32; 4]),
    /// Column-major 4x4 matrix
    Mat4([f32; 16]),
    /// Sampler bound to a texture unit
    Sampler(u32),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3([value.x, value.y, value.z])
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4([value.x, value.y, value.z, value.w])
    }
}

impl From<Color> for UniformValue {
    fn from(value: Color) -> Self {
        Self::Vec4(value.to_array())
    }
}

impl From<&Mat4> for UniformValue {
    fn from(value: &Mat4) -> Self {
        Self::Mat4(value.to_column_array())
    }
}

bitflags! {
    /// Buffers cleared at the start of a pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color attachment
        const COLOR = 0b01;
        /// Depth attachment
        const DEPTH = 0b10;
    }
}

/// Main rendering backend trait
///
/// Abstracts the single graphics API the engine targets. Objects are created
/// and destroyed through handles; the caller owns the lifecycle (see
/// [`crate::render::resources::gpu`] for the RAII wrappers).
pub trait RenderBackend {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    // === Buffers ===

    /// Create a buffer and upload `data` into it
    fn create_buffer(&self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Read a buffer's contents back to the CPU
    fn read_buffer(&self, buffer: BufferHandle) -> BackendResult<Vec<u8>>;

    /// Release a buffer
    fn delete_buffer(&self, buffer: BufferHandle);

    // === Vertex layout ===

    /// Create a vertex layout binding a vertex and an index buffer
    fn create_vertex_array(
        &self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        layout: &VertexLayout,
    ) -> BackendResult<VertexArrayHandle>;

    /// Bind a vertex layout for subsequent draws
    fn bind_vertex_array(&self, vertex_array: VertexArrayHandle);

    /// Release a vertex layout
    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);

    // === Textures ===

    /// Create a 2D texture from tightly packed pixel data
    fn create_texture(&self, descriptor: &TextureDescriptor, pixels: &[u8]) -> BackendResult<TextureHandle>;

    /// Bind a texture to a texture unit
    fn bind_texture(&self, unit: u32, texture: TextureHandle);

    /// Release a texture
    fn delete_texture(&self, texture: TextureHandle);

    // === Programs ===

    /// Compile and link a program from vertex and fragment sources
    fn create_program(&self, vertex_source: &str, fragment_source: &str) -> BackendResult<ProgramHandle>;

    /// Make a program current
    fn use_program(&self, program: ProgramHandle);

    /// Write a named uniform of `program`
    ///
    /// Unknown names are ignored, matching how the shader compiler drops
    /// unused uniforms.
    fn set_uniform(&self, program: ProgramHandle, name: &str, value: UniformValue);

    /// Release a program
    fn delete_program(&self, program: ProgramHandle);

    // === Render targets ===

    /// Create a multisampled HDR target with depth plus a resolve texture
    fn create_render_target(&self, width: u32, height: u32, samples: u32) -> BackendResult<RenderTargetHandle>;

    /// Bind a target for drawing; `None` binds the default framebuffer
    fn bind_render_target(&self, target: Option<RenderTargetHandle>);

    /// Resolve the multisampled color into the target's single-sampled texture
    fn resolve_render_target(&self, target: RenderTargetHandle) -> BackendResult<()>;

    /// Texture holding the resolved color of a target
    fn render_target_texture(&self, target: RenderTargetHandle) -> BackendResult<TextureHandle>;

    /// Release a target and its attachments
    fn delete_render_target(&self, target: RenderTargetHandle);

    // === Per-frame state ===

    /// Set the viewport rectangle origin-anchored at (0, 0)
    fn set_viewport(&self, width: u32, height: u32);

    /// Clear the bound target
    fn clear(&self, flags: ClearFlags, color: Color);

    /// Enable or disable depth writes
    fn set_depth_write(&self, enabled: bool);

    /// Draw `index_count` indices from the bound vertex layout as triangles
    fn draw_indexed(&self, index_count: u32);

    /// Draw a single triangle covering the viewport (vertices generated in the shader)
    fn draw_fullscreen_triangle(&self);
}

impl std::fmt::Debug for dyn RenderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RenderBackend({})", self.name())
    }
}
