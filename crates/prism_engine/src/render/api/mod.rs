//! Public rendering API
//!
//! The backend seam: the trait every rendering backend implements, the handle
//! types it hands out, and the value types passed across it.

pub mod render_backend;

// Re-export commonly used types
pub use render_backend::{
    RenderBackend, BackendResult, GpuDevice,
    BufferHandle, VertexArrayHandle, TextureHandle, ProgramHandle, RenderTargetHandle,
    BufferKind, VertexAttribute, VertexLayout,
    TextureDescriptor, TextureFormat, TextureWrap, TextureFilter,
    UniformValue, ClearFlags,
};
