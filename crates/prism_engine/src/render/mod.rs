//! # Rendering System
//!
//! GPU resource lifecycle and the fixed HDR frame pipeline.
//!
//! ## Architecture
//!
//! - **API** (`api`): the [`RenderBackend`] seam, its handles and value types
//! - **Backends** (`backends`): OpenGL through `glow`, plus a recording backend
//! - **Window** (`window`): the glfw window and the [`Surface`] trait
//! - **Primitives** (`primitives`): vertices, meshes and the camera
//! - **Resources** (`resources`): mappable meshes and models, materials, the
//!   texture cache, model instances and environments
//! - **Systems** (`systems`): point and directional lights
//! - **Pipeline** (`pipeline`): the Prepare → Render → Finish state machine
//!
//! Everything runs on the thread that owns the graphics context.

// Public modules for application use
pub mod api;
pub mod backends;
pub mod constants;
pub mod window;

// Core primitives
pub mod primitives;

// Resources
pub mod resources;

// Systems
pub mod systems;

// Frame pipeline
pub mod pipeline;

pub use api::{RenderBackend, BackendResult, GpuDevice, TextureHandle, UniformValue};
pub use constants::MAX_POINT_LIGHTS;
pub use window::{GameWindow, Surface, WindowError};

pub use primitives::{Camera, Mesh, Vertex};
pub use resources::{
    Mappable, Model, ModelInstance, Environment,
    Material, MaterialId, MaterialRef, MapSlot, ShadingModel,
    TextureCache, TextureImportOptions,
};
pub use systems::lighting::{DirectionalLight, Light, LightId, PointLight, PointLightRegistry};
pub use pipeline::{FrameState, Renderer};

use thiserror::Error;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Rendering errors
///
/// One variant per failure kind. None of them is retried internally; they are
/// returned to the immediate caller.
#[derive(Error, Debug)]
pub enum RenderError {
    /// `map` called on a resource that is already mapped
    #[error("Buffers are already mapped")]
    BuffersAlreadyMapped,

    /// `unmap` or a draw on a resource that is not mapped
    #[error("Buffers are not yet mapped")]
    BuffersNotYetMapped,

    /// An image could not be read, decoded or has an unsupported layout
    #[error("Cannot load texture '{path}': {reason}")]
    CannotLoadTexture {
        /// Source path of the texture
        path: String,
        /// What went wrong
        reason: String,
    },

    /// A model file is truncated, has trailing bytes or an impossible size
    #[error("Invalid model file format: {0}")]
    InvalidFileFormat(String),

    /// A model file names an unknown shading model
    #[error("Invalid shader type {0}")]
    InvalidShaderType(u8),

    /// A model could not be imported through the import library
    #[error("Model import failed: {0}")]
    ImportFailed(String),

    /// A light is registered twice, or is not registered at all
    #[error("Invalid light")]
    InvalidLight,

    /// Every point light slot is taken
    #[error("Too many lights (maximum is {})", MAX_POINT_LIGHTS)]
    TooManyLights,

    /// The window, context or a shader program could not be set up
    #[error("Cannot initialize renderer: {0}")]
    CannotInitialize(String),

    /// A pipeline call arrived in the wrong frame state
    #[error("Cannot {operation} while {state:?}")]
    InvalidFrameState {
        /// The rejected call
        operation: &'static str,
        /// The state the pipeline was in
        state: FrameState,
    },

    /// Mesh data violates the triangle-list invariants
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The backend rejected an operation
    #[error("Backend error: {0}")]
    Backend(String),

    /// Underlying IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
