//! GPU-backed resources
//!
//! Owning GPU objects, the mappable meshes and models built on them,
//! materials with their texture cache, model instances and environments.

pub mod environment;
pub mod gpu;
pub mod mappable;
pub mod materials;
pub mod model;
pub mod model_instance;

pub use environment::Environment;
pub use gpu::{GpuBuffer, GpuTexture, GpuVertexArray, RenderTarget, ShaderProgram};
pub use mappable::Mappable;
pub use materials::{
    MapSlot, Material, MaterialId, MaterialMap, MaterialRef, ShadingModel, TextureCache,
    TextureImportOptions,
};
pub use model::Model;
pub use model_instance::{ModelInstance, ModelRef};
