//! Material system
//!
//! Material definitions and the texture cache that owns their textures.

pub mod material;
pub mod texture_cache;

pub use material::{MapSlot, Material, MaterialId, MaterialMap, MaterialRef, ShadingModel, TextureImportOptions};
pub use texture_cache::TextureCache;
