//! Lighting system
//!
//! Light types, the point light slot registry and directional light upload.

pub mod lights;
pub mod registry;

pub use lights::{DirectionalLight, Light, LightId, PointLight};
pub use registry::{set_directional_light, unset_directional_light, PointLightRegistry};
