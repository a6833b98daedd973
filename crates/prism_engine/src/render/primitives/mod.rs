//! Core primitive types for rendering
//!
//! Vertex records, meshes and the camera.

pub mod camera;
pub mod mesh;

// Re-export commonly used types
pub use camera::Camera;
pub use mesh::{Mesh, Vertex, compute_tangents, generate_normals};
