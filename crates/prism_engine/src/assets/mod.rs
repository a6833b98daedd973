//! Asset loading
//!
//! Image decoding, the binary model format and OBJ import. Loaders here
//! produce CPU-side data only; GPU upload happens in the render resources.

pub mod image_loader;
pub mod model_format;
pub mod obj_loader;

pub use image_loader::{ImageData, ImageFileLoader, TextureLoader};
pub use model_format::ModelFile;
pub use obj_loader::{ObjLoader, ObjMaterial, ObjMesh, ObjScene};
