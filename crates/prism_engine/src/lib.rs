//! # Prism Engine
//!
//! A small real-time 3D renderer with a fixed HDR pipeline on OpenGL 3.3.
//!
//! ## Features
//!
//! - **Mappable resources**: meshes and models upload to and release from the
//!   GPU explicitly, with GPU objects freed exactly once
//! - **Texture cache**: one upload per source path, with consumer tracking so
//!   freed textures are cleared from every material using them
//! - **Materials**: Blinn-Phong, Cook-Torrance and Ashikhmin-Shirley shading
//!   with texture-or-constant map slots
//! - **Lighting**: a directional light plus a fixed table of point lights
//! - **HDR pipeline**: multisampled HDR geometry pass, resolve, dithered tone
//!   mapping, optional environment skybox and image-based lighting
//! - **Assets**: a compact binary model format and Wavefront OBJ import
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prism_engine::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut window = GameWindow::new(&WindowConfig::default())?;
//!     let device: GpuDevice = Rc::new(GlBackend::from_window(&mut window)?);
//!     let (width, height) = window.framebuffer_size();
//!     let mut renderer = Renderer::new(&device, width, height, RendererConfig::default())?;
//!
//!     let mut cache = TextureCache::new(&device);
//!     let mut model = Model::import_obj("assets/teapot.obj", &mut cache, &TextureImportOptions::default())?;
//!     model.map(&device)?;
//!     let instance = ModelInstance::new(Rc::new(std::cell::RefCell::new(model)));
//!
//!     let camera = Camera::default();
//!     while window.is_running() {
//!         window.poll_events();
//!         renderer.prepare_render(&camera, None)?;
//!         renderer.render_model(&instance, None)?;
//!         renderer.finish_render(&mut window)?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration types
pub mod core;

pub mod foundation;
pub mod config;
pub mod assets;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{ImageData, ModelFile, ObjLoader},
        core::config::{RendererConfig, ShaderConfig, WindowConfig},
        foundation::{
            color::Color,
            math::{Mat4, Quat, Vec3},
        },
        render::{
            api::GpuDevice,
            backends::{GlBackend, HeadlessBackend, HeadlessSurface},
            Camera, DirectionalLight, Environment, FrameState, GameWindow, Light, Mappable, MapSlot,
            Material, Mesh, Model, ModelInstance, PointLight, PointLightRegistry, RenderError,
            RenderResult, Renderer, ShadingModel, Surface, TextureCache, TextureImportOptions, Vertex,
        },
    };
}
