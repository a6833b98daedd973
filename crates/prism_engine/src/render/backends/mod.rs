//! Backend implementations for the render module
//!
//! `opengl` is the production backend. `headless` records calls instead of
//! issuing them and backs the test suite and `--headless` runs.

/// OpenGL 3.3 core backend
pub mod opengl;

/// Recording backend without a GPU
pub mod headless;

pub use headless::{Command, HeadlessBackend, HeadlessSurface};
pub use opengl::GlBackend;
