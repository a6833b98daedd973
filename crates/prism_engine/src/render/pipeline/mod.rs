//! Frame pipeline
//!
//! The Prepare → Render → Finish state machine and the passes it runs.

pub mod renderer;

#[cfg(test)]
mod pipeline_tests;

pub use renderer::{perspective_projection, FrameState, Renderer};
