//! # Core Engine Module
//!
//! Shared configuration types used by the window, the renderer and
//! applications built on top of them.

pub mod config;

// Re-export commonly used config types
pub use config::{
    RendererConfig,
    ShaderConfig,
    ShaderPair,
    WindowConfig,
    Config,
    ConfigError,
};
