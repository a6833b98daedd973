//! # Renderer Configuration
//!
//! Configuration structures for the window, the frame pipeline and the shader
//! programs it compiles. Every structure has defaults, so a configuration file
//! only needs to name the values it changes.

use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

use crate::foundation::color::Color;

pub use crate::config::{Config, ConfigError};

/// Paths to the vertex/fragment pair of one shader program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPair {
    /// Path to the vertex shader source
    pub vertex: PathBuf,
    /// Path to the fragment shader source
    pub fragment: PathBuf,
}

impl ShaderPair {
    /// Create a shader pair from two paths
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Read both sources from disk
    pub fn read_sources(&self) -> std::io::Result<(String, String)> {
        let vertex = std::fs::read_to_string(&self.vertex)?;
        let fragment = std::fs::read_to_string(&self.fragment)?;
        Ok((vertex, fragment))
    }
}

/// # Shader Configuration
///
/// Locations of the three programs the pipeline uses: the main geometry pass,
/// the HDR tone-mapping pass and the skybox pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Geometry pass program
    pub main: ShaderPair,
    /// Resolve/tone-mapping program
    pub hdr: ShaderPair,
    /// Environment skybox program
    pub skybox: ShaderPair,
}

impl ShaderConfig {
    /// Shader configuration rooted at `dir`, using the standard file names
    pub fn in_directory(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            main: ShaderPair::new(dir.join("main.vert"), dir.join("main.frag")),
            hdr: ShaderPair::new(dir.join("hdr.vert"), dir.join("hdr.frag")),
            skybox: ShaderPair::new(dir.join("skybox.vert"), dir.join("skybox.frag")),
        }
    }

    /// Create a shader config by probing common shader locations
    ///
    /// Useful for applications that might be run from different working
    /// directories.
    pub fn with_path_resolution() -> Self {
        const SHADER_DIRS: [&str; 4] = [
            "resources/shaders",
            "../resources/shaders",
            "../../resources/shaders",
            "shaders",
        ];

        SHADER_DIRS
            .iter()
            .map(Self::in_directory)
            .find(|config| config.main.vertex.exists())
            .unwrap_or_else(|| Self::in_directory(SHADER_DIRS[0]))
    }

    /// All shader paths, for validation and diagnostics
    pub fn all_paths(&self) -> [&Path; 6] {
        [
            &self.main.vertex,
            &self.main.fragment,
            &self.hdr.vertex,
            &self.hdr.fragment,
            &self.skybox.vertex,
            &self.skybox.fragment,
        ]
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        match self.all_paths().into_iter().find(|path| !path.exists()) {
            Some(missing) => Err(format!("Shader not found: {}", missing.display())),
            None => Ok(()),
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution()
    }
}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Requested width in screen coordinates
    pub width: u32,
    /// Requested height in screen coordinates
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 1280,
            height: 800,
        }
    }
}

/// # Renderer Configuration
///
/// Parameters of the fixed HDR pipeline: projection, clear color and
/// multisampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Vertical field of view in degrees
    pub field_of_view: f32,
    /// Near clipping plane distance
    pub near_plane: f32,
    /// Far clipping plane distance
    pub far_plane: f32,
    /// Color the HDR target is cleared to each frame
    pub clear_color: Color,
    /// Number of MSAA samples for the HDR target
    pub msaa_samples: u32,
    /// Number of environment samples taken for image-based ambient lighting
    pub ibl_samples: u32,
    /// Shader program locations
    pub shaders: ShaderConfig,
}

impl RendererConfig {
    /// Set the field of view in degrees
    pub fn with_field_of_view(mut self, degrees: f32) -> Self {
        self.field_of_view = degrees;
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the MSAA sample count
    pub fn with_msaa_samples(mut self, samples: u32) -> Self {
        self.msaa_samples = samples;
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(format!("Field of view must be in (0, 180), got {}", self.field_of_view));
        }
        if !(self.near_plane > 0.0 && self.near_plane < self.far_plane) {
            return Err(format!(
                "Clipping planes must satisfy 0 < near < far, got {} and {}",
                self.near_plane, self.far_plane
            ));
        }
        if self.msaa_samples == 0 {
            return Err("MSAA sample count must be at least 1".to_string());
        }
        if !self.ibl_samples.is_power_of_two() {
            return Err(format!("IBL sample count must be a power of two, got {}", self.ibl_samples));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            field_of_view: 45.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            clear_color: Color::BLACK,
            msaa_samples: 4,
            ibl_samples: 32,
            shaders: ShaderConfig::default(),
        }
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_default_renderer_config_is_valid() {
        let config = RendererConfig::default();
        assert_eq!(config.msaa_samples, 4);
        assert_eq!(config.field_of_view, 45.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_planes_and_samples() {
        let mut config = RendererConfig::default();
        config.near_plane = 10.0;
        config.far_plane = 1.0;
        assert!(config.validate().is_err());

        let config = RendererConfig::default().with_msaa_samples(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shader_config_uses_standard_names() {
        let shaders = ShaderConfig::in_directory("shaders");
        assert_eq!(shaders.main.vertex, Path::new("shaders/main.vert"));
        assert_eq!(shaders.hdr.fragment, Path::new("shaders/hdr.frag"));
        assert_eq!(shaders.skybox.vertex, Path::new("shaders/skybox.vert"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RendererConfig::from_str_with_format(
            "field_of_view = 60.0\n[clear_color]\nr = 0.15\ng = 0.15\nb = 0.15\na = 1.0\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.field_of_view, 60.0);
        assert_eq!(config.msaa_samples, 4);
        assert_eq!(config.clear_color, Color::rgb(0.15, 0.15, 0.15));
    }
}
