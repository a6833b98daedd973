//! Viewer scene description
//!
//! Everything the viewer shows comes from one TOML file: which models to
//! load, where to place instances of them, the lights, the environment map
//! and how the orbit camera responds to input.

use std::path::PathBuf;

use prism_engine::config::Config;
use prism_engine::prelude::{RendererConfig, WindowConfig};
use serde::{Deserialize, Serialize};

/// Top-level viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Frames rendered in `--headless` mode
    pub headless_frames: u32,
    /// Window settings
    pub window: WindowConfig,
    /// Pipeline settings
    pub renderer: RendererConfig,
    /// Orbit camera settings
    pub camera: CameraSettings,
    /// Models to load, referenced by name from instances
    pub models: Vec<ModelEntry>,
    /// Placed copies of the loaded models
    pub instances: Vec<InstanceEntry>,
    /// Point lights, at most as many as the shader has slots
    pub point_lights: Vec<PointLightEntry>,
    /// Optional sun
    pub directional_light: Option<DirectionalLightEntry>,
    /// Optional HDR environment map
    pub environment: Option<EnvironmentEntry>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            headless_frames: 60,
            window: WindowConfig {
                title: "Prism Model Viewer".to_string(),
                ..WindowConfig::default()
            },
            renderer: RendererConfig::default(),
            camera: CameraSettings::default(),
            models: Vec::new(),
            instances: Vec::new(),
            point_lights: vec![PointLightEntry::default()],
            directional_light: Some(DirectionalLightEntry::default()),
            environment: None,
        }
    }
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Names of instances whose model is not declared
    pub fn dangling_instances(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|instance| !self.models.iter().any(|model| model.name == instance.model))
            .map(|instance| instance.model.as_str())
            .collect()
    }
}

/// Orbit camera tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Point the camera orbits around
    pub target: [f32; 3],
    /// Initial distance from the target
    pub distance: f32,
    /// Initial yaw in degrees
    pub yaw: f32,
    /// Initial pitch in degrees
    pub pitch: f32,
    /// Degrees of rotation per pixel of mouse drag
    pub rotate_sensitivity: f32,
    /// Fraction of the distance covered per scroll step
    pub zoom_sensitivity: f32,
    /// Closest allowed distance
    pub min_distance: f32,
    /// Farthest allowed distance
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            target: [0.0, 0.0, 0.0],
            distance: 5.0,
            yaw: 0.0,
            pitch: 20.0,
            rotate_sensitivity: 0.3,
            zoom_sensitivity: 0.1,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }
}

/// A model file to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Name instances refer to
    pub name: String,
    /// `.obj` files are imported, anything else is read as a binary model
    pub path: PathBuf,
}

impl ModelEntry {
    /// Whether the file is a Wavefront OBJ
    pub fn is_obj(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
    }
}

/// Placement of one model instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceEntry {
    /// Name of the model to place
    pub model: String,
    /// World position
    pub position: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
    /// Euler angles in degrees (roll, pitch, yaw)
    pub rotation: [f32; 3],
    /// Spin around the Y axis in degrees per second
    pub spin: f32,
    /// Flat RGBA color replacing the material albedo
    pub color: Option<[f32; 4]>,
}

impl Default for InstanceEntry {
    fn default() -> Self {
        Self {
            model: String::new(),
            position: [0.0; 3],
            scale: [1.0; 3],
            rotation: [0.0; 3],
            spin: 0.0,
            color: None,
        }
    }
}

/// One point light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLightEntry {
    /// World position
    pub position: [f32; 3],
    /// Irradiance per channel
    pub irradiance: [f32; 3],
    /// Constant, linear and quadratic attenuation
    pub attenuation: [f32; 3],
}

impl Default for PointLightEntry {
    fn default() -> Self {
        Self {
            position: [2.0, 3.0, 2.0],
            irradiance: [4.0, 4.0, 4.0],
            attenuation: [1.0, 0.09, 0.032],
        }
    }
}

/// The directional light
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightEntry {
    /// Direction the light travels in
    pub direction: [f32; 3],
    /// Irradiance per channel
    pub irradiance: [f32; 3],
}

impl Default for DirectionalLightEntry {
    fn default() -> Self {
        Self {
            direction: [-0.3, -1.0, -0.5],
            irradiance: [0.6, 0.6, 0.6],
        }
    }
}

/// HDR environment map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    /// Path to a Radiance `.hdr` file
    pub path: PathBuf,
    /// Mip bias applied when drawing the skybox
    #[serde(default)]
    pub skybox_blur: f32,
}
