//! Constants shared between the pipeline and the shader sources
//!
//! Values here must agree with `resources/shaders/*.frag`.

/// The maximum number of point lights in a scene
pub const MAX_POINT_LIGHTS: usize = 3;

/// The number of samples for MSAA
pub const MSAA_SAMPLES: u32 = 4;

/// The number of environment samples taken for image-based lighting
///
/// Must be a power of two.
pub const NUM_IBL_SAMPLES: u32 = 32;

/// Near clipping plane of the perspective projection
pub const NEAR_PLANE: f32 = 0.1;

/// Far clipping plane of the perspective projection
pub const FAR_PLANE: f32 = 1000.0;

/// Default ambient lighting coefficient of a material
pub const DEFAULT_AMBIENT_COEFFICIENT: f32 = 0.03;

/// Texture unit the environment map is bound to during the geometry pass
pub const ENVIRONMENT_TEXTURE_UNIT: u32 = 6;

/// Texture unit of the resolved HDR color in the tonemap pass
pub const HDR_TEXTURE_UNIT: u32 = 0;

/// Texture unit of the dither pattern in the tonemap pass
pub const DITHER_TEXTURE_UNIT: u32 = 1;

/// Side length of the ordered dithering matrix
pub const DITHER_SIZE: usize = 8;

/// 8x8 Bayer ordered dithering matrix, values 0..64
pub const DITHER_PATTERN: [u8; DITHER_SIZE * DITHER_SIZE] = [
    0, 32, 8, 40, 2, 34, 10, 42,
    48, 16, 56, 24, 50, 18, 58, 26,
    12, 44, 4, 36, 14, 46, 6, 38,
    60, 28, 52, 20, 62, 30, 54, 22,
    3, 35, 11, 43, 1, 33, 9, 41,
    51, 19, 59, 27, 49, 17, 57, 25,
    15, 47, 7, 39, 13, 45, 5, 37,
    63, 31, 55, 23, 61, 29, 53, 21,
];

/// Uniform names written by the pipeline
pub mod uniforms {
    /// World-to-view matrix
    pub const VIEW_TRANSFORM: &str = "view_transform";
    /// View-to-clip matrix
    pub const PROJECTION_TRANSFORM: &str = "projection_transform";
    /// Camera position in world space
    pub const CAMERA_POSITION: &str = "camera_position";
    /// Object-to-world matrix
    pub const MODEL_TRANSFORM: &str = "model_transform";
    /// Inverse-transpose of the model matrix
    pub const NORMAL_TRANSFORM: &str = "normal_transform";
    /// Whether the override color replaces the albedo
    pub const OVERRIDE_COLOR_ENABLED: &str = "override_color.enabled";
    /// Override color value
    pub const OVERRIDE_COLOR_VALUE: &str = "override_color.value";
    /// Material shading model index
    pub const SHADING_MODEL: &str = "shading_model";
    /// Material ambient coefficient
    pub const AMBIENT_COEFFICIENT: &str = "ambient_coefficient";
    /// Directional light enabled flag
    pub const DIRECTIONAL_ENABLED: &str = "directional_light.enabled";
    /// Directional light direction, normalized
    pub const DIRECTIONAL_DIRECTION: &str = "directional_light.direction";
    /// Directional light irradiance
    pub const DIRECTIONAL_IRRADIANCE: &str = "directional_light.irradiance";
    /// Whether an environment map is bound
    pub const ENVIRONMENT_ENABLED: &str = "environment.enabled";
    /// Environment map sampler
    pub const ENVIRONMENT_TEXTURE: &str = "environment.texture";
    /// Number of environment samples per fragment
    pub const IBL_SAMPLES: &str = "ibl_samples";
    /// Mip level the skybox samples
    pub const SKYBOX_BLUR: &str = "skybox_blur";
    /// Resolved HDR color sampler of the tonemap pass
    pub const HDR_BUFFER: &str = "hdr_buffer";
    /// Dither pattern sampler of the tonemap pass
    pub const DITHER_MATRIX: &str = "dither_matrix";

    /// Uniform name of one field of point light slot `index`
    pub fn point_light(index: usize, field: &str) -> String {
        format!("point_lights[{index}].{field}")
    }
}
