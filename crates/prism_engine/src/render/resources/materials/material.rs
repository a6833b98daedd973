//! Materials: a shading model plus a fixed set of map slots
//!
//! Every slot holds either a texture handle or a constant fallback value.
//! Textures are owned by the [`TextureCache`](super::TextureCache); a material
//! only keeps detached handles, which the cache clears when it frees a texture.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::render::api::{TextureHandle, UniformValue};
use crate::render::constants::{uniforms, DEFAULT_AMBIENT_COEFFICIENT};
use crate::render::resources::gpu::ShaderProgram;
use crate::render::RenderError;

/// Reflectance model evaluated by the main fragment shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadingModel {
    /// Blinn-Phong
    #[default]
    BlinnPhong,
    /// Cook-Torrance microfacet model
    CookTorrance,
    /// Ashikhmin-Shirley anisotropic model
    AshikhminShirley,
}

impl ShadingModel {
    /// Index stored in model files and uploaded to the shader
    pub fn index(self) -> u8 {
        match self {
            Self::BlinnPhong => 0,
            Self::CookTorrance => 1,
            Self::AshikhminShirley => 2,
        }
    }
}

impl TryFrom<u8> for ShadingModel {
    type Error = RenderError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::BlinnPhong),
            1 => Ok(Self::CookTorrance),
            2 => Ok(Self::AshikhminShirley),
            other => Err(RenderError::InvalidShaderType(other)),
        }
    }
}

/// Named texture-or-constant channel of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapSlot {
    /// Base color
    Albedo,
    /// Specular color (Blinn-Phong) or metalness (microfacet models)
    Specular,
    /// Roughness, or gloss for Blinn-Phong
    Roughness,
    /// Tangent-space normal map
    Normal,
    /// Ambient occlusion
    AmbientOcclusion,
    /// Index of refraction
    Ior,
}

impl MapSlot {
    /// Every slot, in texture unit order
    pub const ALL: [MapSlot; 6] = [
        Self::Albedo,
        Self::Specular,
        Self::Roughness,
        Self::Normal,
        Self::AmbientOcclusion,
        Self::Ior,
    ];

    /// Slots stored in model files, in file order
    pub const FILE_ORDER: [MapSlot; 5] = [
        Self::Albedo,
        Self::Specular,
        Self::Roughness,
        Self::Normal,
        Self::AmbientOcclusion,
    ];

    /// Position in [`MapSlot::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Texture unit the slot binds to; distinct for every slot
    pub fn texture_unit(self) -> u32 {
        self as u32
    }

    /// Uniform struct name in the main shader
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::Albedo => "albedo_map",
            Self::Specular => "specular_map",
            Self::Roughness => "roughness_map",
            Self::Normal => "normal_map",
            Self::AmbientOcclusion => "ao_map",
            Self::Ior => "ior_map",
        }
    }

    /// Whether the constant is a scalar (stored in `x`) rather than a vector
    pub fn is_scalar(self) -> bool {
        matches!(self, Self::Roughness | Self::AmbientOcclusion | Self::Ior)
    }

    /// Constant used when nothing else is set
    pub fn default_value(self) -> Vec3 {
        match self {
            // Fully lit neutral surface
            Self::Albedo => Vec3::new(1.0, 1.0, 1.0),
            // No reflectance
            Self::Specular => Vec3::zeros(),
            Self::Roughness => Vec3::new(0.5, 0.0, 0.0),
            // Encoded (0, 0, 1): no perturbation
            Self::Normal => Vec3::new(0.5, 0.5, 1.0),
            // Unoccluded
            Self::AmbientOcclusion => Vec3::new(1.0, 0.0, 0.0),
            Self::Ior => Vec3::new(1.5, 0.0, 0.0),
        }
    }
}

/// One slot: a texture, or a constant when no texture is set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialMap {
    /// Bound texture, if any
    pub texture: Option<TextureHandle>,
    /// Fallback constant, ignored while `texture` is set
    pub value: Vec3,
}

/// Unique identity of a material, used to track texture consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u64);

impl MaterialId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Shared, mutable material
///
/// Meshes share materials, and the texture cache reaches into them to clear
/// freed handles.
pub type MaterialRef = Rc<RefCell<Material>>;

/// Per-slot gamma handling when importing textures
///
/// Color data authored in sRGB should be linearized; data maps (normals,
/// roughness) must not be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureImportOptions {
    linearize: [bool; 6],
}

impl TextureImportOptions {
    /// Linearize no slot
    pub fn none() -> Self {
        Self { linearize: [false; 6] }
    }

    /// Set whether `slot` is converted from gamma space to linear
    pub fn with_linearize(mut self, slot: MapSlot, linearize: bool) -> Self {
        self.linearize[slot.index()] = linearize;
        self
    }

    /// Whether `slot` is converted from gamma space to linear
    pub fn linearize(&self, slot: MapSlot) -> bool {
        self.linearize[slot.index()]
    }
}

impl Default for TextureImportOptions {
    /// Albedo only
    fn default() -> Self {
        Self::none().with_linearize(MapSlot::Albedo, true)
    }
}

/// Surface description bound before each mesh draw
///
/// A clone gets a fresh [`MaterialId`], so the texture cache tracks the copy
/// as a separate consumer.
#[derive(Debug, PartialEq)]
pub struct Material {
    id: MaterialId,
    shading_model: ShadingModel,
    maps: [MaterialMap; 6],
    ambient_coefficient: f32,
}

impl Clone for Material {
    fn clone(&self) -> Self {
        Self {
            id: MaterialId::next(),
            shading_model: self.shading_model,
            maps: self.maps,
            ambient_coefficient: self.ambient_coefficient,
        }
    }
}

impl Material {
    /// Create a material with default constants and no textures
    pub fn new(shading_model: ShadingModel) -> Self {
        Self {
            id: MaterialId::next(),
            shading_model,
            maps: MapSlot::ALL.map(|slot| MaterialMap {
                texture: None,
                value: slot.default_value(),
            }),
            ambient_coefficient: DEFAULT_AMBIENT_COEFFICIENT,
        }
    }

    /// Create a material and wrap it for sharing
    pub fn shared(shading_model: ShadingModel) -> MaterialRef {
        Rc::new(RefCell::new(Self::new(shading_model)))
    }

    /// Wrap this material for sharing
    pub fn into_shared(self) -> MaterialRef {
        Rc::new(RefCell::new(self))
    }

    /// Unique identity
    pub fn id(&self) -> MaterialId {
        self.id
    }

    /// Shading model
    pub fn shading_model(&self) -> ShadingModel {
        self.shading_model
    }

    /// Change the shading model
    pub fn set_shading_model(&mut self, shading_model: ShadingModel) {
        self.shading_model = shading_model;
    }

    /// Ambient lighting coefficient
    pub fn ambient_coefficient(&self) -> f32 {
        self.ambient_coefficient
    }

    /// Set the ambient lighting coefficient
    pub fn set_ambient_coefficient(&mut self, coefficient: f32) {
        self.ambient_coefficient = coefficient;
    }

    /// Slot contents
    pub fn map(&self, slot: MapSlot) -> &MaterialMap {
        &self.maps[slot.index()]
    }

    /// Texture in `slot`, if any
    pub fn texture(&self, slot: MapSlot) -> Option<TextureHandle> {
        self.maps[slot.index()].texture
    }

    /// Put a texture into `slot`
    ///
    /// Does not register the material with the texture cache; use
    /// [`TextureCache::assign`](super::TextureCache::assign) for textures the
    /// cache may free.
    pub fn set_texture(&mut self, slot: MapSlot, texture: Option<TextureHandle>) {
        self.maps[slot.index()].texture = texture;
    }

    /// Set the constant of `slot`
    pub fn set_value(&mut self, slot: MapSlot, value: Vec3) {
        self.maps[slot.index()].value = value;
    }

    /// Set the constant of a scalar slot
    pub fn set_scalar(&mut self, slot: MapSlot, value: f32) {
        self.maps[slot.index()].value = Vec3::new(value, 0.0, 0.0);
    }

    /// Reset every slot holding `texture` to its constant
    ///
    /// Returns the number of slots cleared.
    pub fn remove_texture(&mut self, texture: TextureHandle) -> usize {
        let mut cleared = 0;
        for map in &mut self.maps {
            if map.texture == Some(texture) {
                map.texture = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Write the material into the program's uniform state and bind its textures
    pub fn use_material(&self, program: &ShaderProgram) {
        program.set(uniforms::SHADING_MODEL, i32::from(self.shading_model.index()));
        program.set(uniforms::AMBIENT_COEFFICIENT, self.ambient_coefficient);

        for slot in MapSlot::ALL {
            let map = &self.maps[slot.index()];
            let prefix = slot.uniform_name();
            program.set(&format!("{prefix}.enabled"), map.texture.is_some());
            match map.texture {
                Some(texture) => {
                    program.device().bind_texture(slot.texture_unit(), texture);
                    program.set(&format!("{prefix}.texture"), UniformValue::Sampler(slot.texture_unit()));
                }
                None if slot.is_scalar() => program.set(&format!("{prefix}.value"), map.value.x),
                None => program.set(&format!("{prefix}.value"), map.value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::GpuDevice;
    use crate::render::backends::headless::{Command, HeadlessBackend};
    use std::collections::HashSet;

    #[test]
    fn test_shading_model_indices() {
        for model in [ShadingModel::BlinnPhong, ShadingModel::CookTorrance, ShadingModel::AshikhminShirley] {
            assert_eq!(ShadingModel::try_from(model.index()).unwrap(), model);
        }
        assert!(matches!(ShadingModel::try_from(3), Err(RenderError::InvalidShaderType(3))));
    }

    #[test]
    fn test_texture_units_do_not_collide() {
        let units: HashSet<u32> = MapSlot::ALL.iter().map(|slot| slot.texture_unit()).collect();
        assert_eq!(units.len(), MapSlot::ALL.len());
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let mut material = Material::new(ShadingModel::CookTorrance);
        material.set_texture(MapSlot::Normal, Some(TextureHandle(3)));
        let copy = material.clone();
        assert_ne!(copy.id(), material.id());
        assert_eq!(copy.shading_model(), ShadingModel::CookTorrance);
        assert_eq!(copy.texture(MapSlot::Normal), Some(TextureHandle(3)));
    }

    #[test]
    fn test_remove_texture_clears_every_matching_slot() {
        let mut material = Material::new(ShadingModel::CookTorrance);
        let shared = TextureHandle(7);
        material.set_texture(MapSlot::Albedo, Some(shared));
        material.set_texture(MapSlot::AmbientOcclusion, Some(shared));
        material.set_texture(MapSlot::Normal, Some(TextureHandle(8)));

        assert_eq!(material.remove_texture(shared), 2);
        assert_eq!(material.texture(MapSlot::Albedo), None);
        assert_eq!(material.texture(MapSlot::AmbientOcclusion), None);
        assert_eq!(material.texture(MapSlot::Normal), Some(TextureHandle(8)));
    }

    #[test]
    fn test_defaults() {
        let material = Material::new(ShadingModel::BlinnPhong);
        assert_eq!(material.map(MapSlot::Albedo).value, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(material.map(MapSlot::Roughness).value.x, 0.5);
        assert_eq!(material.map(MapSlot::AmbientOcclusion).value.x, 1.0);
        assert_eq!(material.map(MapSlot::Specular).value, Vec3::zeros());
        assert_eq!(material.ambient_coefficient(), DEFAULT_AMBIENT_COEFFICIENT);
        assert_ne!(material.id(), Material::new(ShadingModel::BlinnPhong).id());
    }

    #[test]
    fn test_use_material_uploads_texture_or_constant() {
        let backend = std::rc::Rc::new(HeadlessBackend::new());
        let device: GpuDevice = backend.clone();
        let program = ShaderProgram::from_sources(&device, "void main() {}", "void main() {}").unwrap();

        let mut material = Material::new(ShadingModel::CookTorrance);
        material.set_texture(MapSlot::Normal, Some(TextureHandle(42)));
        material.set_scalar(MapSlot::Roughness, 0.25);
        material.use_material(&program);

        let handle = program.handle();
        assert_eq!(backend.uniform(handle, "shading_model"), Some(UniformValue::Int(1)));
        assert_eq!(backend.uniform(handle, "normal_map.enabled"), Some(UniformValue::Bool(true)));
        assert_eq!(backend.uniform(handle, "normal_map.texture"), Some(UniformValue::Sampler(3)));
        assert_eq!(backend.uniform(handle, "normal_map.value"), None);
        assert_eq!(backend.uniform(handle, "roughness_map.enabled"), Some(UniformValue::Bool(false)));
        assert_eq!(backend.uniform(handle, "roughness_map.value"), Some(UniformValue::Float(0.25)));
        assert_eq!(
            backend.uniform(handle, "albedo_map.value"),
            Some(UniformValue::Vec3([1.0, 1.0, 1.0]))
        );
        assert_eq!(backend.count_commands(|c| *c == Command::BindTexture(3, TextureHandle(42))), 1);
    }

    #[test]
    fn test_import_options_default_to_albedo_only() {
        let options = TextureImportOptions::default();
        assert!(options.linearize(MapSlot::Albedo));
        assert!(!options.linearize(MapSlot::Normal));
        assert!(!options.linearize(MapSlot::Specular));
    }
}
