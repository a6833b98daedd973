//! Point light slot allocation
//!
//! The main shader has a fixed array of [`MAX_POINT_LIGHTS`] point light
//! slots. The registry hands slots out to lights and keeps each slot's
//! uniforms in sync with the light occupying it.

use std::collections::HashMap;

use crate::render::constants::{uniforms, MAX_POINT_LIGHTS};
use crate::render::resources::gpu::ShaderProgram;
use crate::render::{RenderError, RenderResult};

use super::lights::{DirectionalLight, LightId, PointLight};

/// Fixed-size table mapping point lights to shader slots
#[derive(Debug, Default)]
pub struct PointLightRegistry {
    slots: [Option<LightId>; MAX_POINT_LIGHTS],
    indices: HashMap<LightId, usize>,
}

impl PointLightRegistry {
    /// Create a registry with every slot free
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `light` into the first free slot and upload it
    ///
    /// Fails with [`RenderError::InvalidLight`] if the light is already
    /// registered and [`RenderError::TooManyLights`] if every slot is taken.
    pub fn add(&mut self, light: &PointLight, program: &ShaderProgram) -> RenderResult<usize> {
        if self.indices.contains_key(&light.id()) {
            return Err(RenderError::InvalidLight);
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RenderError::TooManyLights)?;

        self.slots[index] = Some(light.id());
        self.indices.insert(light.id(), index);
        Self::upload(index, light, program);
        log::debug!("Point light {:?} assigned to slot {}", light.id(), index);
        Ok(index)
    }

    /// Free the slot of `light` and disable it in the shader
    ///
    /// Fails with [`RenderError::InvalidLight`] if the light is not registered.
    pub fn remove(&mut self, light: &PointLight, program: &ShaderProgram) -> RenderResult<()> {
        let index = self.indices.remove(&light.id()).ok_or(RenderError::InvalidLight)?;
        self.slots[index] = None;
        program.set(&uniforms::point_light(index, "enabled"), false);
        log::debug!("Point light {:?} released slot {}", light.id(), index);
        Ok(())
    }

    /// Re-upload every field of `light` after it was changed
    ///
    /// Fails with [`RenderError::InvalidLight`] if the light is not registered.
    pub fn update(&self, light: &PointLight, program: &ShaderProgram) -> RenderResult<()> {
        let index = *self.indices.get(&light.id()).ok_or(RenderError::InvalidLight)?;
        Self::upload(index, light, program);
        Ok(())
    }

    /// Slot occupied by `light`
    pub fn slot_of(&self, light: &PointLight) -> Option<usize> {
        self.indices.get(&light.id()).copied()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether every slot is free
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn upload(index: usize, light: &PointLight, program: &ShaderProgram) {
        let field = |name: &str| uniforms::point_light(index, name);
        program.set(&field("enabled"), true);
        program.set(&field("position"), light.position);
        program.set(&field("irradiance"), light.irradiance);
        program.set(&field("constant_attenuation"), light.constant_attenuation);
        program.set(&field("linear_attenuation"), light.linear_attenuation);
        program.set(&field("quadratic_attenuation"), light.quadratic_attenuation);
    }
}

/// Enable the directional light, replacing any previous one
pub fn set_directional_light(light: &DirectionalLight, program: &ShaderProgram) {
    let direction = light.direction.try_normalize(f32::EPSILON).unwrap_or_else(|| {
        log::warn!("Directional light has zero direction; pointing it down");
        -crate::foundation::math::Vec3::y()
    });
    program.set(uniforms::DIRECTIONAL_ENABLED, true);
    program.set(uniforms::DIRECTIONAL_DIRECTION, direction);
    program.set(uniforms::DIRECTIONAL_IRRADIANCE, light.irradiance);
}

/// Disable the directional light
pub fn unset_directional_light(program: &ShaderProgram) {
    program.set(uniforms::DIRECTIONAL_ENABLED, false);
}
