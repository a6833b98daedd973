//! Light types
//!
//! Two kinds of light share nothing but an irradiance: a directional light
//! (the sun) and attenuated point lights.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Anything that emits light
pub trait Light {
    /// Emitted irradiance per color channel
    fn irradiance(&self) -> Vec3;
}

/// Identity of a point light, unique for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(u64);

impl LightId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Light arriving from one direction everywhere in the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in; normalized on upload
    pub direction: Vec3,
    /// Irradiance
    pub irradiance: Vec3,
}

impl DirectionalLight {
    /// Create a directional light
    pub fn new(direction: Vec3, irradiance: Vec3) -> Self {
        Self { direction, irradiance }
    }
}

impl Light for DirectionalLight {
    fn irradiance(&self) -> Vec3 {
        self.irradiance
    }
}

/// Point light with constant, linear and quadratic attenuation
///
/// Each light has its own [`LightId`]; the registry tracks lights by it, so
/// the type is deliberately not `Clone`. Use [`PointLight::duplicate`] for a
/// new light with the same parameters.
#[derive(Debug, PartialEq)]
pub struct PointLight {
    id: LightId,
    /// World position
    pub position: Vec3,
    /// Irradiance
    pub irradiance: Vec3,
    /// Constant attenuation term
    pub constant_attenuation: f32,
    /// Linear attenuation term
    pub linear_attenuation: f32,
    /// Quadratic attenuation term
    pub quadratic_attenuation: f32,
}

impl PointLight {
    /// Create a point light with a fresh identity
    pub fn new(
        position: Vec3,
        irradiance: Vec3,
        constant_attenuation: f32,
        linear_attenuation: f32,
        quadratic_attenuation: f32,
    ) -> Self {
        Self {
            id: LightId::next(),
            position,
            irradiance,
            constant_attenuation,
            linear_attenuation,
            quadratic_attenuation,
        }
    }

    /// Identity used by the registry
    pub fn id(&self) -> LightId {
        self.id
    }

    /// A new light with the same parameters and a fresh identity
    pub fn duplicate(&self) -> Self {
        Self::new(
            self.position,
            self.irradiance,
            self.constant_attenuation,
            self.linear_attenuation,
            self.quadratic_attenuation,
        )
    }

    /// Attenuation factor at `distance`
    pub fn attenuation(&self, distance: f32) -> f32 {
        let denominator = self.constant_attenuation
            + self.linear_attenuation * distance
            + self.quadratic_attenuation * distance * distance;
        if denominator > 0.0 {
            1.0 / denominator
        } else {
            0.0
        }
    }
}

impl Light for PointLight {
    fn irradiance(&self) -> Vec3 {
        self.irradiance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_lights_get_distinct_ids() {
        let light = PointLight::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0, 0.0, 0.0);
        let copy = light.duplicate();
        assert_ne!(light.id(), copy.id());
        assert_eq!(light.position, copy.position);
    }

    #[test]
    fn test_attenuation() {
        let light = PointLight::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0), 1.0, 0.5, 0.25);
        assert_relative_eq!(light.attenuation(0.0), 1.0);
        assert_relative_eq!(light.attenuation(2.0), 1.0 / 3.0);
    }

    #[test]
    fn test_light_trait_objects() {
        let lights: Vec<Box<dyn Light>> = vec![
            Box::new(DirectionalLight::new(-Vec3::y(), Vec3::new(0.5, 0.5, 0.5))),
            Box::new(PointLight::new(Vec3::zeros(), Vec3::new(2.0, 0.0, 0.0), 1.0, 0.0, 0.0)),
        ];
        let total: Vec3 = lights.iter().map(|light| light.irradiance()).sum();
        assert_relative_eq!(total, Vec3::new(2.5, 0.5, 0.5));
    }
}
