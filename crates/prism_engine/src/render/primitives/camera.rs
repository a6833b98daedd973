//! # 3D Camera
//!
//! A look-at camera: position, target and up vector. The camera only produces
//! the view transform; the projection belongs to the renderer, which knows the
//! viewport size and field of view.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Look-at camera in a right-handed, Y-up world
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,
}

impl Camera {
    /// Create a camera from position, target and up vector
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self { position, target, up }
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Aim the camera at a new point
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Move position and target together by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.target += offset;
    }

    /// World-to-view transform
    pub fn view_transform(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Right vector of the view transform (its first row)
    pub fn right_vector(&self) -> Vec3 {
        self.view_row(0)
    }

    /// Actual up vector of the view transform (its second row)
    ///
    /// Differs from [`Camera::up`] unless the view direction is perpendicular to it.
    pub fn up_vector(&self) -> Vec3 {
        self.view_row(1)
    }

    /// Backward-facing axis of the view transform (its third row)
    ///
    /// Points from the target towards the camera.
    pub fn forward_vector(&self) -> Vec3 {
        self.view_row(2)
    }

    fn view_row(&self, row: usize) -> Vec3 {
        let view = self.view_transform();
        Vec3::new(view[(row, 0)], view[(row, 1)], view[(row, 2)])
    }
}

impl Default for Camera {
    /// Three units in front of the origin, looking at it, Y up
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0), Vec3::zeros(), Vec3::y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_camera_axes() {
        let camera = Camera::default();
        assert_relative_eq!(camera.right_vector(), Vec3::x(), epsilon = 1e-6);
        assert_relative_eq!(camera.up_vector(), Vec3::y(), epsilon = 1e-6);
        assert_relative_eq!(camera.forward_vector(), Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_translate_keeps_view_direction() {
        let mut camera = Camera::default();
        let before = camera.forward_vector();
        camera.translate(Vec3::new(2.0, -1.0, 0.5));
        assert_relative_eq!(camera.forward_vector(), before, epsilon = 1e-6);
        assert_relative_eq!(camera.target, Vec3::new(2.0, -1.0, 0.5), epsilon = 1e-6);
    }
}
