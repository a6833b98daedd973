//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the engine plus the projection
//! and view helpers for OpenGL clip space (depth in [-1, 1]).

use nalgebra::{Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector, used for texture coordinates
pub type Vec2 = Vector2<f32>;

/// 3D vector
pub type Vec3 = Vector3<f32>;

/// 4D vector
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix, column-major like GLSL
pub type Mat4 = Matrix4<f32>;

/// Point in 3D space
pub type Point3 = nalgebra::Point3<f32>;

/// Unit quaternion for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Extension trait for Mat4 with the transforms the pipeline needs
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix for OpenGL clip space
    ///
    /// `fov_y` is in radians.
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Flatten into column-major order, the layout uniform uploads expect
    fn to_column_array(&self) -> [f32; 16];
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -(2.0 * far * near) / (far - near);
        result[(3, 2)] = -1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn to_column_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_planes() {
        let near = 0.1;
        let far = 1000.0;
        let projection = Mat4::perspective(45.0_f32.to_radians(), 16.0 / 9.0, near, far);

        let near_point = projection * Vec4::new(0.0, 0.0, -near, 1.0);
        let far_point = projection * Vec4::new(0.0, 0.0, -far, 1.0);

        assert_relative_eq!(near_point.z / near_point.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far_point.z / far_point.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let view = Mat4::look_at(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let target = view.transform_point(&Point3::origin());
        assert_relative_eq!(target, Point3::new(0.0, 0.0, -3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_column_array_is_column_major() {
        let translation = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let flat = translation.to_column_array();
        assert_eq!(&flat[12..15], &[1.0, 2.0, 3.0]);
    }
}
