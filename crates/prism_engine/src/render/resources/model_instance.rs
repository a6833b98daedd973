//! Placed copies of a shared model

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::render::constants::uniforms;
use crate::render::resources::gpu::ShaderProgram;
use crate::render::resources::{Mappable, Model};
use crate::render::{RenderError, RenderResult};

/// Model shared between instances
pub type ModelRef = Rc<RefCell<Model>>;

/// A model placed in the world
///
/// The transforms are derived from position, rotation and scale but are only
/// recomputed by [`ModelInstance::update`]; changing a field and drawing
/// without updating draws with the old transforms.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    model: ModelRef,
    /// World position
    pub position: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Flat color replacing the material albedo, if set
    pub override_color: Option<Color>,
    model_transform: Mat4,
    normal_transform: Mat4,
}

impl ModelInstance {
    /// Place `model` at the origin with unit scale and no rotation
    pub fn new(model: ModelRef) -> Self {
        let mut instance = Self {
            model,
            position: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Quat::identity(),
            override_color: None,
            model_transform: Mat4::identity(),
            normal_transform: Mat4::identity(),
        };
        instance.update();
        instance
    }

    /// The referenced model
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Object-to-world transform as of the last update
    pub fn model_transform(&self) -> &Mat4 {
        &self.model_transform
    }

    /// Inverse-transpose of the model transform as of the last update
    pub fn normal_transform(&self) -> &Mat4 {
        &self.normal_transform
    }

    /// Recompute the transforms from position, rotation and scale
    ///
    /// The model transform is translate * rotate * scale. If it cannot be
    /// inverted (a zero scale component) the normal transform falls back to
    /// the identity.
    pub fn update(&mut self) {
        self.model_transform = Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale);
        self.normal_transform = match self.model_transform.try_inverse() {
            Some(inverse) => inverse.transpose(),
            None => {
                log::warn!("Model transform with scale {:?} is singular; using identity normals", self.scale);
                Mat4::identity()
            }
        };
    }

    /// Upload the instance state and draw every mesh of the model
    ///
    /// Fails with [`RenderError::BuffersNotYetMapped`] if the model is not
    /// mapped; nothing is drawn in that case.
    pub fn draw(&self, program: &ShaderProgram) -> RenderResult<()> {
        let model = self.model.borrow();
        if !model.is_mapped() {
            return Err(RenderError::BuffersNotYetMapped);
        }
        program.set(uniforms::MODEL_TRANSFORM, &self.model_transform);
        program.set(uniforms::NORMAL_TRANSFORM, &self.normal_transform);
        program.set(uniforms::OVERRIDE_COLOR_ENABLED, self.override_color.is_some());
        if let Some(color) = self.override_color {
            program.set(uniforms::OVERRIDE_COLOR_VALUE, color);
        }
        model.draw(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Point3};
    use crate::render::api::{GpuDevice, UniformValue};
    use crate::render::backends::headless::{Command, HeadlessBackend};
    use crate::render::primitives::mesh::{Mesh, Vertex};
    use crate::render::resources::materials::{Material, ShadingModel};
    use approx::assert_relative_eq;

    fn model() -> ModelRef {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let mesh = Mesh::new(vertices, vec![0, 1, 2], Material::shared(ShadingModel::BlinnPhong)).unwrap();
        Rc::new(RefCell::new(Model::new(vec![mesh])))
    }

    #[test]
    fn test_transform_is_translate_rotate_scale() {
        let mut instance = ModelInstance::new(model());
        instance.position = Vec3::new(1.0, 2.0, 3.0);
        instance.scale = Vec3::new(2.0, 2.0, 2.0);
        instance.rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        instance.update();

        // x axis: scaled to 2, rotated onto +y, then translated
        let moved = instance.model_transform().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(1.0, 4.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn test_scaled_instance_keeps_origin_at_position() {
        let mut instance = ModelInstance::new(model());
        instance.position = Vec3::new(1.0, 0.0, 0.0);
        instance.scale = Vec3::new(2.0, 2.0, 2.0);
        instance.update();

        let origin = instance.model_transform().transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        let expected = instance.model_transform().try_inverse().unwrap().transpose();
        assert_relative_eq!(*instance.normal_transform(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_transforms_only_change_on_update() {
        let mut instance = ModelInstance::new(model());
        instance.position = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(*instance.model_transform(), Mat4::identity());

        instance.update();
        assert_relative_eq!(instance.model_transform()[(0, 3)], 5.0);
    }

    #[test]
    fn test_normal_transform_is_inverse_transpose() {
        let mut instance = ModelInstance::new(model());
        instance.scale = Vec3::new(1.0, 4.0, 1.0);
        instance.update();

        let expected = instance.model_transform().try_inverse().unwrap().transpose();
        assert_relative_eq!(*instance.normal_transform(), expected, epsilon = 1e-6);
        assert_relative_eq!(instance.normal_transform()[(1, 1)], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_scale_falls_back_to_identity_normals() {
        let mut instance = ModelInstance::new(model());
        instance.scale = Vec3::new(0.0, 1.0, 1.0);
        instance.update();
        assert_eq!(*instance.normal_transform(), Mat4::identity());
    }

    #[test]
    fn test_draw_uploads_instance_uniforms() {
        let backend = Rc::new(HeadlessBackend::new());
        let device: GpuDevice = backend.clone();
        let program = ShaderProgram::from_sources(&device, "void main() {}", "void main() {}").unwrap();

        let shared = model();
        let mut instance = ModelInstance::new(shared.clone());
        assert!(matches!(instance.draw(&program), Err(RenderError::BuffersNotYetMapped)));
        assert_eq!(backend.count_commands(|c| matches!(c, Command::DrawIndexed(_))), 0);

        shared.borrow_mut().map(&device).unwrap();
        instance.override_color = Some(Color::rgb(1.0, 0.0, 0.0));
        instance.draw(&program).unwrap();

        let handle = program.handle();
        assert_eq!(
            backend.uniform(handle, "model_transform"),
            Some(UniformValue::Mat4(Mat4::identity().to_column_array()))
        );
        assert_eq!(backend.uniform(handle, "override_color.enabled"), Some(UniformValue::Bool(true)));
        assert_eq!(
            backend.uniform(handle, "override_color.value"),
            Some(UniformValue::Vec4([1.0, 0.0, 0.0, 1.0]))
        );
        assert_eq!(backend.count_commands(|c| *c == Command::DrawIndexed(3)), 1);
    }

    #[test]
    fn test_instances_share_one_model() {
        let shared = model();
        let first = ModelInstance::new(shared.clone());
        let second = ModelInstance::new(shared.clone());
        assert!(Rc::ptr_eq(first.model(), second.model()));
        assert_eq!(Rc::strong_count(&shared), 3);
    }
}
