//! Frame pipeline tests against the recording backend

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use approx::assert_relative_eq;

use super::renderer::{perspective_projection, FrameState, Renderer};
use crate::assets::image_loader::ImageData;
use crate::core::config::{RendererConfig, ShaderConfig, ShaderPair};
use crate::foundation::math::Vec3;
use crate::render::api::{GpuDevice, TextureFilter, TextureFormat, UniformValue};
use crate::render::backends::headless::{Command, HeadlessBackend, HeadlessSurface};
use crate::render::constants::{ENVIRONMENT_TEXTURE_UNIT, MAX_POINT_LIGHTS};
use crate::render::primitives::camera::Camera;
use crate::render::primitives::mesh::{Mesh, Vertex};
use crate::render::resources::materials::{Material, ShadingModel};
use crate::render::resources::{Environment, Mappable, Model, ModelInstance};
use crate::render::systems::lighting::PointLight;
use crate::render::RenderError;

fn shader_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../resources/shaders")
}

fn config() -> RendererConfig {
    RendererConfig::default().with_shaders(ShaderConfig::in_directory(shader_dir()))
}

fn setup() -> (Rc<HeadlessBackend>, GpuDevice, Renderer, HeadlessSurface) {
    let backend = Rc::new(HeadlessBackend::new());
    let device: GpuDevice = backend.clone();
    let renderer = Renderer::new(&device, 800, 600, config()).unwrap();
    backend.clear_commands();
    (backend, device, renderer, HeadlessSurface::new(800, 600))
}

fn instance(device: &GpuDevice, mapped: bool) -> ModelInstance {
    let vertices = vec![
        Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
        Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
    ];
    let mesh = Mesh::new(vertices, vec![0, 1, 2], Material::shared(ShadingModel::CookTorrance)).unwrap();
    let mut model = Model::new(vec![mesh]);
    if mapped {
        model.map(device).unwrap();
    }
    ModelInstance::new(Rc::new(RefCell::new(model)))
}

fn environment(device: &GpuDevice) -> Environment {
    let pixels = [1.0f32; 4 * 2 * 3];
    let image = ImageData {
        data: bytemuck::cast_slice(&pixels).to_vec(),
        width: 4,
        height: 2,
        format: TextureFormat::Rgb32F,
    };
    Environment::from_image(device, &image, 2.0).unwrap()
}

fn position_of(commands: &[Command], wanted: &Command) -> usize {
    commands
        .iter()
        .position(|command| command == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} was not recorded"))
}

#[test]
fn test_render_model_before_prepare_is_rejected() {
    let (backend, device, mut renderer, _surface) = setup();
    let instance = instance(&device, true);

    let result = renderer.render_model(&instance, None);
    assert!(matches!(
        result,
        Err(RenderError::InvalidFrameState { state: FrameState::Idle, .. })
    ));
    assert_eq!(renderer.state(), FrameState::Idle);
    assert_eq!(backend.count_commands(|c| matches!(c, Command::DrawIndexed(_))), 0);
}

#[test]
fn test_finish_twice_is_rejected() {
    let (_backend, _device, mut renderer, mut surface) = setup();
    renderer.prepare_render(&Camera::default(), None).unwrap();
    renderer.finish_render(&mut surface).unwrap();

    assert!(matches!(
        renderer.finish_render(&mut surface),
        Err(RenderError::InvalidFrameState { state: FrameState::Idle, .. })
    ));
    assert_eq!(surface.present_count(), 1);
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_prepare_twice_is_rejected() {
    let (_backend, _device, mut renderer, _surface) = setup();
    renderer.prepare_render(&Camera::default(), None).unwrap();
    assert!(matches!(
        renderer.prepare_render(&Camera::default(), None),
        Err(RenderError::InvalidFrameState { state: FrameState::Recording, .. })
    ));
    assert_eq!(renderer.state(), FrameState::Recording);
}

#[test]
fn test_frame_runs_geometry_then_resolve_then_tonemap() {
    let (backend, device, mut renderer, mut surface) = setup();
    let instance = instance(&device, true);

    renderer.prepare_render(&Camera::default(), None).unwrap();
    renderer.render_model(&instance, None).unwrap();
    renderer.render_model(&instance, None).unwrap();
    renderer.finish_render(&mut surface).unwrap();

    let commands = backend.commands();
    let targets: Vec<&Command> = commands
        .iter()
        .filter(|c| matches!(c, Command::BindRenderTarget(_) | Command::ResolveRenderTarget(_)))
        .collect();
    assert_eq!(targets.len(), 3);
    assert!(matches!(targets[0], Command::BindRenderTarget(Some(_))));
    assert!(matches!(targets[1], Command::ResolveRenderTarget(_)));
    assert_eq!(*targets[2], Command::BindRenderTarget(None));

    let first_draw = position_of(&commands, &Command::DrawIndexed(3));
    let resolve = commands
        .iter()
        .position(|c| matches!(c, Command::ResolveRenderTarget(_)))
        .unwrap();
    let tonemap = position_of(&commands, &Command::DrawFullscreen);
    assert!(first_draw < resolve && resolve < tonemap);
    assert_eq!(backend.count_commands(|c| *c == Command::DrawIndexed(3)), 2);
    assert_eq!(backend.count_commands(|c| *c == Command::DrawFullscreen), 1);

    assert_eq!(renderer.state(), FrameState::Idle);
    assert_eq!(surface.present_count(), 1);
}

#[test]
fn test_per_frame_uniforms_are_uploaded() {
    let (backend, _device, mut renderer, _surface) = setup();
    let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), Vec3::y());
    renderer.prepare_render(&camera, None).unwrap();

    let handle = renderer.main_program().handle();
    assert_eq!(backend.uniform(handle, "camera_position"), Some(UniformValue::Vec3([1.0, 2.0, 3.0])));
    assert!(matches!(backend.uniform(handle, "view_transform"), Some(UniformValue::Mat4(_))));
    assert!(matches!(backend.uniform(handle, "projection_transform"), Some(UniformValue::Mat4(_))));
}

#[test]
fn test_tonemap_samples_hdr_buffer_and_dither_matrix() {
    let (backend, _device, mut renderer, mut surface) = setup();
    renderer.prepare_render(&Camera::default(), None).unwrap();
    renderer.finish_render(&mut surface).unwrap();

    let dither = backend
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::BindTexture(1, texture) => Some(*texture),
            _ => None,
        })
        .unwrap();
    let descriptor = backend.texture_descriptor(dither).unwrap();
    assert_eq!(descriptor.format, TextureFormat::R8);
    assert_eq!((descriptor.width, descriptor.height), (8, 8));
    assert_eq!(descriptor.filter, TextureFilter::Nearest);
    assert_eq!(backend.count_commands(|c| matches!(c, Command::BindTexture(0, _))), 1);
}

#[test]
fn test_environment_draws_skybox_and_binds_for_models() {
    let (backend, device, mut renderer, mut surface) = setup();
    let environment = environment(&device);
    let instance = instance(&device, true);

    renderer.prepare_render(&Camera::default(), Some(&environment)).unwrap();
    renderer.render_model(&instance, Some(&environment)).unwrap();
    renderer.finish_render(&mut surface).unwrap();

    let commands = backend.commands();
    let skybox = position_of(&commands, &Command::DrawFullscreen);
    let model = position_of(&commands, &Command::DrawIndexed(3));
    assert!(skybox < model);
    assert!(position_of(&commands, &Command::SetDepthWrite(false)) < skybox);
    assert_eq!(backend.count_commands(|c| *c == Command::DrawFullscreen), 2);
    assert_eq!(
        backend.count_commands(|c| *c == Command::BindTexture(ENVIRONMENT_TEXTURE_UNIT, environment.texture())),
        2
    );

    let handle = renderer.main_program().handle();
    assert_eq!(backend.uniform(handle, "environment.enabled"), Some(UniformValue::Bool(true)));
    assert_eq!(
        backend.uniform(handle, "environment.texture"),
        Some(UniformValue::Sampler(ENVIRONMENT_TEXTURE_UNIT))
    );
}

#[test]
fn test_unmapped_instance_fails_without_leaving_the_frame() {
    let (_backend, device, mut renderer, mut surface) = setup();
    let unmapped = instance(&device, false);

    renderer.prepare_render(&Camera::default(), None).unwrap();
    assert!(matches!(
        renderer.render_model(&unmapped, None),
        Err(RenderError::BuffersNotYetMapped)
    ));
    assert_eq!(renderer.state(), FrameState::Recording);
    renderer.finish_render(&mut surface).unwrap();
}

#[test]
fn test_viewport_changes_are_rejected_while_recording() {
    let (backend, _device, mut renderer, mut surface) = setup();
    let before = *renderer.projection_transform();

    renderer.prepare_render(&Camera::default(), None).unwrap();
    assert!(matches!(
        renderer.update_dimensions(1024, 768),
        Err(RenderError::InvalidFrameState { .. })
    ));
    assert!(matches!(
        renderer.update_field_of_view(60.0),
        Err(RenderError::InvalidFrameState { .. })
    ));
    assert_eq!(*renderer.projection_transform(), before);
    assert_eq!(renderer.dimensions(), (800, 600));

    renderer.finish_render(&mut surface).unwrap();
    renderer.update_dimensions(1024, 512).unwrap();
    assert_eq!(renderer.dimensions(), (1024, 512));
    assert_eq!(
        backend.count_commands(|c| matches!(c, Command::CreateRenderTarget(_, 1024, 512, 4))),
        1
    );
    assert_relative_eq!(
        *renderer.projection_transform(),
        perspective_projection(1024, 512, 45.0, 0.1, 1000.0),
        epsilon = 1e-6
    );
}

#[test]
fn test_projection_is_a_function_of_size_and_fov() {
    let (_backend, _device, mut renderer, _surface) = setup();
    assert_relative_eq!(
        *renderer.projection_transform(),
        perspective_projection(800, 600, 45.0, 0.1, 1000.0),
        epsilon = 1e-6
    );

    renderer.update_field_of_view(90.0).unwrap();
    assert_relative_eq!(renderer.projection_transform()[(1, 1)], 1.0, epsilon = 1e-6);

    renderer.update_field_of_view(45.0).unwrap();
    assert_relative_eq!(
        *renderer.projection_transform(),
        perspective_projection(800, 600, 45.0, 0.1, 1000.0),
        epsilon = 1e-6
    );
}

#[test]
fn test_zero_size_resize_is_ignored() {
    let (_backend, _device, mut renderer, _surface) = setup();
    renderer.update_dimensions(0, 0).unwrap();
    assert_eq!(renderer.dimensions(), (800, 600));
}

#[test]
fn test_missing_shader_cannot_initialize() {
    let device: GpuDevice = Rc::new(HeadlessBackend::new());
    let mut shaders = ShaderConfig::in_directory(shader_dir());
    shaders.skybox = ShaderPair::new(shader_dir().join("skybox.vert"), shader_dir().join("missing.frag"));
    let result = Renderer::new(&device, 800, 600, RendererConfig::default().with_shaders(shaders));
    assert!(matches!(result, Err(RenderError::CannotInitialize(_))));
}

#[test]
fn test_invalid_config_cannot_initialize() {
    let device: GpuDevice = Rc::new(HeadlessBackend::new());
    let result = Renderer::new(&device, 800, 600, config().with_msaa_samples(0));
    assert!(matches!(result, Err(RenderError::CannotInitialize(_))));
}

#[test]
fn test_lights_start_disabled_and_fill_up() {
    let (backend, _device, mut renderer, _surface) = setup();
    let handle = renderer.main_program().handle();
    for index in 0..MAX_POINT_LIGHTS {
        let name = format!("point_lights[{index}].enabled");
        assert_eq!(backend.uniform(handle, &name), Some(UniformValue::Bool(false)));
    }
    assert_eq!(backend.uniform(handle, "directional_light.enabled"), Some(UniformValue::Bool(false)));

    let lights: Vec<PointLight> = (0..=MAX_POINT_LIGHTS)
        .map(|i| PointLight::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 1.0, 0.0, 0.0))
        .collect();
    for light in &lights[..MAX_POINT_LIGHTS] {
        renderer.add_point_light(light).unwrap();
    }
    assert!(matches!(
        renderer.add_point_light(&lights[MAX_POINT_LIGHTS]),
        Err(RenderError::TooManyLights)
    ));

    renderer.remove_point_light(&lights[1]).unwrap();
    assert_eq!(renderer.add_point_light(&lights[MAX_POINT_LIGHTS]).unwrap(), 1);
}
