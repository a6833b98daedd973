//! # Frame Renderer
//!
//! Drives the fixed pipeline: the geometry pass draws into a multisampled HDR
//! target, which is resolved and tone mapped onto the default framebuffer.
//!
//! ```text
//! Idle --prepare_render--> Recording --render_model*--> Recording --finish_render--> Idle
//! ```
//!
//! Calls made in the wrong state fail with [`RenderError::InvalidFrameState`]
//! and change nothing.

use crate::core::config::RendererConfig;
use crate::foundation::color::Color;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::api::{ClearFlags, GpuDevice, TextureDescriptor, TextureFilter, TextureFormat, TextureWrap, UniformValue};
use crate::render::constants::{
    uniforms, DITHER_PATTERN, DITHER_SIZE, DITHER_TEXTURE_UNIT, ENVIRONMENT_TEXTURE_UNIT, HDR_TEXTURE_UNIT,
    MAX_POINT_LIGHTS,
};
use crate::render::primitives::camera::Camera;
use crate::render::resources::gpu::{GpuTexture, RenderTarget, ShaderProgram};
use crate::render::resources::{Environment, ModelInstance};
use crate::render::systems::lighting::{
    set_directional_light, unset_directional_light, DirectionalLight, PointLight, PointLightRegistry,
};
use crate::render::window::Surface;
use crate::render::{RenderError, RenderResult};

/// Where the renderer is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Between frames
    Idle,
    /// After `prepare_render`, before `finish_render`
    Recording,
}

/// Perspective projection for a viewport
///
/// A pure function of its inputs; `field_of_view` is the vertical angle in
/// degrees.
pub fn perspective_projection(width: u32, height: u32, field_of_view: f32, near: f32, far: f32) -> Mat4 {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    Mat4::perspective(field_of_view.to_radians(), aspect, near, far)
}

/// The frame pipeline and the GPU state it owns
#[derive(Debug)]
pub struct Renderer {
    device: GpuDevice,
    config: RendererConfig,
    main_program: ShaderProgram,
    hdr_program: ShaderProgram,
    skybox_program: ShaderProgram,
    hdr_target: RenderTarget,
    dither_texture: GpuTexture,
    point_lights: PointLightRegistry,
    width: u32,
    height: u32,
    projection: Mat4,
    state: FrameState,
    frame_count: u64,
}

impl Renderer {
    /// Build the three shader programs, the HDR target and the dither texture
    ///
    /// Any failure, including an invalid configuration or a shader that does
    /// not compile, is reported as [`RenderError::CannotInitialize`].
    pub fn new(device: &GpuDevice, width: u32, height: u32, config: RendererConfig) -> RenderResult<Self> {
        log::info!("Initializing {} renderer at {}x{}", device.name(), width, height);
        config.validate().map_err(RenderError::CannotInitialize)?;
        if width == 0 || height == 0 {
            return Err(RenderError::CannotInitialize(format!("viewport {width}x{height} is empty")));
        }

        let main_program = ShaderProgram::from_files(device, &config.shaders.main)?;
        let hdr_program = ShaderProgram::from_files(device, &config.shaders.hdr)?;
        let skybox_program = ShaderProgram::from_files(device, &config.shaders.skybox)?;

        let hdr_target = RenderTarget::new(device, width, height, config.msaa_samples)
            .map_err(|e| RenderError::CannotInitialize(format!("cannot create HDR target: {e}")))?;
        let dither_texture = Self::create_dither_texture(device)
            .map_err(|e| RenderError::CannotInitialize(format!("cannot create dither texture: {e}")))?;

        let projection = perspective_projection(width, height, config.field_of_view, config.near_plane, config.far_plane);
        let renderer = Self {
            device: device.clone(),
            config,
            main_program,
            hdr_program,
            skybox_program,
            hdr_target,
            dither_texture,
            point_lights: PointLightRegistry::new(),
            width,
            height,
            projection,
            state: FrameState::Idle,
            frame_count: 0,
        };
        renderer.reset_lighting();
        log::info!("Renderer initialized ({}x MSAA)", renderer.config.msaa_samples);
        Ok(renderer)
    }

    fn create_dither_texture(device: &GpuDevice) -> RenderResult<GpuTexture> {
        let size = DITHER_SIZE as u32;
        let descriptor = TextureDescriptor {
            width: size,
            height: size,
            format: TextureFormat::R8,
            srgb: false,
            generate_mipmaps: false,
            wrap: TextureWrap::Repeat,
            filter: TextureFilter::Nearest,
        };
        GpuTexture::new(device, descriptor, &DITHER_PATTERN)
    }

    /// Every light off, no environment
    fn reset_lighting(&self) {
        for index in 0..MAX_POINT_LIGHTS {
            self.main_program.set(&uniforms::point_light(index, "enabled"), false);
        }
        unset_directional_light(&self.main_program);
        self.main_program.set(uniforms::ENVIRONMENT_ENABLED, false);
        self.main_program.set(uniforms::IBL_SAMPLES, self.config.ibl_samples as i32);
    }

    fn expect_state(&self, expected: FrameState, operation: &'static str) -> RenderResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            log::error!("Cannot {} while {:?}", operation, self.state);
            Err(RenderError::InvalidFrameState {
                operation,
                state: self.state,
            })
        }
    }

    /// Start a frame
    ///
    /// Binds and clears the HDR target, uploads the camera and projection,
    /// and draws the skybox when an environment is given.
    pub fn prepare_render(&mut self, camera: &Camera, environment: Option<&Environment>) -> RenderResult<()> {
        self.expect_state(FrameState::Idle, "prepare a frame")?;

        self.hdr_target.bind();
        self.device.set_viewport(self.width, self.height);
        self.device.set_depth_write(true);
        self.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, self.config.clear_color);

        let view = camera.view_transform();
        self.main_program.activate();
        self.main_program.set(uniforms::VIEW_TRANSFORM, &view);
        self.main_program.set(uniforms::PROJECTION_TRANSFORM, &self.projection);
        self.main_program.set(uniforms::CAMERA_POSITION, camera.position);

        if let Some(environment) = environment {
            self.draw_skybox(&view, environment);
        }

        log::trace!("Frame {} recording", self.frame_count);
        self.state = FrameState::Recording;
        Ok(())
    }

    fn draw_skybox(&self, view: &Mat4, environment: &Environment) {
        self.skybox_program.activate();
        self.skybox_program.set(uniforms::VIEW_TRANSFORM, view);
        self.skybox_program.set(uniforms::PROJECTION_TRANSFORM, &self.projection);
        self.skybox_program.set(uniforms::SKYBOX_BLUR, environment.skybox_blur());
        environment.bind(ENVIRONMENT_TEXTURE_UNIT);
        self.skybox_program
            .set(uniforms::ENVIRONMENT_TEXTURE, UniformValue::Sampler(ENVIRONMENT_TEXTURE_UNIT));

        // The sky sits behind everything and must not occlude models
        self.device.set_depth_write(false);
        self.device.draw_fullscreen_triangle();
        self.device.set_depth_write(true);
    }

    /// Draw one model instance into the HDR target
    ///
    /// With an environment, the instance is lit by it as well as by the
    /// registered lights.
    pub fn render_model(&mut self, instance: &ModelInstance, environment: Option<&Environment>) -> RenderResult<()> {
        self.expect_state(FrameState::Recording, "render a model")?;

        self.main_program.activate();
        match environment {
            Some(environment) => {
                environment.bind(ENVIRONMENT_TEXTURE_UNIT);
                self.main_program.set(uniforms::ENVIRONMENT_ENABLED, true);
                self.main_program
                    .set(uniforms::ENVIRONMENT_TEXTURE, UniformValue::Sampler(ENVIRONMENT_TEXTURE_UNIT));
            }
            None => self.main_program.set(uniforms::ENVIRONMENT_ENABLED, false),
        }
        instance.draw(&self.main_program)
    }

    /// Resolve, tone map and present the frame
    pub fn finish_render(&mut self, surface: &mut dyn Surface) -> RenderResult<()> {
        self.expect_state(FrameState::Recording, "finish a frame")?;

        self.hdr_target.resolve()?;
        let resolved = self.hdr_target.resolved_texture()?;

        self.device.bind_render_target(None);
        let (surface_width, surface_height) = surface.framebuffer_size();
        self.device.set_viewport(surface_width, surface_height);
        self.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, Color::BLACK);

        self.hdr_program.activate();
        self.device.bind_texture(HDR_TEXTURE_UNIT, resolved);
        self.hdr_program.set(uniforms::HDR_BUFFER, UniformValue::Sampler(HDR_TEXTURE_UNIT));
        self.dither_texture.bind(DITHER_TEXTURE_UNIT);
        self.hdr_program.set(uniforms::DITHER_MATRIX, UniformValue::Sampler(DITHER_TEXTURE_UNIT));
        self.device.draw_fullscreen_triangle();

        surface.present();
        self.state = FrameState::Idle;
        self.frame_count += 1;
        Ok(())
    }

    /// Resize the HDR target and recompute the projection
    ///
    /// A zero-sized viewport (a minimized window) is ignored.
    pub fn update_dimensions(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.expect_state(FrameState::Idle, "resize the viewport")?;
        if width == 0 || height == 0 {
            log::debug!("Ignoring empty viewport {}x{}", width, height);
            return Ok(());
        }
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }

        self.hdr_target = RenderTarget::new(&self.device, width, height, self.config.msaa_samples)?;
        self.width = width;
        self.height = height;
        self.update_projection();
        log::info!("Viewport resized to {}x{}", width, height);
        Ok(())
    }

    /// Change the vertical field of view, in degrees
    pub fn update_field_of_view(&mut self, field_of_view: f32) -> RenderResult<()> {
        self.expect_state(FrameState::Idle, "change the field of view")?;
        let clamped = field_of_view.clamp(1.0, 179.0);
        if clamped != field_of_view {
            log::warn!("Field of view {} clamped to {}", field_of_view, clamped);
        }
        self.config.field_of_view = clamped;
        self.update_projection();
        Ok(())
    }

    fn update_projection(&mut self) {
        self.projection = perspective_projection(
            self.width,
            self.height,
            self.config.field_of_view,
            self.config.near_plane,
            self.config.far_plane,
        );
    }

    /// Color the HDR target is cleared to
    pub fn set_clear_color(&mut self, color: Color) {
        self.config.clear_color = color;
    }

    /// Register a point light; returns its slot
    pub fn add_point_light(&mut self, light: &PointLight) -> RenderResult<usize> {
        self.point_lights.add(light, &self.main_program)
    }

    /// Unregister a point light
    pub fn remove_point_light(&mut self, light: &PointLight) -> RenderResult<()> {
        self.point_lights.remove(light, &self.main_program)
    }

    /// Re-upload a registered point light after changing it
    pub fn update_point_light(&self, light: &PointLight) -> RenderResult<()> {
        self.point_lights.update(light, &self.main_program)
    }

    /// Registered point lights
    pub fn point_lights(&self) -> &PointLightRegistry {
        &self.point_lights
    }

    /// Enable the directional light, replacing the previous one
    pub fn set_directional_light(&self, light: &DirectionalLight) {
        set_directional_light(light, &self.main_program);
    }

    /// Disable the directional light
    pub fn unset_directional_light(&self) {
        unset_directional_light(&self.main_program);
    }

    /// Current frame state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Current projection transform
    pub fn projection_transform(&self) -> &Mat4 {
        &self.projection
    }

    /// Viewport size in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Vertical field of view in degrees
    pub fn field_of_view(&self) -> f32 {
        self.config.field_of_view
    }

    /// Number of frames presented
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Geometry pass program
    pub fn main_program(&self) -> &ShaderProgram {
        &self.main_program
    }

    /// Device the renderer draws with
    pub fn device(&self) -> &GpuDevice {
        &self.device
    }
}
