//! HDR environment maps for the skybox and image-based lighting

use std::path::Path;

use crate::assets::image_loader::ImageData;
use crate::render::api::{GpuDevice, TextureDescriptor, TextureFilter, TextureHandle, TextureWrap};
use crate::render::resources::gpu::GpuTexture;
use crate::render::{RenderError, RenderResult};

/// Equirectangular HDR environment
///
/// Owns its texture directly; environments are not shared through the
/// texture cache.
#[derive(Debug)]
pub struct Environment {
    texture: GpuTexture,
    skybox_blur: f32,
}

impl Environment {
    /// Load a Radiance `.hdr` (or other float) image
    ///
    /// `skybox_blur` is the mip level the skybox samples.
    pub fn load(device: &GpuDevice, path: impl AsRef<Path>, skybox_blur: f32) -> RenderResult<Self> {
        let image = ImageData::hdr_from_file(path.as_ref())?;
        let environment = Self::from_image(device, &image, skybox_blur)?;
        log::info!("Loaded environment {:?} ({}x{})", path.as_ref(), image.width, image.height);
        Ok(environment)
    }

    /// Upload already decoded float pixels
    ///
    /// Fails with [`RenderError::CannotLoadTexture`] unless the image holds
    /// float RGB or RGBA data.
    pub fn from_image(device: &GpuDevice, image: &ImageData, skybox_blur: f32) -> RenderResult<Self> {
        if !image.format.is_float() {
            return Err(RenderError::CannotLoadTexture {
                path: "<environment>".into(),
                reason: format!("environment needs float pixels, got {:?}", image.format),
            });
        }
        let descriptor = TextureDescriptor {
            width: image.width,
            height: image.height,
            format: image.format,
            srgb: false,
            generate_mipmaps: true,
            wrap: TextureWrap::ClampToEdge,
            filter: TextureFilter::Linear,
        };
        let texture = GpuTexture::new(device, descriptor, &image.data)?;
        Ok(Self { texture, skybox_blur })
    }

    /// Texture handle
    pub fn texture(&self) -> TextureHandle {
        self.texture.handle()
    }

    /// Bind the environment texture to `unit`
    pub fn bind(&self, unit: u32) {
        self.texture.bind(unit);
    }

    /// Mip level the skybox samples
    pub fn skybox_blur(&self) -> f32 {
        self.skybox_blur
    }

    /// Change the skybox mip level
    pub fn set_skybox_blur(&mut self, skybox_blur: f32) {
        self.skybox_blur = skybox_blur;
    }
}
