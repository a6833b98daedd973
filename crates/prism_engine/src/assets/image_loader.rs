//! Image loading utilities for texture data
//!
//! Decodes image files with the `image` crate into tightly packed pixel data
//! ready for upload. Rows are flipped so the first row is the bottom of the
//! image, matching OpenGL texture coordinates.

use std::path::Path;

use crate::render::api::TextureFormat;
use crate::render::{RenderError, RenderResult};

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Raw pixel data, bottom row first
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Pixel format of `data`
    pub format: TextureFormat,
}

fn load_error(path: &Path, reason: impl ToString) -> RenderError {
    RenderError::CannotLoadTexture {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl ImageData {
    /// Load an 8-bit RGB or RGBA image from a file path
    ///
    /// Grayscale images (one or two channels) are rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RenderResult<Self> {
        let path = path.as_ref();
        log::debug!("Loading image from: {:?}", path);

        let img = image::open(path).map_err(|e| load_error(path, e))?;
        Self::from_dynamic(img).map_err(|reason| load_error(path, reason))
    }

    /// Decode an 8-bit RGB or RGBA image from memory
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| load_error(Path::new("<memory>"), e))?;
        Self::from_dynamic(img).map_err(|reason| load_error(Path::new("<memory>"), reason))
    }

    fn from_dynamic(img: image::DynamicImage) -> Result<Self, String> {
        let img = img.flipv();
        let (width, height) = (img.width(), img.height());
        let (data, format) = match img.color().channel_count() {
            3 => (img.to_rgb8().into_raw(), TextureFormat::Rgb8),
            4 => (img.to_rgba8().into_raw(), TextureFormat::Rgba8),
            channels => return Err(format!("unsupported channel count {channels}")),
        };
        log::debug!("Decoded {}x{} {:?} image", width, height, format);
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Load a high dynamic range image (e.g. Radiance `.hdr`) as float pixels
    pub fn hdr_from_file<P: AsRef<Path>>(path: P) -> RenderResult<Self> {
        let path = path.as_ref();
        log::debug!("Loading HDR image from: {:?}", path);

        let img = image::open(path).map_err(|e| load_error(path, e))?.flipv();
        let (width, height) = (img.width(), img.height());
        let (data, format) = match img.color().channel_count() {
            3 => (bytemuck::cast_slice(&img.to_rgb32f().into_raw()).to_vec(), TextureFormat::Rgb32F),
            4 => (bytemuck::cast_slice(&img.to_rgba32f().into_raw()).to_vec(), TextureFormat::Rgba32F),
            channels => return Err(load_error(path, format!("unsupported channel count {channels}"))),
        };
        log::info!("Loaded {}x{} HDR image from {:?}", width, height, path);
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
            format: TextureFormat::Rgba8,
        }
    }

    /// Number of channels per pixel
    pub fn channels(&self) -> usize {
        match self.format {
            TextureFormat::R8 => 1,
            TextureFormat::Rgb8 | TextureFormat::Rgb32F => 3,
            TextureFormat::Rgba8 | TextureFormat::Rgba32F => 4,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Source of decoded texture images
///
/// The texture cache decodes through this trait, so decoding can be swapped
/// or instrumented without touching the cache.
pub trait TextureLoader {
    /// Decode the image at `path`
    fn load(&self, path: &Path) -> RenderResult<ImageData>;
}

/// Loads images from the filesystem with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl TextureLoader for ImageFileLoader {
    fn load(&self, path: &Path) -> RenderResult<ImageData> {
        ImageData::from_file(path)
    }
}
