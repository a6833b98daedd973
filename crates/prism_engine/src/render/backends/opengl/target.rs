//! Multisampled HDR framebuffer with a single-sampled resolve texture

use glow::HasContext;

/// GL objects making up one HDR render target
pub(super) struct GlRenderTarget {
    pub framebuffer: glow::Framebuffer,
    pub color: glow::Renderbuffer,
    pub depth: glow::Renderbuffer,
    pub resolve_framebuffer: glow::Framebuffer,
    pub resolve_texture: glow::Texture,
    pub width: i32,
    pub height: i32,
}

impl GlRenderTarget {
    /// Allocate the multisampled color/depth storage and the resolve texture
    pub fn create(gl: &glow::Context, width: u32, height: u32, samples: u32) -> Result<Self, String> {
        let (width, height, samples) = (width as i32, height as i32, samples as i32);

        // SAFETY: the context is current on this thread for the backend's lifetime.
        unsafe {
            let framebuffer = gl.create_framebuffer()?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let color = gl.create_renderbuffer()?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
            gl.renderbuffer_storage_multisample(glow::RENDERBUFFER, samples, glow::RGBA16F, width, height);
            gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, glow::COLOR_ATTACHMENT0, glow::RENDERBUFFER, Some(color));

            let depth = gl.create_renderbuffer()?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage_multisample(glow::RENDERBUFFER, samples, glow::DEPTH24_STENCIL8, width, height);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            let multisampled_status = gl.check_framebuffer_status(glow::FRAMEBUFFER);

            let resolve_framebuffer = gl.create_framebuffer()?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(resolve_framebuffer));
            let resolve_texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(resolve_texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA16F as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::FLOAT,
                None,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(resolve_texture),
                0,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            let resolve_status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            let target = Self {
                framebuffer,
                color,
                depth,
                resolve_framebuffer,
                resolve_texture,
                width,
                height,
            };

            if multisampled_status != glow::FRAMEBUFFER_COMPLETE || resolve_status != glow::FRAMEBUFFER_COMPLETE {
                target.destroy(gl);
                return Err(format!(
                    "incomplete HDR framebuffer (status 0x{multisampled_status:x}/0x{resolve_status:x})"
                ));
            }
            Ok(target)
        }
    }

    /// Blit the multisampled color into the resolve texture
    pub fn resolve(&self, gl: &glow::Context) {
        // SAFETY: see `create`.
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.framebuffer));
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.resolve_framebuffer));
            gl.blit_framebuffer(
                0,
                0,
                self.width,
                self.height,
                0,
                0,
                self.width,
                self.height,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    /// Release every GL object of the target
    pub fn destroy(&self, gl: &glow::Context) {
        // SAFETY: see `create`.
        unsafe {
            gl.delete_framebuffer(self.framebuffer);
            gl.delete_renderbuffer(self.color);
            gl.delete_renderbuffer(self.depth);
            gl.delete_framebuffer(self.resolve_framebuffer);
            gl.delete_texture(self.resolve_texture);
        }
    }
}
