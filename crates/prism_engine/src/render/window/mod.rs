//! Window management subsystem
//!
//! The frame pipeline only needs two things from whatever it draws into: a
//! way to present the finished frame and the size of the default framebuffer.
//! Those are captured by [`Surface`]. [`GameWindow`] is the glfw-backed
//! implementation that also owns the OpenGL context.

pub mod glfw_window;

pub use glfw_window::{GameWindow, WindowError, WindowResult};

/// Something the pipeline can present finished frames to
pub trait Surface {
    /// Swap the default framebuffer onto the display
    fn present(&mut self);

    /// Size of the default framebuffer in pixels
    fn framebuffer_size(&self) -> (u32, u32);
}
