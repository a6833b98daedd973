//! GLFW-based window management for OpenGL rendering
//!
//! Creates a fixed-size window with an OpenGL 3.3 core context, exposes the
//! polling loop and elapsed time, and hands out the GL function loader the
//! OpenGL backend needs.

use glfw::Context;
use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::render::window::Surface;
use crate::render::RenderError;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The window or its OpenGL context could not be created
    #[error("Window creation failed ({width}x{height})")]
    CreationFailed {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

impl From<WindowError> for RenderError {
    fn from(error: WindowError) -> Self {
        RenderError::CannotInitialize(error.to_string())
    }
}

/// GLFW window owning the OpenGL context
pub struct GameWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GameWindow {
    /// Create a window and make its OpenGL 3.3 core context current
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(3, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        // Required on macOS
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed {
                width: config.width,
                height: config.height,
            })?;

        window.make_current();
        glfw.set_swap_interval(glfw::SwapInterval::Sync(1));

        window.set_key_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_close_polling(true);

        log::info!("Created {}x{} window '{}'", config.width, config.height, config.title);

        Ok(Self { glfw, window, events })
    }

    /// Whether the window should keep running
    pub fn is_running(&self) -> bool {
        !self.window.should_close()
    }

    /// Request the window to close at the end of the frame
    pub fn close(&mut self) {
        self.window.set_should_close(true);
    }

    /// Process pending window events and return them in arrival order
    pub fn poll_events(&mut self) -> Vec<glfw::WindowEvent> {
        self.glfw.poll_events();
        glfw::flush_messages(&self.events).map(|(_, event)| event).collect()
    }

    /// Seconds since the window system was initialized
    pub fn elapsed_time(&self) -> f64 {
        self.glfw.get_time()
    }

    /// Current cursor position in screen coordinates
    pub fn cursor_position(&self) -> (f64, f64) {
        self.window.get_cursor_pos()
    }

    /// Whether `key` is currently held
    pub fn is_key_down(&self, key: glfw::Key) -> bool {
        matches!(self.window.get_key(key), glfw::Action::Press | glfw::Action::Repeat)
    }

    /// Whether `button` is currently held
    pub fn is_mouse_button_down(&self, button: glfw::MouseButton) -> bool {
        self.window.get_mouse_button(button) == glfw::Action::Press
    }

    /// Resize the window
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.window.set_size(width as i32, height as i32);
    }

    /// Look up an OpenGL function pointer
    pub fn get_proc_address(&mut self, name: &str) -> *const std::ffi::c_void {
        self.window.get_proc_address(name) as *const _
    }
}

impl Surface for GameWindow {
    fn present(&mut self) {
        self.window.swap_buffers();
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width.max(0) as u32, height.max(0) as u32)
    }
}
