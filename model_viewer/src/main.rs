//! Model viewer
//!
//! Loads the scene described by a TOML file and renders it with an orbit
//! camera. Drag with the left mouse button to rotate, scroll to zoom, `R`
//! resets the camera and `Escape` quits.
//!
//! ```text
//! model_viewer [CONFIG] [--headless]
//! ```
//!
//! `--headless` renders `headless_frames` frames through the recording
//! backend instead of opening a window.

mod config;
mod orbit;
mod scene;

use std::path::PathBuf;
use std::rc::Rc;

use glfw::{Action, Key, MouseButton, WindowEvent};
use prism_engine::config::{Config, ConfigError};
use prism_engine::foundation::logging;
use prism_engine::prelude::*;
use prism_engine::render::WindowError;
use thiserror::Error;

use config::ViewerConfig;
use orbit::{InputState, OrbitCamera};
use scene::Scene;

const DEFAULT_CONFIG: &str = "model_viewer/viewer.toml";

/// Anything that can stop the viewer
#[derive(Error, Debug)]
pub enum ViewerError {
    /// Configuration could not be read
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Window or context creation failed
    #[error("window: {0}")]
    Window(#[from] WindowError),

    /// Rendering failed
    #[error("render: {0}")]
    Render(#[from] RenderError),

    /// Unknown command line argument
    #[error("unknown argument '{0}' (usage: model_viewer [CONFIG] [--headless])")]
    Usage(String),
}

/// Result type for the viewer
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Parsed command line
#[derive(Debug, PartialEq)]
struct Options {
    config: PathBuf,
    headless: bool,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> ViewerResult<Self> {
        let mut options = Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            headless: false,
        };
        for arg in args {
            match arg.as_str() {
                "--headless" => options.headless = true,
                flag if flag.starts_with('-') => return Err(ViewerError::Usage(flag.to_string())),
                path => options.config = PathBuf::from(path),
            }
        }
        Ok(options)
    }
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> ViewerResult<()> {
    let options = Options::parse(std::env::args().skip(1))?;
    let config = ViewerConfig::load_or_default(&options.config)?;

    if options.headless {
        run_headless(&config)?;
        Ok(())
    } else {
        run_windowed(&config)
    }
}

fn run_windowed(config: &ViewerConfig) -> ViewerResult<()> {
    let mut window = GameWindow::new(&config.window)?;
    let device: GpuDevice = Rc::new(GlBackend::from_window(&mut window)?);
    let (width, height) = window.framebuffer_size();
    let mut renderer = Renderer::new(&device, width, height, config.renderer.clone())?;

    let mut scene = Scene::load(config, &device, &mut renderer)?;
    log::info!(
        "Viewing {} instances of {} models with {} point lights",
        scene.instance_count(),
        scene.model_count(),
        scene.point_light_count()
    );

    let mut orbit = OrbitCamera::new(config.camera.clone());
    let mut input = InputState::default();

    while window.is_running() {
        for event in window.poll_events() {
            match event {
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => window.close(),
                WindowEvent::Key(Key::R, _, Action::Press, _) => input.reset = true,
                WindowEvent::MouseButton(MouseButton::Button1, action, _) => {
                    input.rotating = action != Action::Release;
                }
                WindowEvent::CursorPos(x, y) => input.cursor_moved(x, y),
                WindowEvent::Scroll(_, y) => input.scroll += y as f32,
                WindowEvent::FramebufferSize(w, h) => {
                    renderer.update_dimensions(w.max(0) as u32, h.max(0) as u32)?;
                }
                _ => {}
            }
        }

        orbit.update(&input);
        input.end_frame();
        scene.update(window.elapsed_time() as f32);
        scene.render(&mut renderer, &orbit.camera(), &mut window)?;
    }

    log::info!("Rendered {} frames", renderer.frame_count());
    Ok(())
}

/// Render the configured number of frames without a window, returning how
/// many were presented
fn run_headless(config: &ViewerConfig) -> ViewerResult<u64> {
    let (width, height) = (config.window.width, config.window.height);
    let backend = Rc::new(HeadlessBackend::new());
    let device: GpuDevice = backend.clone();
    let mut surface = HeadlessSurface::new(width, height);
    let mut renderer = Renderer::new(&device, width, height, config.renderer.clone())?;
    let mut scene = Scene::load(config, &device, &mut renderer)?;
    let orbit = OrbitCamera::new(config.camera.clone());

    for frame in 0..config.headless_frames {
        scene.update(frame as f32 / 60.0);
        scene.render(&mut renderer, &orbit.camera(), &mut surface)?;
    }

    log::info!(
        "Rendered {} frames headless ({} presents, {} recorded commands, {} live textures)",
        renderer.frame_count(),
        surface.present_count(),
        backend.commands().len(),
        backend.live_textures()
    );
    Ok(surface.present_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_options_default() {
        let options = Options::parse(Vec::new()).unwrap();
        assert_eq!(options.config, PathBuf::from(DEFAULT_CONFIG));
        assert!(!options.headless);
    }

    #[test]
    fn test_options_config_and_headless() {
        let options = Options::parse(args(&["--headless", "scenes/demo.toml"])).unwrap();
        assert_eq!(options.config, PathBuf::from("scenes/demo.toml"));
        assert!(options.headless);
    }

    #[test]
    fn test_options_reject_unknown_flag() {
        assert!(matches!(
            Options::parse(args(&["--fullscreen"])),
            Err(ViewerError::Usage(flag)) if flag == "--fullscreen"
        ));
    }

    #[test]
    fn test_headless_run_presents_every_frame() {
        let shaders = ShaderConfig::in_directory(concat!(env!("CARGO_MANIFEST_DIR"), "/../resources/shaders"));
        let config = ViewerConfig {
            headless_frames: 3,
            renderer: RendererConfig::default().with_shaders(shaders),
            ..ViewerConfig::default()
        };
        assert_eq!(run_headless(&config).unwrap(), 3);
    }
}
