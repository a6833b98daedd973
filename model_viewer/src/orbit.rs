//! Orbit camera driven by mouse input
//!
//! Dragging with the left button rotates around the target, scrolling zooms.
//! Window events are folded into an [`InputState`] each frame and the camera
//! consumes it in [`OrbitCamera::update`].

use prism_engine::prelude::{Camera, Vec3};

use crate::config::CameraSettings;

const MAX_PITCH: f32 = 89.0;

/// Input gathered from one frame of window events
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    /// Cursor movement in pixels since the last frame
    pub cursor_delta: (f32, f32),
    /// Scroll steps since the last frame, positive towards the target
    pub scroll: f32,
    /// Whether the rotate button is held
    pub rotating: bool,
    /// Reset the camera to its configured pose
    pub reset: bool,
    last_cursor: Option<(f64, f64)>,
}

impl InputState {
    /// Record a new cursor position
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((last_x, last_y)) = self.last_cursor {
            self.cursor_delta.0 += (x - last_x) as f32;
            self.cursor_delta.1 += (y - last_y) as f32;
        }
        self.last_cursor = Some((x, y));
    }

    /// Clear the per-frame values, keeping held buttons and the cursor
    pub fn end_frame(&mut self) {
        self.cursor_delta = (0.0, 0.0);
        self.scroll = 0.0;
        self.reset = false;
    }
}

/// Camera orbiting a fixed target
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    settings: CameraSettings,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl OrbitCamera {
    /// Start at the pose described by `settings`
    pub fn new(settings: CameraSettings) -> Self {
        let mut camera = Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 0.0,
            settings,
        };
        camera.reset();
        camera
    }

    /// Return to the configured pose
    pub fn reset(&mut self) {
        self.yaw = self.settings.yaw;
        self.pitch = self.settings.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.distance = self.clamp_distance(self.settings.distance);
    }

    /// Apply one frame of input
    pub fn update(&mut self, input: &InputState) {
        if input.reset {
            self.reset();
            return;
        }
        if input.rotating {
            let sensitivity = self.settings.rotate_sensitivity;
            self.yaw = (self.yaw - input.cursor_delta.0 * sensitivity).rem_euclid(360.0);
            self.pitch = (self.pitch + input.cursor_delta.1 * sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
        }
        if input.scroll != 0.0 {
            let factor = (1.0 - self.settings.zoom_sensitivity).powf(input.scroll);
            self.distance = self.clamp_distance(self.distance * factor);
        }
    }

    /// Current yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current pitch in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Current distance from the target
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Look-at camera for the current pose
    pub fn camera(&self) -> Camera {
        let target = Vec3::from(self.settings.target);
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let offset = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
        Camera::new(target + offset * self.distance, target, Vec3::y())
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.settings.min_distance, self.settings.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn level_settings() -> CameraSettings {
        CameraSettings {
            pitch: 0.0,
            ..CameraSettings::default()
        }
    }

    #[test]
    fn test_initial_pose_looks_down_positive_z() {
        let orbit = OrbitCamera::new(level_settings());
        let camera = orbit.camera();
        assert_relative_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
        assert_relative_eq!(camera.target, Vec3::zeros());
    }

    #[test]
    fn test_cursor_deltas_accumulate_after_first_event() {
        let mut input = InputState::default();
        input.cursor_moved(10.0, 10.0);
        assert_eq!(input.cursor_delta, (0.0, 0.0));
        input.cursor_moved(15.0, 8.0);
        input.cursor_moved(20.0, 8.0);
        assert_eq!(input.cursor_delta, (10.0, -2.0));

        input.end_frame();
        assert_eq!(input.cursor_delta, (0.0, 0.0));
        input.cursor_moved(21.0, 8.0);
        assert_eq!(input.cursor_delta, (1.0, 0.0));
    }

    #[test]
    fn test_drag_only_rotates_while_button_held() {
        let mut orbit = OrbitCamera::new(level_settings());
        let mut input = InputState {
            cursor_delta: (100.0, 0.0),
            ..InputState::default()
        };
        orbit.update(&input);
        assert_relative_eq!(orbit.yaw(), 0.0);

        input.rotating = true;
        orbit.update(&input);
        assert_relative_eq!(orbit.yaw(), 330.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut orbit = OrbitCamera::new(level_settings());
        let input = InputState {
            cursor_delta: (0.0, 10_000.0),
            rotating: true,
            ..InputState::default()
        };
        orbit.update(&input);
        assert_relative_eq!(orbit.pitch(), MAX_PITCH);
    }

    #[test]
    fn test_zoom_and_reset() {
        let mut orbit = OrbitCamera::new(level_settings());
        orbit.update(&InputState {
            scroll: 1.0,
            ..InputState::default()
        });
        assert_relative_eq!(orbit.distance(), 4.5, epsilon = 1e-5);

        orbit.update(&InputState {
            scroll: 1000.0,
            ..InputState::default()
        });
        assert_relative_eq!(orbit.distance(), 0.5);

        orbit.update(&InputState {
            reset: true,
            ..InputState::default()
        });
        assert_relative_eq!(orbit.distance(), 5.0);
    }
}
