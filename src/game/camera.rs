use crate::engine::timing::Tween;
use crate::game::config::CameraConfig;
use nalgebra::Vector3;

fn vec3((x, y, z): (f32, f32, f32)) -> Vector3<f32> {
    Vector3::new(x, y, z)
}

struct Transition {
    position: Tween,
    target: Tween,
    restore_orbit: bool,
}

/// Camera position and look target, with eased moves between viewpoints.
pub struct CameraRig {
    config: CameraConfig,
    position: Vector3<f32>,
    target: Vector3<f32>,
    transition: Option<Transition>,
    orbit_enabled: bool,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        CameraRig {
            position: vec3(config.default_position),
            target: vec3(config.default_target),
            config,
            transition: None,
            orbit_enabled: true,
        }
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn orbit_enabled(&self) -> bool {
        self.orbit_enabled
    }

    pub fn is_moving(&self) -> bool {
        self.transition.is_some()
    }

    /// Moves to the minigame viewpoint. Orbit control stays off until the
    /// camera has been sent home again.
    pub fn to_game_view(&mut self, now_ms: f64) {
        self.orbit_enabled = false;
        let (position, target) = (vec3(self.config.game_position), vec3(self.config.game_target));
        self.transition_to(position, target, now_ms, false);
    }

    pub fn to_default_view(&mut self, now_ms: f64) {
        let (position, target) = (vec3(self.config.default_position), vec3(self.config.default_target));
        self.transition_to(position, target, now_ms, true);
    }

    /// Rotates the camera around its target. Ignored while orbit is off.
    pub fn orbit(&mut self, yaw: f32) {
        if !self.orbit_enabled {
            return;
        }
        let offset = self.position - self.target;
        let (sin, cos) = yaw.sin_cos();
        let rotated = Vector3::new(offset.x * cos + offset.z * sin, offset.y, -offset.x * sin + offset.z * cos);
        self.position = self.target + rotated;
    }

    pub fn update(&mut self, now_ms: f64) {
        let Some(transition) = &self.transition else {
            return;
        };
        self.position = transition.position.sample(now_ms);
        self.target = transition.target.sample(now_ms);
        if transition.position.is_finished(now_ms) {
            if transition.restore_orbit {
                self.orbit_enabled = true;
            }
            self.transition = None;
        }
    }

    fn transition_to(&mut self, position: Vector3<f32>, target: Vector3<f32>, now_ms: f64, restore_orbit: bool) {
        let duration = self.config.transition_ms;
        self.transition = Some(Transition {
            position: Tween::new(self.position, position, now_ms, duration),
            target: Tween::new(self.target, target, now_ms, duration),
            restore_orbit,
        });
    }
}
