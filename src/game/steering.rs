use crate::engine::models::NodePair;
use crate::engine::scene::{Aabb, Scene, Transform};
use crate::engine::timing::Tween;
use crate::game::config::SteeringConfig;
use nalgebra::Vector3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SteerKey {
    Left,
    Right,
}

impl SteerKey {
    /// Lateral direction of travel: left moves toward -x.
    fn direction(self) -> f32 {
        match self {
            SteerKey::Left => -1.0,
            SteerKey::Right => 1.0,
        }
    }
}

/// Lateral steering of the Polonez. Turns held arrow keys into an eased
/// sideways slide plus a small roll, clamped to `max_displacement` around
/// the starting line.
pub struct SteeringModel {
    config: SteeringConfig,
    rig: Option<NodePair>,
    initial: Transform,
    position: Vector3<f32>,
    roll: f32,
    current_speed: f32,
    current_angle: f32,
    target_angle: f32,
    left_pressed: bool,
    right_pressed: bool,
    last_press_ms: f64,
    enabled: bool,
    locked: bool,
    reset: Option<Tween>,
    warned_missing: bool,
}

impl SteeringModel {
    pub fn new(config: SteeringConfig) -> Self {
        let (x, y, z) = config.initial_position;
        let initial = Transform::at(x, y, z);
        SteeringModel {
            config,
            rig: None,
            initial,
            position: initial.position,
            roll: initial.rotation.z,
            current_speed: 0.0,
            current_angle: 0.0,
            target_angle: 0.0,
            left_pressed: false,
            right_pressed: false,
            last_press_ms: 0.0,
            enabled: false,
            locked: false,
            reset: None,
            warned_missing: false,
        }
    }

    /// Hands over the car's nodes once the model has loaded. The node's
    /// current transform becomes the reset target.
    pub fn attach(&mut self, scene: &dyn Scene, rig: NodePair) {
        if let Some(t) = scene.transform(rig.visual) {
            self.initial = t;
            self.position = t.position;
            self.roll = t.rotation.z;
        }
        self.rig = Some(rig);
    }

    pub fn is_attached(&self) -> bool {
        self.rig.is_some()
    }

    pub fn rig(&self) -> Option<NodePair> {
        self.rig
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    pub fn initial(&self) -> Transform {
        self.initial
    }

    pub fn max_displacement(&self) -> f32 {
        self.config.max_displacement
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_resetting(&self) -> bool {
        self.reset.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("Steering mode {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Freezes steering. Locking also drops all momentum and held keys.
    pub fn set_steering_lock(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.current_angle = 0.0;
            self.target_angle = 0.0;
            self.current_speed = 0.0;
            self.left_pressed = false;
            self.right_pressed = false;
        }
    }

    pub fn on_input_down(&mut self, key: SteerKey, now_ms: f64) {
        if !self.enabled {
            return;
        }
        match key {
            SteerKey::Left => self.left_pressed = true,
            SteerKey::Right => self.right_pressed = true,
        }
        self.last_press_ms = now_ms;
    }

    pub fn on_input_up(&mut self, key: SteerKey) {
        let was_pressed = match key {
            SteerKey::Left => std::mem::replace(&mut self.left_pressed, false),
            SteerKey::Right => std::mem::replace(&mut self.right_pressed, false),
        };
        if was_pressed {
            self.current_speed *= self.config.release_momentum;
        }
    }

    /// Starts an eased slide back to the initial position.
    pub fn reset_position(&mut self, now_ms: f64) {
        if self.rig.is_none() {
            log::warn!("Cannot reset position, Polonez model not attached");
            return;
        }
        self.reset = Some(Tween::new(
            self.position,
            self.initial.position,
            now_ms,
            self.config.reset_duration_ms,
        ));
    }

    pub fn update(&mut self, scene: &mut dyn Scene, delta_secs: f32, now_ms: f64) {
        let Some(rig) = self.rig else {
            if !self.warned_missing {
                log::warn!("Polonez model not found, steering disabled until it loads");
                self.warned_missing = true;
            }
            return;
        };

        if let Some(tween) = self.reset {
            self.position = tween.sample(now_ms);
            if tween.is_finished(now_ms) {
                self.reset = None;
                self.current_speed = 0.0;
                self.left_pressed = false;
                self.right_pressed = false;
            }
        } else if self.enabled && !self.locked {
            if self.left_pressed {
                self.steer(SteerKey::Left, now_ms);
            } else if self.right_pressed {
                self.steer(SteerKey::Right, now_ms);
            } else {
                self.coast(delta_secs);
            }
        }

        self.write_back(scene, rig);
    }

    /// Bounding box of the car body at its current position.
    pub fn bounds(&self) -> Aabb {
        let (w, h, d) = self.config.body_size;
        let center = self.position + Vector3::new(0.0, h / 2.0, 0.0);
        Aabb::from_center_size(center, Vector3::new(w, h, d))
    }

    fn min_x(&self) -> f32 {
        self.initial.position.x - self.config.max_displacement
    }

    fn max_x(&self) -> f32 {
        self.initial.position.x + self.config.max_displacement
    }

    fn steer(&mut self, key: SteerKey, now_ms: f64) {
        let held_secs = ((now_ms - self.last_press_ms) / 1000.0) as f32;

        // Fixed blend per call, so responsiveness depends on frame rate.
        let target_speed = self.config.movement_speed + self.config.acceleration * held_secs * 2.0;
        let target_speed = target_speed.min(self.config.max_movement_speed);
        self.current_speed += (target_speed - self.current_speed) * self.config.speed_easing;

        let candidate = self.position.x + key.direction() * self.current_speed;
        if candidate < self.min_x() || candidate > self.max_x() {
            return;
        }
        self.position.x = candidate;

        self.target_angle = -key.direction() * self.config.max_steering_angle;
        self.ease_roll();
    }

    fn coast(&mut self, delta_secs: f32) {
        // Decay scales with wall-clock delta, unlike the acceleration above.
        if self.current_speed > 0.0 {
            self.current_speed =
                (self.current_speed - self.config.acceleration * 2.0 * delta_secs * 60.0).max(0.0);
        }

        if self.current_angle.abs() > 0.001 {
            self.target_angle = 0.0;
            self.ease_roll();
        }

        if self.current_speed > 0.0 {
            let direction = if self.current_angle > 0.0 { -1.0 } else { 1.0 };
            let candidate = self.position.x + direction * self.current_speed;
            if candidate > self.min_x() && candidate < self.max_x() {
                self.position.x = candidate;
            }
        }
    }

    fn ease_roll(&mut self) {
        let easing = self.config.rotation_easing;
        self.current_angle += (self.target_angle - self.current_angle) * easing;
        let target_roll = self.initial.rotation.z + self.current_angle;
        self.roll += (target_roll - self.roll) * easing;
    }

    fn write_back(&self, scene: &mut dyn Scene, rig: NodePair) {
        if let Some(t) = scene.transform_mut(rig.visual) {
            t.position = self.position;
            t.rotation.z = self.roll;
        }
        rig.sync(scene);
    }
}
