use crate::engine::models::{ModelLibrary, NodePair};
use crate::engine::scene::{Scene, Transform};
use crate::game::speed::SpeedListener;
use nalgebra::Vector3;
use std::f32::consts::PI;

const WHEEL_ROTATION_SPEED: f32 = -0.22;
const WHEEL_TRACK: f32 = 1.227;
const WHEEL_HEIGHT: f32 = 0.56;
const AXLES_Z: [f32; 2] = [1.975, -2.55];

#[derive(Clone, Copy, Debug, PartialEq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

struct Wheel {
    side: Side,
    pair: NodePair,
}

/// The car's wheels. They follow the body and spin with the game speed.
pub struct Environment {
    wheels: Vec<Wheel>,
    speed: f64,
    show_main: bool,
    show_wireframe: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            wheels: Vec::new(),
            speed: 1.0,
            show_main: true,
            show_wireframe: true,
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wheel_count(&self) -> usize {
        self.wheels.len()
    }

    /// Radians each wheel turns per 60 Hz frame.
    pub fn rotation_speed(&self) -> f32 {
        WHEEL_ROTATION_SPEED * self.speed as f32
    }

    /// Creates the four wheels once the wheel model is loaded.
    pub fn attach_wheels(&mut self, scene: &mut dyn Scene, models: &ModelLibrary) {
        if !self.wheels.is_empty() {
            return;
        }
        for side in [Side::Left, Side::Right] {
            for z in AXLES_Z {
                let mut transform = Transform::at(side.sign() * WHEEL_TRACK, WHEEL_HEIGHT, z);
                if side == Side::Right {
                    transform.rotation.y = PI;
                }
                let Some(pair) = models.create_pair(scene, "wheel", transform) else {
                    return;
                };
                pair.set_visibility(scene, self.show_main, self.show_wireframe);
                self.wheels.push(Wheel { side, pair });
            }
        }
        log::info!("Attached {} wheels", self.wheels.len());
    }

    /// Keeps the wheels under the body. Roll lifts one side and drops the other.
    pub fn follow(&self, scene: &mut dyn Scene, car: Vector3<f32>, roll: f32) {
        for wheel in &self.wheels {
            let sign = wheel.side.sign();
            let Some(mut t) = scene.transform(wheel.pair.visual) else {
                continue;
            };
            t.position.x = car.x + sign * WHEEL_TRACK;
            t.position.y = WHEEL_HEIGHT + sign * roll * 0.5;
            scene.set_transform(wheel.pair.visual, t);
            wheel.pair.sync(scene);
        }
    }

    pub fn update(&self, scene: &mut dyn Scene, delta_secs: f32) {
        let amount = self.rotation_speed() * delta_secs * 60.0;
        for wheel in &self.wheels {
            if let Some(t) = scene.transform_mut(wheel.pair.visual) {
                t.rotation.x += amount;
            }
            wheel.pair.sync(scene);
        }
    }

    pub fn set_visibility(&mut self, scene: &mut dyn Scene, show_main: bool, show_wireframe: bool) {
        self.show_main = show_main;
        self.show_wireframe = show_wireframe;
        for wheel in &self.wheels {
            wheel.pair.set_visibility(scene, show_main, show_wireframe);
        }
    }
}

impl SpeedListener for Environment {
    fn set_speed(&mut self, multiplier: f64) {
        self.speed = multiplier;
    }
}
