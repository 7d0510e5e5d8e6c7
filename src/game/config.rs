use crate::error::GameError;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub key: String,
    /// Candidate paths tried in order until one loads.
    pub paths: Vec<String>,
    pub color: (f32, f32, f32),
    pub wire_color: (f32, f32, f32),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            key: String::new(),
            paths: Vec::new(),
            color: (1.0, 1.0, 1.0),
            wire_color: (1.0, 1.0, 1.0),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SteeringConfig {
    pub movement_speed: f32,
    pub max_movement_speed: f32,
    pub acceleration: f32,
    pub max_steering_angle: f32,
    pub max_displacement: f32,
    pub rotation_easing: f32,
    pub speed_easing: f32,
    pub release_momentum: f32,
    pub reset_duration_ms: f64,
    pub initial_position: (f32, f32, f32),
    /// Size of the car's bounding box, centered on its position.
    pub body_size: (f32, f32, f32),
}

impl Default for SteeringConfig {
    fn default() -> Self {
        SteeringConfig {
            movement_speed: 0.08,
            max_movement_speed: 0.4,
            acceleration: 0.02,
            max_steering_angle: 0.1,
            max_displacement: 6.0,
            rotation_easing: 0.15,
            speed_easing: 0.1,
            release_momentum: 0.45,
            reset_duration_ms: 1000.0,
            initial_position: (-0.013, 0.0, 0.0),
            body_size: (2.45, 1.5, 4.6),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SpawnConfig {
    pub base_interval_ms: f64,
    pub min_interval_ms: f64,
    pub travel_duration_ms: f64,
    pub near_z: f32,
    pub far_z: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            base_interval_ms: 1500.0,
            min_interval_ms: 500.0,
            travel_duration_ms: 14000.0,
            near_z: -100.0,
            far_z: 100.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MinigameConfig {
    pub countdown_from: u32,
    pub countdown_step_ms: f64,
    /// Countdown value at which obstacles start coming.
    pub spawn_at_countdown: u32,
    pub min_spawn_interval_ms: f64,
    pub max_spawn_interval_ms: f64,
    pub max_batch: u32,
    /// Distance from the car's start line where a lane begins.
    pub lane_inner_offset: f32,
    pub box_size: f32,
    pub box_color: (f32, f32, f32),
    pub travel_duration_ms: f64,
    pub near_z: f32,
    pub far_z: f32,
    pub points_per_tier: u32,
    pub speed_per_tier: f64,
    pub game_over_ms: f64,
}

impl Default for MinigameConfig {
    fn default() -> Self {
        MinigameConfig {
            countdown_from: 3,
            countdown_step_ms: 1000.0,
            spawn_at_countdown: 2,
            min_spawn_interval_ms: 1500.0,
            max_spawn_interval_ms: 2500.0,
            max_batch: 3,
            lane_inner_offset: 0.5,
            box_size: 2.0,
            box_color: (1.0, 1.0, 0.0),
            travel_duration_ms: 6000.0,
            near_z: -90.0,
            far_z: 110.0,
            points_per_tier: 20,
            speed_per_tier: 0.15,
            game_over_ms: 3000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub default_position: (f32, f32, f32),
    pub default_target: (f32, f32, f32),
    pub game_position: (f32, f32, f32),
    pub game_target: (f32, f32, f32),
    pub transition_ms: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            default_position: (0.0, 1.975, 7.0),
            default_target: (0.0, 1.8, 0.0),
            game_position: (0.0, 4.0, 7.0),
            game_target: (0.0, 1.0, 0.0),
            transition_ms: 1000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub models: Vec<ModelConfig>,
    pub steering: SteeringConfig,
    pub palms: SpawnConfig,
    pub rocks: SpawnConfig,
    pub minigame: MinigameConfig,
    pub camera: CameraConfig,
    pub loading_timeout_ms: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            models: default_models(),
            steering: SteeringConfig::default(),
            palms: SpawnConfig::default(),
            rocks: SpawnConfig::default(),
            minigame: MinigameConfig::default(),
            camera: CameraConfig::default(),
            loading_timeout_ms: 8000.0,
        }
    }
}

impl AppConfig {
    pub fn from_json(text: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn model(&self, key: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.key == key)
    }
}

const LAGUNA: (f32, f32, f32) = (0.231, 0.549, 0.922);
const TWEETY: (f32, f32, f32) = (1.0, 0.875, 0.486);

fn model(key: &str, paths: &[&str], color: (f32, f32, f32), wire_color: (f32, f32, f32)) -> ModelConfig {
    ModelConfig {
        key: key.to_string(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        color,
        wire_color,
    }
}

fn default_models() -> Vec<ModelConfig> {
    vec![
        model("polonez", &["/assets/models/polonez.glb", "/assets/models/polonez.GLB"], LAGUNA, TWEETY),
        model("wheel", &["/assets/models/wheel.glb"], LAGUNA, TWEETY),
        model("palm", &["/assets/models/palm.glb", "/assets/models/palm.GLB"], (0.337, 0.627, 1.0), TWEETY),
        model("rockmd", &["/assets/models/rockmd.glb"], (0.565, 0.278, 0.765), (0.4, 0.714, 0.812)),
        model("rocksm", &["/assets/models/rocksm.glb"], (0.565, 0.278, 0.765), (0.4, 0.714, 0.812)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "steering": { "max_displacement": 4.0 } }"#).unwrap();
        assert_eq!(config.steering.max_displacement, 4.0);
        assert_eq!(config.steering.movement_speed, 0.08);
        assert_eq!(config.minigame.points_per_tier, 20);
        assert!(config.model("palm").is_some());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(AppConfig::from_json("{ nope"), Err(GameError::Config(_))));
    }
}
