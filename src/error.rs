use thiserror::Error;

/// Everything that can go wrong inside the simulation core.
///
/// None of these are fatal: callers log them and carry on with the next
/// frame, so the worst outcome is a missing visual or a stalled spawner.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0} is not available yet")]
    MissingReference(&'static str),

    #[error("failed to load {key}: {reason}")]
    LoadFailure { key: String, reason: String },

    #[error("invalid config: {0}")]
    Config(String),
}

impl GameError {
    pub fn load(key: &str, reason: impl Into<String>) -> Self {
        GameError::LoadFailure {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Config(err.to_string())
    }
}

impl From<gltf::Error> for GameError {
    fn from(err: gltf::Error) -> Self {
        GameError::LoadFailure {
            key: "gltf".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GameError> for wasm_bindgen::JsValue {
    fn from(err: GameError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
