pub mod animator;
pub mod camera;
pub mod config;
pub mod environment;
pub mod hud;
pub mod loading;
pub mod materials;
pub mod minigame;
pub mod spawner;
pub mod speed;
pub mod steering;

pub use config::AppConfig;

use crate::engine::models::{Model, ModelLibrary};
use crate::engine::scene::{SceneGraph, Transform};
use crate::engine::timing::FrameClock;
use crate::error::GameError;
use environment::Environment;
use loading::LoadingTracker;
use materials::{Palette, TextureScroll};
use minigame::MinigameEngine;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use spawner::{Placement, SpawnScheduler};
use speed::SpeedListener;
use steering::{SteerKey, SteeringModel};

/// Longest frame step fed to the simulation, in seconds.
const MAX_FRAME_SECS: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Enter,
    Escape,
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowLeft" => Some(Key::Left),
            "ArrowRight" => Some(Key::Right),
            "Enter" => Some(Key::Enter),
            "Escape" => Some(Key::Escape),
            _ => None,
        }
    }
}

pub struct Game {
    pub config: AppConfig,
    pub scene: SceneGraph,
    pub models: ModelLibrary,
    pub steering: SteeringModel,
    pub environment: Environment,
    pub scroll: TextureScroll,
    pub palette: Palette,
    pub palms: SpawnScheduler,
    pub rocks: SpawnScheduler,
    pub minigame: MinigameEngine,
    pub loading: LoadingTracker,
    clock: FrameClock,
    wired: bool,
    warned_unwired: bool,
}

impl Game {
    /// First construction phase. Nothing is placed in the scene until
    /// [`Game::wire`] runs.
    pub fn new(config: AppConfig, mut rng: SmallRng, now_ms: f64) -> Self {
        let mut loading = LoadingTracker::new(now_ms, config.loading_timeout_ms);
        loading.expect(config.models.len());

        Game {
            scene: SceneGraph::new(),
            models: ModelLibrary::new(),
            steering: SteeringModel::new(config.steering.clone()),
            environment: Environment::new(),
            scroll: TextureScroll::default(),
            palette: Palette::default(),
            palms: SpawnScheduler::new(
                "palm",
                config.palms.clone(),
                Placement::palms(),
                SmallRng::seed_from_u64(rng.gen()),
            ),
            rocks: SpawnScheduler::new(
                "rock",
                config.rocks.clone(),
                Placement::rocks(),
                SmallRng::seed_from_u64(rng.gen()),
            ),
            minigame: MinigameEngine::new(
                config.minigame.clone(),
                config.camera.clone(),
                SmallRng::seed_from_u64(rng.gen()),
            ),
            loading,
            clock: FrameClock::new(MAX_FRAME_SECS),
            wired: false,
            warned_unwired: false,
            config,
        }
    }

    pub fn is_wired(&self) -> bool {
        self.wired
    }

    /// Registers the outcome of one model fetch. Failures are logged and
    /// counted, the game carries on without that model.
    pub fn on_model_loaded(&mut self, key: &str, model: Result<Model, GameError>, now_ms: f64) {
        match model {
            Ok(model) => {
                self.models.insert(key, model);
                self.loading.item_loaded(key);
                if self.wired {
                    self.attach(key, now_ms);
                }
            }
            Err(e) => {
                log::error!("Error loading model {}: {}", key, e);
                self.loading.item_failed(key);
            }
        }
    }

    /// Second construction phase: places whatever has loaded so far.
    /// Models arriving later are attached as they come in.
    pub fn wire(&mut self, now_ms: f64) {
        if self.wired {
            return;
        }
        self.wired = true;
        let keys: Vec<String> = self.config.models.iter().map(|m| m.key.clone()).collect();
        for key in keys {
            self.attach(&key, now_ms);
        }
        if !self.steering.is_attached() {
            log::error!("Polonez model not found, steering disabled");
        }
        log::info!("Game wired");
    }

    fn attach(&mut self, key: &str, now_ms: f64) {
        if !self.models.contains(key) {
            return;
        }
        match key {
            "polonez" if !self.steering.is_attached() => {
                let (x, y, z) = self.config.steering.initial_position;
                if let Some(pair) = self.models.create_pair(&mut self.scene, key, Transform::at(x, y, z)) {
                    self.steering.attach(&self.scene, pair);
                }
            }
            "wheel" => self.environment.attach_wheels(&mut self.scene, &self.models),
            "palm" if !self.palms.is_running() => self.palms.start(&self.models, now_ms),
            "rockmd" | "rocksm" if !self.rocks.is_running() => self.rocks.start(&self.models, now_ms),
            _ => {}
        }
    }

    pub fn key_down(&mut self, key: Key, now_ms: f64) {
        match key {
            Key::Left => self.steering.on_input_down(SteerKey::Left, now_ms),
            Key::Right => self.steering.on_input_down(SteerKey::Right, now_ms),
            Key::Enter => {
                if self.minigame.is_live() {
                    return;
                }
                self.steering.set_enabled(true);
                self.steering.reset_position(now_ms);
                self.with_listeners(|minigame, _, steering, listeners| {
                    minigame.start(steering, listeners, now_ms);
                });
            }
            Key::Escape => {
                if self.minigame.is_live() {
                    self.with_listeners(|minigame, scene, steering, listeners| {
                        minigame.exit(scene, steering, listeners, now_ms);
                    });
                } else if self.steering.is_enabled() {
                    self.steering.set_enabled(false);
                    self.steering.reset_position(now_ms);
                }
            }
        }
    }

    pub fn key_up(&mut self, key: Key) {
        match key {
            Key::Left => self.steering.on_input_up(SteerKey::Left),
            Key::Right => self.steering.on_input_up(SteerKey::Right),
            Key::Enter | Key::Escape => {}
        }
    }

    pub fn update(&mut self, now_ms: f64) {
        self.loading.poll(now_ms);
        if !self.wired {
            if !self.warned_unwired {
                log::warn!("Game updated before wire(), skipping frame");
                self.warned_unwired = true;
            }
            return;
        }

        let delta = self.clock.tick(now_ms);

        // The car moves first so collisions see this frame's position.
        self.steering.update(&mut self.scene, delta, now_ms);
        self.environment
            .follow(&mut self.scene, self.steering.position(), self.steering.roll());
        self.environment.update(&mut self.scene, delta);
        self.scroll.update();
        self.palms.update(&mut self.scene, &self.models, now_ms);
        self.rocks.update(&mut self.scene, &self.models, now_ms);

        self.with_listeners(|minigame, scene, steering, listeners| {
            minigame.update(scene, steering, listeners, now_ms);
        });
    }

    pub fn set_palm_density(&mut self, multiplier: f64) {
        self.palms.set_density(multiplier);
    }

    pub fn set_rock_density(&mut self, multiplier: f64) {
        self.rocks.set_density(multiplier);
    }

    pub fn set_palm_visibility(&mut self, show_main: bool, show_wireframe: bool) {
        self.palms.update_visibility(&mut self.scene, show_main, show_wireframe);
    }

    pub fn set_rock_visibility(&mut self, show_main: bool, show_wireframe: bool) {
        self.rocks.update_visibility(&mut self.scene, show_main, show_wireframe);
    }

    pub fn set_wheel_visibility(&mut self, show_main: bool, show_wireframe: bool) {
        self.environment.set_visibility(&mut self.scene, show_main, show_wireframe);
    }

    /// Splits the game into the minigame, the pieces it drives and every
    /// subsystem that follows the speed multiplier.
    fn with_listeners<R>(
        &mut self,
        f: impl FnOnce(&mut MinigameEngine, &mut SceneGraph, &mut SteeringModel, &mut [&mut dyn SpeedListener]) -> R,
    ) -> R {
        let Game { scene, steering, environment, scroll, palms, rocks, minigame, .. } = self;
        let mut listeners: [&mut dyn SpeedListener; 4] = [environment, scroll, palms, rocks];
        f(minigame, scene, steering, &mut listeners)
    }
}
