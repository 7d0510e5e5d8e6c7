use crate::engine::models::{ModelLibrary, NodePair};
use crate::engine::scene::{Scene, Transform};
use crate::engine::timing::IntervalTimer;
use crate::game::animator::{Animator, Travel};
use crate::game::config::SpawnConfig;
use crate::game::speed::SpeedListener;
use rand::rngs::SmallRng;
use rand::Rng;
use std::f32::consts::TAU;

pub const MIN_DENSITY: f64 = 0.1;
pub const MAX_DENSITY: f64 = 2.0;

/// Where and how a scheduler places its decorations.
#[derive(Clone, Debug)]
pub enum Placement {
    /// One palm on each side of the road per spawn.
    RoadSides { model: String, side_x: f32 },
    /// A single rock somewhere in the fields beside the road.
    Fields {
        variants: Vec<String>,
        fallback: String,
        inner_x: f32,
        outer_x: f32,
        min_scale: f32,
        max_scale: f32,
        /// Number of interleaved spawn timers.
        streams: u32,
    },
}

impl Placement {
    pub fn palms() -> Self {
        Placement::RoadSides { model: "palm".to_string(), side_x: 11.0 }
    }

    pub fn rocks() -> Self {
        Placement::Fields {
            variants: vec!["rockmd".to_string(), "rocksm".to_string()],
            fallback: "rockmd".to_string(),
            inner_x: 16.0,
            outer_x: 80.0,
            min_scale: 1.0,
            max_scale: 4.0,
            streams: 2,
        }
    }

    fn streams(&self) -> u32 {
        match self {
            Placement::RoadSides { .. } => 1,
            Placement::Fields { streams, .. } => (*streams).max(1),
        }
    }

    /// Whether enough models are loaded for spawning to make sense.
    fn is_ready(&self, models: &ModelLibrary) -> bool {
        match self {
            Placement::RoadSides { model, .. } => models.contains(model),
            Placement::Fields { variants, fallback, .. } => {
                models.contains(fallback) || variants.iter().any(|v| models.contains(v))
            }
        }
    }
}

/// Periodically spawns decorative model pairs that scroll past the car.
pub struct SpawnScheduler {
    name: &'static str,
    config: SpawnConfig,
    placement: Placement,
    speed: f64,
    density: f64,
    show_main: bool,
    show_wireframe: bool,
    running: bool,
    timers: Vec<IntervalTimer>,
    clock_ms: f64,
    animator: Animator<NodePair>,
    rng: SmallRng,
}

impl SpawnScheduler {
    pub fn new(name: &'static str, config: SpawnConfig, placement: Placement, rng: SmallRng) -> Self {
        SpawnScheduler {
            name,
            config,
            placement,
            speed: 1.0,
            density: 1.0,
            show_main: true,
            show_wireframe: true,
            running: false,
            timers: Vec::new(),
            clock_ms: 0.0,
            animator: Animator::new(),
            rng,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn live_count(&self) -> usize {
        self.animator.len()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn interval_ms(&self) -> f64 {
        let scaled = self.config.base_interval_ms / (self.speed * self.density);
        scaled.max(self.config.min_interval_ms)
    }

    pub fn travel_duration_ms(&self) -> f64 {
        self.config.travel_duration_ms / self.speed
    }

    pub fn live(&self) -> impl Iterator<Item = (&NodePair, &Travel)> {
        self.animator.iter().map(|a| (&a.handle, &a.travel))
    }

    /// Begins spawning once the required models are loaded.
    pub fn start(&mut self, models: &ModelLibrary, now_ms: f64) {
        if !self.placement.is_ready(models) {
            log::error!("Cannot start {} spawning - model not loaded", self.name);
            return;
        }
        log::info!("Starting {} spawning", self.name);
        self.running = true;
        self.clock_ms = now_ms;
        self.restart_timers();
    }

    pub fn set_density(&mut self, multiplier: f64) {
        self.density = multiplier.clamp(MIN_DENSITY, MAX_DENSITY);
        self.restart_timers();
    }

    pub fn update_visibility(&mut self, scene: &mut dyn Scene, show_main: bool, show_wireframe: bool) {
        self.show_main = show_main;
        self.show_wireframe = show_wireframe;
        for anim in self.animator.iter() {
            anim.handle.set_visibility(scene, show_main, show_wireframe);
        }
    }

    pub fn update(&mut self, scene: &mut dyn Scene, models: &ModelLibrary, now_ms: f64) {
        self.clock_ms = now_ms;
        if self.running {
            let fired: u32 = self.timers.iter_mut().map(|t| t.poll(now_ms)).sum();
            if fired > 0 {
                self.spawn(scene, models, now_ms);
            }
            // Missed periods after a stalled frame are dropped, not replayed.
            if fired > 1 {
                self.restart_timers();
            }
        }
        self.animator.step(scene, now_ms);
    }

    /// Drops the pending cadence and starts over from the current clock.
    /// Entities already on the road keep their own timing.
    fn restart_timers(&mut self) {
        if !self.running {
            return;
        }
        let interval = self.interval_ms();
        let streams = self.placement.streams();
        self.timers = (0..streams)
            .map(|i| {
                let offset = interval * i as f64 / streams as f64;
                IntervalTimer::with_offset(self.clock_ms, interval, offset)
            })
            .collect();
    }

    fn spawn(&mut self, scene: &mut dyn Scene, models: &ModelLibrary, now_ms: f64) {
        let near_z = self.config.near_z;
        match self.placement.clone() {
            Placement::RoadSides { model, side_x } => {
                for x in [-side_x, side_x] {
                    let mut transform = Transform::at(x, 0.0, near_z);
                    transform.rotation.y = self.rng.gen_range(0.0..TAU);
                    self.spawn_one(scene, models, &model, transform, now_ms);
                }
            }
            Placement::Fields { variants, fallback, inner_x, outer_x, min_scale, max_scale, .. } => {
                let offset = self.rng.gen_range(0.0..outer_x - inner_x);
                let x = if self.rng.gen_bool(0.5) { -outer_x + offset } else { inner_x + offset };
                let mut transform = Transform::at(x, 0.0, near_z);
                transform.rotation.y = self.rng.gen_range(0.0..TAU);
                transform.scale *= self.rng.gen_range(min_scale..max_scale);

                let chosen = &variants[self.rng.gen_range(0..variants.len())];
                let key = if models.contains(chosen) {
                    chosen
                } else if models.contains(&fallback) {
                    &fallback
                } else {
                    log::debug!("No rock variant loaded, skipping spawn");
                    return;
                };
                self.spawn_one(scene, models, key, transform, now_ms);
            }
        }
    }

    fn spawn_one(&mut self, scene: &mut dyn Scene, models: &ModelLibrary, key: &str, transform: Transform, now_ms: f64) {
        let Some(pair) = models.create_pair(scene, key, transform) else {
            return;
        };
        pair.set_visibility(scene, self.show_main, self.show_wireframe);

        let travel = Travel::new(now_ms, self.travel_duration_ms(), self.config.near_z, self.config.far_z);
        self.animator.spawn(scene, pair, travel, ());
    }
}

impl SpeedListener for SpawnScheduler {
    fn set_speed(&mut self, multiplier: f64) {
        self.speed = multiplier;
        self.restart_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::Mesh;
    use crate::engine::models::Model;
    use crate::engine::scene::SceneGraph;
    use rand::SeedableRng;

    fn library(keys: &[&str]) -> ModelLibrary {
        let mut models = ModelLibrary::new();
        for key in keys {
            models.insert(key, Model::new(Mesh::cube(1.0, 1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (0.5, 0.5, 0.5)));
        }
        models
    }

    fn palms() -> SpawnScheduler {
        SpawnScheduler::new("palm", SpawnConfig::default(), Placement::palms(), SmallRng::seed_from_u64(7))
    }

    fn rocks() -> SpawnScheduler {
        SpawnScheduler::new("rock", SpawnConfig::default(), Placement::rocks(), SmallRng::seed_from_u64(7))
    }

    #[test]
    fn interval_scales_with_speed_and_density_down_to_the_floor() {
        let mut palms = palms();
        assert_eq!(palms.interval_ms(), 1500.0);
        palms.set_speed(1.5);
        assert_eq!(palms.interval_ms(), 1000.0);
        palms.set_density(2.0);
        assert_eq!(palms.interval_ms(), 500.0);
        palms.set_density(5.0);
        assert_eq!(palms.density(), MAX_DENSITY);
        palms.set_density(0.5);
        assert_eq!(palms.interval_ms(), 2000.0);
    }

    #[test]
    fn speed_round_trip_restores_base_timing() {
        let mut palms = palms();
        for m in [1.15, 1.3, 1.45, 2.2] {
            palms.set_speed(m);
        }
        palms.set_speed(1.0);
        assert_eq!(palms.interval_ms(), 1500.0);
        assert_eq!(palms.travel_duration_ms(), 14000.0);
    }

    #[test]
    fn does_not_start_without_its_model() {
        let models = library(&[]);
        let mut scene = SceneGraph::new();
        let mut palms = palms();
        palms.start(&models, 0.0);
        palms.update(&mut scene, &models, 5000.0);
        assert!(!palms.is_running());
        assert!(scene.is_empty());
    }

    #[test]
    fn palms_spawn_in_pairs_on_both_sides_and_despawn_at_the_far_bound() {
        let models = library(&["palm"]);
        let mut scene = SceneGraph::new();
        let mut palms = palms();
        palms.start(&models, 0.0);

        palms.update(&mut scene, &models, 1500.0);
        assert_eq!(palms.live_count(), 2);
        // Visual plus wireframe for each palm.
        assert_eq!(scene.len(), 4);
        let mut xs: Vec<f32> = palms
            .live()
            .map(|(pair, _)| scene.transform(pair.visual).unwrap().position.x)
            .collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![-11.0, 11.0]);

        palms.set_density(0.1);
        palms.update(&mut scene, &models, 1500.0 + 14000.0);
        assert_eq!(palms.live_count(), 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn speed_change_does_not_touch_entities_in_flight() {
        let models = library(&["palm"]);
        let mut scene = SceneGraph::new();
        let mut palms = palms();
        palms.start(&models, 0.0);
        palms.update(&mut scene, &models, 1500.0);

        palms.set_speed(2.0);
        for (_, travel) in palms.live() {
            assert_eq!(travel.duration_ms, 14000.0);
        }
        palms.update(&mut scene, &models, 1500.0 + 750.0);
        let durations: Vec<f64> = palms.live().map(|(_, t)| t.duration_ms).collect();
        assert!(durations.contains(&7000.0));
        assert!(durations.contains(&14000.0));
    }

    #[test]
    fn rocks_use_two_interleaved_streams() {
        let models = library(&["rockmd", "rocksm"]);
        let mut scene = SceneGraph::new();
        let mut rocks = rocks();
        rocks.start(&models, 0.0);

        rocks.update(&mut scene, &models, 1500.0);
        assert_eq!(rocks.live_count(), 1);
        rocks.update(&mut scene, &models, 2250.0);
        assert_eq!(rocks.live_count(), 2);
        rocks.update(&mut scene, &models, 3000.0);
        assert_eq!(rocks.live_count(), 3);
    }

    #[test]
    fn stalled_frames_spawn_once_and_keep_the_cadence() {
        let models = library(&["palm"]);
        let mut scene = SceneGraph::new();
        let mut palms = palms();
        palms.start(&models, 0.0);

        palms.update(&mut scene, &models, 16.0);
        palms.update(&mut scene, &models, 60_016.0);
        assert_eq!(palms.live_count(), 2);

        palms.update(&mut scene, &models, 61_515.0);
        assert_eq!(palms.live_count(), 2);
        palms.update(&mut scene, &models, 61_516.0);
        assert_eq!(palms.live_count(), 4);

        let models = library(&["rockmd", "rocksm"]);
        let mut rocks = rocks();
        rocks.start(&models, 0.0);
        rocks.update(&mut scene, &models, 60_000.0);
        assert_eq!(rocks.live_count(), 1);
        rocks.update(&mut scene, &models, 60_750.0);
        assert_eq!(rocks.live_count(), 1);
        rocks.update(&mut scene, &models, 61_500.0);
        assert_eq!(rocks.live_count(), 2);
        rocks.update(&mut scene, &models, 62_250.0);
        assert_eq!(rocks.live_count(), 3);
    }

    #[test]
    fn rocks_stay_in_the_fields_and_fall_back_to_the_default_variant() {
        let models = library(&["rockmd"]);
        let mut scene = SceneGraph::new();
        let mut rocks = rocks();
        rocks.start(&models, 0.0);
        for i in 1..=20 {
            rocks.update(&mut scene, &models, 750.0 * i as f64);
        }
        assert_eq!(rocks.live_count(), 19);
        for (pair, _) in rocks.live() {
            let node = scene.node(pair.visual).unwrap();
            let x = node.transform.position.x.abs();
            assert!((16.0..=80.0).contains(&x), "x = {}", x);
            let s = node.transform.scale.x;
            assert!((1.0..=4.0).contains(&s));
            assert!(matches!(&node.shape, crate::engine::scene::NodeShape::Model { key, .. } if key == "rockmd"));
        }
    }

    #[test]
    fn visibility_applies_to_live_and_future_entities() {
        let models = library(&["palm"]);
        let mut scene = SceneGraph::new();
        let mut palms = palms();
        palms.start(&models, 0.0);
        palms.update(&mut scene, &models, 1500.0);
        palms.update_visibility(&mut scene, false, true);
        palms.update(&mut scene, &models, 3000.0);

        for (pair, _) in palms.live() {
            assert!(!scene.node(pair.visual).unwrap().visible);
            assert!(scene.node(pair.wireframe).unwrap().visible);
        }
    }
}
