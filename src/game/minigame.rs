//! The "dodge the box" minigame.
//!
//! `Idle -> Countdown(3..0) -> Active -> Ending -> Idle`. Obstacles come in
//! batches down alternating lanes; every one that passes the car scores a
//! point and every `points_per_tier` points the whole world speeds up.

use crate::engine::scene::{Aabb, Node, NodeId, NodeShape, Scene, Transform};
use crate::engine::timing::{IntervalTimer, Timeout};
use crate::game::animator::{Animator, Travel};
use crate::game::camera::CameraRig;
use crate::game::config::{CameraConfig, MinigameConfig};
use crate::game::hud::{Hud, Overlay};
use crate::game::speed::{multiplier_for_score, SpeedCoordinator, SpeedListener};
use crate::game::steering::SteeringModel;
use nalgebra::Vector3;
use rand::rngs::SmallRng;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Countdown(u32),
    Active,
    Ending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    Collision,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lane {
    Left,
    Right,
}

impl Lane {
    fn sign(self) -> f32 {
        match self {
            Lane::Left => -1.0,
            Lane::Right => 1.0,
        }
    }

    fn other(self) -> Self {
        match self {
            Lane::Left => Lane::Right,
            Lane::Right => Lane::Left,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Obstacle {
    pub x: f32,
    pub scored: bool,
    /// Left over from a session that was exited. Still drawn, never scores
    /// or collides.
    pub inert: bool,
}

pub struct MinigameEngine {
    config: MinigameConfig,
    phase: Phase,
    score: u32,
    countdown: Option<IntervalTimer>,
    spawning: bool,
    next_batch: Option<Timeout>,
    next_lane: Lane,
    obstacles: Animator<NodeId, Obstacle>,
    speed: SpeedCoordinator,
    camera: CameraRig,
    hud: Hud,
    rng: SmallRng,
}

impl MinigameEngine {
    pub fn new(config: MinigameConfig, camera: CameraConfig, rng: SmallRng) -> Self {
        MinigameEngine {
            config,
            phase: Phase::Idle,
            score: 0,
            countdown: None,
            spawning: false,
            next_batch: None,
            next_lane: Lane::Left,
            obstacles: Animator::new(),
            speed: SpeedCoordinator::default(),
            camera: CameraRig::new(camera),
            hud: Hud::default(),
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn multiplier(&self) -> f64 {
        self.speed.multiplier()
    }

    /// A session is live from the first countdown tick until it ends.
    pub fn is_live(&self) -> bool {
        matches!(self.phase, Phase::Countdown(_) | Phase::Active)
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (&NodeId, &Obstacle)> {
        self.obstacles.iter().map(|a| (&a.handle, &a.state))
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn start(
        &mut self,
        steering: &mut SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        now_ms: f64,
    ) -> bool {
        if self.is_live() {
            return false;
        }
        log::info!("Minigame starting");
        self.phase = Phase::Countdown(self.config.countdown_from);
        self.score = 0;
        self.spawning = false;
        self.next_batch = None;
        self.next_lane = Lane::Left;
        self.publish(1.0, listeners, now_ms);

        steering.set_steering_lock(true);
        self.camera.to_game_view(now_ms);
        self.hud.begin_session(self.config.countdown_from);

        self.countdown = Some(IntervalTimer::new(now_ms, self.config.countdown_step_ms));
        if self.config.countdown_from <= self.config.spawn_at_countdown {
            self.start_spawning(now_ms);
        }
        true
    }

    /// Ends the session cleanly. Only honored once the countdown is over.
    pub fn exit(
        &mut self,
        scene: &mut dyn Scene,
        steering: &mut SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        now_ms: f64,
    ) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.end(scene, steering, listeners, EndReason::Exit, now_ms);
        true
    }

    /// Advances one frame. Call after the car has moved for this frame.
    pub fn update(
        &mut self,
        scene: &mut dyn Scene,
        steering: &mut SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        now_ms: f64,
    ) {
        self.camera.update(now_ms);
        self.hud.update(now_ms);

        let ticks = self.countdown.as_mut().map_or(0, |timer| timer.poll(now_ms));
        for _ in 0..ticks {
            self.tick_countdown(steering, listeners, now_ms);
        }

        if self.spawning && self.next_batch.is_some_and(|t| t.is_due(now_ms)) {
            self.spawn_batch(scene, steering, now_ms);
            self.schedule_next_batch(now_ms);
        }

        self.obstacles.advance(scene, now_ms);
        if self.is_live() {
            if let Some(reason) = self.check_obstacles(steering, listeners, now_ms) {
                self.end(scene, steering, listeners, reason, now_ms);
            }
        }
        self.obstacles.sweep(scene, now_ms);

        if self.phase == Phase::Ending
            && !self.camera.is_moving()
            && !matches!(self.hud.overlay(), Overlay::GameOver(_))
        {
            self.phase = Phase::Idle;
        }
    }

    /// Puts one box on the road at lateral position `x`.
    pub fn spawn_obstacle(&mut self, scene: &mut dyn Scene, x: f32, now_ms: f64) -> NodeId {
        let size = self.config.box_size;
        let node = scene.add_node(Node::new(
            NodeShape::Cuboid { size: Vector3::repeat(size) },
            Transform::at(x, size / 2.0, self.config.near_z),
            self.config.box_color,
        ));
        let duration = self.config.travel_duration_ms / self.speed.multiplier();
        let travel = Travel::new(now_ms, duration, self.config.near_z, self.config.far_z);
        self.obstacles.spawn(scene, node, travel, Obstacle { x, scored: false, inert: false });
        node
    }

    fn tick_countdown(
        &mut self,
        steering: &mut SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        now_ms: f64,
    ) {
        match self.phase {
            Phase::Countdown(0) => {
                self.phase = Phase::Active;
                self.countdown = None;
                self.hud.show_score(self.score);
                let multiplier = self.tier_multiplier();
                self.publish(multiplier, listeners, now_ms);
            }
            Phase::Countdown(n) => {
                let n = n - 1;
                self.phase = Phase::Countdown(n);
                if n > 0 {
                    self.hud.show_countdown(n);
                } else {
                    self.hud.show_start();
                    steering.set_steering_lock(false);
                }
                if n <= self.config.spawn_at_countdown && !self.spawning {
                    self.start_spawning(now_ms);
                }
            }
            _ => {}
        }
    }

    fn start_spawning(&mut self, now_ms: f64) {
        self.spawning = true;
        self.schedule_next_batch(now_ms);
    }

    fn schedule_next_batch(&mut self, now_ms: f64) {
        let (min, max) = (self.config.min_spawn_interval_ms, self.config.max_spawn_interval_ms);
        let delay = if max > min { self.rng.gen_range(min..=max) } else { min };
        self.next_batch = Some(Timeout::new(now_ms, delay / self.speed.multiplier()));
    }

    fn spawn_batch(&mut self, scene: &mut dyn Scene, steering: &SteeringModel, now_ms: f64) {
        let lane = self.next_lane;
        self.next_lane = lane.other();

        let count = self.rng.gen_range(1..=self.config.max_batch.max(1));
        let base = steering.initial().position.x;
        let inner = self.config.lane_inner_offset;
        let outer = steering.max_displacement();
        for _ in 0..count {
            let offset = if outer > inner { self.rng.gen_range(inner..=outer) } else { inner };
            self.spawn_obstacle(scene, base + lane.sign() * offset, now_ms);
        }
        log::debug!("Spawned {} obstacles in the {:?} lane", count, lane);
    }

    /// Collision and scoring for every live obstacle.
    fn check_obstacles(
        &mut self,
        steering: &SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        now_ms: f64,
    ) -> Option<EndReason> {
        // Without a car there is nothing to hit, boxes still score.
        let car = steering.is_attached().then(|| steering.bounds());
        let car_z = steering.position().z;
        let size = Vector3::repeat(self.config.box_size);
        let half_height = self.config.box_size / 2.0;

        let mut scored = false;
        let mut new_tier = false;
        for anim in self.obstacles.iter_mut() {
            if anim.state.inert {
                continue;
            }
            let bounds = Aabb::from_center_size(Vector3::new(anim.state.x, half_height, anim.z), size);
            if car.is_some_and(|car| bounds.intersects(&car)) {
                return Some(EndReason::Collision);
            }
            if !anim.state.scored && anim.z > car_z {
                anim.state.scored = true;
                self.score += 1;
                scored = true;
                if self.score % self.config.points_per_tier.max(1) == 0 {
                    new_tier = true;
                }
            }
        }

        if scored && self.phase == Phase::Active {
            self.hud.show_score(self.score);
        }
        if new_tier {
            let multiplier = self.tier_multiplier();
            self.publish(multiplier, listeners, now_ms);
        }
        None
    }

    fn end(
        &mut self,
        scene: &mut dyn Scene,
        steering: &mut SteeringModel,
        listeners: &mut [&mut dyn SpeedListener],
        reason: EndReason,
        now_ms: f64,
    ) {
        log::info!("Minigame ended ({:?}) with score {}", reason, self.score);
        self.phase = Phase::Ending;
        self.countdown = None;
        self.spawning = false;
        self.next_batch = None;

        match reason {
            EndReason::Collision => self.obstacles.clear(scene),
            EndReason::Exit => {
                for anim in self.obstacles.iter_mut() {
                    anim.state.inert = true;
                }
            }
        }

        self.publish(1.0, listeners, now_ms);
        self.camera.to_default_view(now_ms);
        steering.set_steering_lock(false);
        steering.reset_position(now_ms);

        match reason {
            EndReason::Collision => self.hud.show_game_over(self.score, now_ms, self.config.game_over_ms),
            EndReason::Exit => self.hud.show_idle(),
        }
    }

    fn tier_multiplier(&self) -> f64 {
        multiplier_for_score(self.score, self.config.points_per_tier, self.config.speed_per_tier)
    }

    /// Fans the multiplier out and restarts the batch cadence on change.
    fn publish(&mut self, multiplier: f64, listeners: &mut [&mut dyn SpeedListener], now_ms: f64) {
        if self.speed.publish(multiplier, listeners) && self.spawning {
            self.schedule_next_batch(now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mesh::Mesh;
    use crate::engine::models::{Model, ModelLibrary};
    use crate::engine::scene::SceneGraph;
    use crate::game::config::SteeringConfig;
    use rand::SeedableRng;

    #[derive(Default)]
    struct Probe {
        seen: Vec<f64>,
    }

    impl SpeedListener for Probe {
        fn set_speed(&mut self, multiplier: f64) {
            self.seen.push(multiplier);
        }
    }

    struct Rig {
        scene: SceneGraph,
        steering: SteeringModel,
        game: MinigameEngine,
        probe: Probe,
    }

    impl Rig {
        fn update(&mut self, now: f64) {
            self.steering.update(&mut self.scene, 1.0 / 60.0, now);
            self.game.update(&mut self.scene, &mut self.steering, &mut [&mut self.probe], now);
        }

        fn start(&mut self, now: f64) -> bool {
            self.game.start(&mut self.steering, &mut [&mut self.probe], now)
        }

        fn exit(&mut self, now: f64) -> bool {
            self.game.exit(&mut self.scene, &mut self.steering, &mut [&mut self.probe], now)
        }

        /// Runs frames at 60 Hz from `from` up to and including `to`.
        fn run(&mut self, from: f64, to: f64) {
            let mut now = from;
            while now < to {
                now = (now + 1000.0 / 60.0).min(to);
                self.update(now);
            }
        }
    }

    /// Batches are scheduled so far out that they never arrive.
    fn quiet() -> MinigameConfig {
        MinigameConfig {
            min_spawn_interval_ms: 1e9,
            max_spawn_interval_ms: 1e9,
            ..Default::default()
        }
    }

    fn rig(config: MinigameConfig) -> Rig {
        let mut models = ModelLibrary::new();
        models.insert("polonez", Model::new(Mesh::cube(1.0, 1.0, 1.0, 1.0), (0.2, 0.5, 0.9), (1.0, 0.9, 0.5)));
        let mut scene = SceneGraph::new();
        let pair = models
            .create_pair(&mut scene, "polonez", Transform::at(-0.013, 0.0, 0.0))
            .unwrap();
        let mut steering = SteeringModel::new(SteeringConfig::default());
        steering.attach(&scene, pair);
        steering.set_enabled(true);
        let game = MinigameEngine::new(config, CameraConfig::default(), SmallRng::seed_from_u64(3));
        Rig { scene, steering, game, probe: Probe::default() }
    }

    #[test]
    fn countdown_locks_then_releases_the_car() {
        let mut rig = rig(quiet());
        assert!(rig.start(0.0));
        assert_eq!(rig.game.phase(), Phase::Countdown(3));
        assert!(rig.steering.is_locked());
        assert!(!rig.game.hud().gui_visible());
        assert!(!rig.game.is_spawning());

        rig.run(0.0, 1000.0);
        assert_eq!(rig.game.phase(), Phase::Countdown(2));
        assert!(rig.game.is_spawning());
        assert_eq!(rig.game.hud().overlay(), &Overlay::Countdown(2));

        rig.run(1000.0, 3000.0);
        assert_eq!(rig.game.phase(), Phase::Countdown(0));
        assert_eq!(rig.game.hud().overlay_text().as_deref(), Some("START!"));
        assert!(!rig.steering.is_locked());

        rig.run(3000.0, 4000.0);
        assert_eq!(rig.game.phase(), Phase::Active);
        assert_eq!(rig.game.hud().overlay(), &Overlay::Score(0));
    }

    #[test]
    fn start_is_refused_while_live() {
        let mut rig = rig(quiet());
        assert!(rig.start(0.0));
        assert!(!rig.start(10.0));
        rig.run(0.0, 4000.0);
        assert!(!rig.start(4000.0));
    }

    #[test]
    fn exit_is_ignored_mid_countdown() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 1500.0);
        assert!(!rig.exit(1500.0));
        assert_eq!(rig.game.phase(), Phase::Countdown(2));
    }

    #[test]
    fn clean_exit_restores_speed_and_steering() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);
        assert!(rig.exit(4000.0));

        assert_eq!(rig.game.phase(), Phase::Ending);
        assert_eq!(rig.game.multiplier(), 1.0);
        assert_eq!(rig.probe.seen.last(), Some(&1.0));
        assert!(!rig.steering.is_locked());
        assert!(rig.steering.is_enabled());
        assert!(rig.steering.is_resetting());
        assert!(rig.game.hud().gui_visible());
        assert!(rig.game.hud().instructions_visible());
        assert!(!rig.game.is_spawning());

        rig.run(4000.0, 5000.0);
        assert_eq!(rig.game.phase(), Phase::Idle);
        assert!(rig.game.camera().orbit_enabled());
    }

    #[test]
    fn obstacle_scores_once_after_passing_the_car() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);

        rig.game.spawn_obstacle(&mut rig.scene, 10.0, 4000.0);
        rig.run(4000.0, 4000.0 + 6000.0 * 0.44);
        assert_eq!(rig.game.score(), 0);

        rig.run(4000.0 + 6000.0 * 0.44, 4000.0 + 6000.0 * 0.46);
        assert_eq!(rig.game.score(), 1);
        assert_eq!(rig.game.hud().overlay(), &Overlay::Score(1));

        rig.run(4000.0 + 6000.0 * 0.46, 10_000.0);
        assert_eq!(rig.game.score(), 1);
        assert_eq!(rig.game.obstacle_count(), 0);
    }

    #[test]
    fn collision_ends_the_session_with_the_final_score() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);

        rig.game.spawn_obstacle(&mut rig.scene, 10.0, 4000.0);
        rig.game.spawn_obstacle(&mut rig.scene, -0.013, 4500.0);
        rig.run(4000.0, 10_000.0);

        assert_eq!(rig.game.phase(), Phase::Ending);
        assert_eq!(rig.game.hud().overlay(), &Overlay::GameOver(1));
        assert_eq!(rig.game.obstacle_count(), 0);
        assert_eq!(rig.game.multiplier(), 1.0);
        assert!(!rig.scene.nodes().any(|(_, n)| matches!(n.shape, NodeShape::Cuboid { .. })));
    }

    #[test]
    fn game_over_panel_holds_before_idle() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);
        rig.game.spawn_obstacle(&mut rig.scene, -0.013, 4000.0);
        rig.run(4000.0, 7000.0);
        assert_eq!(rig.game.phase(), Phase::Ending);

        let ended = 7000.0;
        rig.run(ended, ended + 2000.0);
        assert_eq!(rig.game.phase(), Phase::Ending);
        rig.run(ended + 2000.0, ended + 4000.0);
        assert_eq!(rig.game.phase(), Phase::Idle);
    }

    #[test]
    fn every_twenty_points_speeds_everything_up() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);

        for _ in 0..20 {
            rig.game.spawn_obstacle(&mut rig.scene, 10.0, 4000.0);
        }
        rig.run(4000.0, 7000.0);
        assert_eq!(rig.game.score(), 20);
        assert!((rig.game.multiplier() - 1.15).abs() < 1e-12);
        assert!((rig.probe.seen.last().unwrap() - 1.15).abs() < 1e-12);

        rig.game.spawn_obstacle(&mut rig.scene, 10.0, 7000.0);
        let (_, travel) = rig
            .game
            .obstacles
            .iter()
            .map(|a| (a.handle, a.travel))
            .last()
            .unwrap();
        assert!((travel.duration_ms - 6000.0 / 1.15).abs() < 1e-6);
    }

    #[test]
    fn exited_obstacles_finish_their_trip_without_scoring() {
        let mut rig = rig(quiet());
        rig.start(0.0);
        rig.run(0.0, 4000.0);
        rig.game.spawn_obstacle(&mut rig.scene, -0.013, 4000.0);
        rig.run(4000.0, 5000.0);
        rig.exit(5000.0);

        assert_eq!(rig.game.obstacle_count(), 1);
        assert!(rig.game.obstacles().all(|(_, o)| o.inert));
        rig.run(5000.0, 9000.0);
        assert_eq!(rig.game.score(), 0);
        assert_eq!(rig.game.phase(), Phase::Idle);
        rig.run(9000.0, 10_001.0);
        assert_eq!(rig.game.obstacle_count(), 0);
    }

    #[test]
    fn batches_alternate_lanes_inside_the_band() {
        let mut rig = rig(MinigameConfig::default());
        let base = rig.steering.initial().position.x;
        for batch in 0..10 {
            let before = rig.game.obstacle_count();
            rig.game.spawn_batch(&mut rig.scene, &rig.steering, 0.0);
            let placed: Vec<f32> = rig.game.obstacles().skip(before).map(|(_, o)| o.x).collect();
            assert!((1..=3).contains(&placed.len()));
            for x in placed {
                let offset = x - base;
                if batch % 2 == 0 {
                    assert!((-6.0..=-0.5).contains(&offset), "offset {}", offset);
                } else {
                    assert!((0.5..=6.0).contains(&offset), "offset {}", offset);
                }
            }
        }
    }

    #[test]
    fn batches_arrive_on_their_own() {
        let mut rig = rig(MinigameConfig::default());
        rig.start(0.0);
        rig.run(0.0, 3500.0);
        assert!(rig.game.obstacle_count() >= 1);
    }
}
