//! Central ticker for entities that slide along the travel axis.
//!
//! Each live animation is plain data; its position is recomputed from the
//! elapsed time on every tick, and cancelling it is removing it from the list.

use crate::engine::models::NodePair;
use crate::engine::scene::{NodeId, Scene};

/// Linear trip along z from `near_z` to `far_z`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Travel {
    pub start_ms: f64,
    pub duration_ms: f64,
    pub near_z: f32,
    pub far_z: f32,
}

impl Travel {
    pub fn new(start_ms: f64, duration_ms: f64, near_z: f32, far_z: f32) -> Self {
        Travel { start_ms, duration_ms, near_z, far_z }
    }

    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn z_at(&self, now_ms: f64) -> f32 {
        self.near_z + self.progress(now_ms) * (self.far_z - self.near_z)
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}

/// Scene handles an animation moves and finally removes.
pub trait Handle {
    fn place(&self, scene: &mut dyn Scene, z: f32);
    fn remove(&self, scene: &mut dyn Scene);
}

impl Handle for NodeId {
    fn place(&self, scene: &mut dyn Scene, z: f32) {
        if let Some(t) = scene.transform_mut(*self) {
            t.position.z = z;
        }
    }

    fn remove(&self, scene: &mut dyn Scene) {
        scene.remove_node(*self);
    }
}

impl Handle for NodePair {
    fn place(&self, scene: &mut dyn Scene, z: f32) {
        self.visual.place(scene, z);
        self.sync(scene);
    }

    fn remove(&self, scene: &mut dyn Scene) {
        NodePair::remove(self, scene);
    }
}

pub struct Animation<H, T> {
    pub handle: H,
    pub travel: Travel,
    pub z: f32,
    pub state: T,
}

pub struct Animator<H, T = ()> {
    live: Vec<Animation<H, T>>,
}

impl<H, T> Default for Animator<H, T> {
    fn default() -> Self {
        Animator { live: Vec::new() }
    }
}

impl<H: Handle, T> Animator<H, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, scene: &mut dyn Scene, handle: H, travel: Travel, state: T) {
        let z = travel.z_at(travel.start_ms);
        handle.place(scene, z);
        self.live.push(Animation { handle, travel, z, state });
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation<H, T>> {
        self.live.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Animation<H, T>> {
        self.live.iter_mut()
    }

    /// Moves every live entity to where it should be at `now_ms`.
    pub fn advance(&mut self, scene: &mut dyn Scene, now_ms: f64) {
        for anim in &mut self.live {
            anim.z = anim.travel.z_at(now_ms);
            anim.handle.place(scene, anim.z);
        }
    }

    /// Removes entities that reached the far bound. Returns how many left.
    pub fn sweep(&mut self, scene: &mut dyn Scene, now_ms: f64) -> usize {
        let before = self.live.len();
        self.live.retain(|anim| {
            if anim.travel.is_finished(now_ms) {
                anim.handle.remove(scene);
                false
            } else {
                true
            }
        });
        before - self.live.len()
    }

    pub fn step(&mut self, scene: &mut dyn Scene, now_ms: f64) -> usize {
        self.advance(scene, now_ms);
        self.sweep(scene, now_ms)
    }

    /// Cancels everything in flight and removes it from the scene.
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        for anim in self.live.drain(..) {
            anim.handle.remove(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::{Node, NodeShape, SceneGraph, Transform};
    use nalgebra::Vector3;

    fn add_box(scene: &mut SceneGraph) -> NodeId {
        scene.add_node(Node::new(
            NodeShape::Cuboid { size: Vector3::new(2.0, 2.0, 2.0) },
            Transform::default(),
            (1.0, 1.0, 0.0),
        ))
    }

    #[test]
    fn position_is_a_function_of_elapsed_time() {
        let travel = Travel::new(1000.0, 6000.0, -90.0, 110.0);
        assert_eq!(travel.z_at(1000.0), -90.0);
        assert!(travel.z_at(1000.0 + 6000.0 * 0.45).abs() < 1e-3);
        assert_eq!(travel.z_at(7000.0), 110.0);
        assert_eq!(travel.z_at(99_000.0), 110.0);
    }

    #[test]
    fn finished_entities_leave_the_scene() {
        let mut scene = SceneGraph::new();
        let mut animator: Animator<NodeId> = Animator::new();
        let id = add_box(&mut scene);
        animator.spawn(&mut scene, id, Travel::new(0.0, 100.0, -100.0, 100.0), ());

        assert_eq!(animator.step(&mut scene, 50.0), 0);
        assert_eq!(scene.transform(id).unwrap().position.z, 0.0);
        assert_eq!(animator.step(&mut scene, 100.0), 1);
        assert!(animator.is_empty());
        assert!(!scene.contains(id));
    }

    #[test]
    fn clear_cancels_in_flight_entities() {
        let mut scene = SceneGraph::new();
        let mut animator: Animator<NodeId> = Animator::new();
        for _ in 0..3 {
            let id = add_box(&mut scene);
            animator.spawn(&mut scene, id, Travel::new(0.0, 100.0, -100.0, 100.0), ());
        }
        animator.clear(&mut scene);
        assert!(animator.is_empty());
        assert!(scene.is_empty());
    }
}
