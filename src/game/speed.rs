/// Anything whose timing scales with the game speed.
///
/// Implementors must treat the multiplier as a factor on their own base
/// constants, never multiply it into their current values.
pub trait SpeedListener {
    fn set_speed(&mut self, multiplier: f64);
}

/// `1 + tier * per_tier`, where `tier = score / points_per_tier`.
pub fn multiplier_for_score(score: u32, points_per_tier: u32, per_tier: f64) -> f64 {
    let tier = score / points_per_tier.max(1);
    1.0 + tier as f64 * per_tier
}

/// Owner of the single speed multiplier. Every publish reaches all
/// subscribers before it returns.
#[derive(Debug)]
pub struct SpeedCoordinator {
    multiplier: f64,
}

impl Default for SpeedCoordinator {
    fn default() -> Self {
        SpeedCoordinator { multiplier: 1.0 }
    }
}

impl SpeedCoordinator {
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Stores and fans out `multiplier`. Returns whether it changed.
    pub fn publish(&mut self, multiplier: f64, listeners: &mut [&mut dyn SpeedListener]) -> bool {
        let changed = multiplier != self.multiplier;
        self.multiplier = multiplier;
        for listener in listeners.iter_mut() {
            listener.set_speed(multiplier);
        }
        if changed {
            log::info!("Speed multiplier now {:.2}", multiplier);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        seen: Vec<f64>,
    }

    impl SpeedListener for Probe {
        fn set_speed(&mut self, multiplier: f64) {
            self.seen.push(multiplier);
        }
    }

    #[test]
    fn tiers_step_every_twenty_points() {
        assert_eq!(multiplier_for_score(0, 20, 0.15), 1.0);
        assert_eq!(multiplier_for_score(19, 20, 0.15), 1.0);
        assert!((multiplier_for_score(39, 20, 0.15) - 1.15).abs() < 1e-12);
        assert!((multiplier_for_score(40, 20, 0.15) - 1.30).abs() < 1e-12);
    }

    #[test]
    fn publish_reaches_every_listener() {
        let mut speed = SpeedCoordinator::default();
        let mut a = Probe::default();
        let mut b = Probe::default();
        assert!(speed.publish(1.3, &mut [&mut a, &mut b]));
        assert!(!speed.publish(1.3, &mut [&mut a, &mut b]));
        assert_eq!(a.seen, vec![1.3, 1.3]);
        assert_eq!(b.seen, vec![1.3, 1.3]);
        assert_eq!(speed.multiplier(), 1.3);
    }
}
