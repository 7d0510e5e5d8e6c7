//! Frame clock, cooperative timers and tweens.
//!
//! Nothing here reads the wall clock: every call receives the frame
//! timestamp in milliseconds, so the whole simulation is replayable.

use nalgebra::Vector3;

pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Turns successive frame timestamps into delta seconds.
pub struct FrameClock {
    last_ms: Option<f64>,
    max_delta_secs: f32,
}

impl FrameClock {
    pub fn new(max_delta_secs: f32) -> Self {
        FrameClock { last_ms: None, max_delta_secs }
    }

    /// Returns the seconds elapsed since the previous tick. A tab that was in
    /// the background would otherwise produce one huge step.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let delta = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        delta.clamp(0.0, self.max_delta_secs)
    }
}

/// Shortest period a repeating timer accepts.
pub const MIN_PERIOD_MS: f64 = 1.0;

/// Repeating timer polled by the ticker. Equivalent of `setInterval`, with
/// an optional initial offset.
#[derive(Clone, Debug)]
pub struct IntervalTimer {
    period_ms: f64,
    next_fire_ms: f64,
}

impl IntervalTimer {
    pub fn new(now_ms: f64, period_ms: f64) -> Self {
        Self::with_offset(now_ms, period_ms, 0.0)
    }

    pub fn with_offset(now_ms: f64, period_ms: f64, offset_ms: f64) -> Self {
        let period_ms = period_ms.max(MIN_PERIOD_MS);
        IntervalTimer {
            period_ms,
            next_fire_ms: now_ms + offset_ms + period_ms,
        }
    }

    /// Number of times the timer fired since the last poll.
    pub fn poll(&mut self, now_ms: f64) -> u32 {
        let mut fired = 0;
        while now_ms >= self.next_fire_ms {
            fired += 1;
            self.next_fire_ms += self.period_ms;
        }
        fired
    }
}

/// One-shot timer, the `setTimeout` counterpart.
#[derive(Clone, Copy, Debug)]
pub struct Timeout {
    due_ms: f64,
}

impl Timeout {
    pub fn new(now_ms: f64, delay_ms: f64) -> Self {
        Timeout { due_ms: now_ms + delay_ms }
    }

    pub fn is_due(&self, now_ms: f64) -> bool {
        now_ms >= self.due_ms
    }
}

/// Cubic ease-in-out interpolation between two points.
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    from: Vector3<f32>,
    to: Vector3<f32>,
    start_ms: f64,
    duration_ms: f64,
}

impl Tween {
    pub fn new(from: Vector3<f32>, to: Vector3<f32>, start_ms: f64, duration_ms: f64) -> Self {
        Tween { from, to, start_ms, duration_ms }
    }

    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn sample(&self, now_ms: f64) -> Vector3<f32> {
        let progress = self.progress(now_ms);
        if progress >= 1.0 {
            return self.to;
        }
        let eased = ease_in_out_cubic(progress);
        self.from + (self.to - self.from) * eased
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_hits_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
    }

    #[test]
    fn first_tick_has_no_delta_and_long_gaps_are_clamped() {
        let mut clock = FrameClock::new(0.1);
        assert_eq!(clock.tick(1000.0), 0.0);
        assert!((clock.tick(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.tick(9000.0), 0.1);
    }

    #[test]
    fn interval_fires_once_per_period_including_catch_up() {
        let mut timer = IntervalTimer::new(0.0, 1000.0);
        assert_eq!(timer.poll(999.0), 0);
        assert_eq!(timer.poll(1000.0), 1);
        assert_eq!(timer.poll(3500.0), 2);
    }

    #[test]
    fn zero_period_is_raised_to_the_minimum() {
        let mut timer = IntervalTimer::new(0.0, 0.0);
        assert_eq!(timer.poll(0.5), 0);
        assert_eq!(timer.poll(10.0), 10);
    }

    #[test]
    fn offset_interval_is_shifted() {
        let mut timer = IntervalTimer::with_offset(0.0, 1000.0, 500.0);
        assert_eq!(timer.poll(1000.0), 0);
        assert_eq!(timer.poll(1500.0), 1);
    }

    #[test]
    fn tween_reaches_target_exactly() {
        let tween = Tween::new(Vector3::new(0.0, 1.975, 7.0), Vector3::new(0.0, 4.0, 7.0), 100.0, 1000.0);
        assert_eq!(tween.sample(100.0), Vector3::new(0.0, 1.975, 7.0));
        assert!(!tween.is_finished(1099.0));
        assert_eq!(tween.sample(1100.0), Vector3::new(0.0, 4.0, 7.0));
        assert!(tween.is_finished(1100.0));
    }
}
