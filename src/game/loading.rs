const BAR_WIDTH: usize = 20;
/// Loading counts as done once this share of the items has settled.
const ENOUGH: f64 = 0.75;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    AllLoaded,
    MostLoaded,
    TimedOut,
}

/// Tracks asset loading for the loader screen and forces completion after
/// a hard timeout so a missing asset can never block the game.
#[derive(Debug)]
pub struct LoadingTracker {
    total: usize,
    settled: usize,
    failed: usize,
    started_ms: f64,
    timeout_ms: f64,
    status: String,
    completion: Option<Completion>,
}

impl LoadingTracker {
    pub fn new(started_ms: f64, timeout_ms: f64) -> Self {
        LoadingTracker {
            total: 0,
            settled: 0,
            failed: 0,
            started_ms,
            timeout_ms,
            status: "INITIALIZING".to_string(),
            completion: None,
        }
    }

    pub fn expect(&mut self, count: usize) {
        self.total = self.total.max(count);
    }

    pub fn item_loaded(&mut self, description: &str) {
        self.settled += 1;
        self.status = format!("LOADING: {}", description.to_uppercase());
        self.check();
    }

    /// A failed item still settles, the game carries on without it.
    pub fn item_failed(&mut self, description: &str) {
        self.failed += 1;
        self.item_loaded(description);
    }

    /// Forces completion once the timeout has elapsed.
    pub fn poll(&mut self, now_ms: f64) {
        if self.completion.is_none() && now_ms - self.started_ms >= self.timeout_ms {
            log::warn!("Loading timeout reached, forcing completion");
            self.finish(Completion::TimedOut);
        }
    }

    pub fn completion(&self) -> Option<Completion> {
        self.completion
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn percentage(&self) -> u32 {
        if self.is_complete() {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        ((self.settled * 100 / self.total) as u32).min(100)
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Terminal-style progress line, e.g. `LOADING: [==========          ] 50%`.
    pub fn progress_bar(&self) -> String {
        let pct = self.percentage() as usize;
        let filled = pct * BAR_WIDTH / 100;
        format!("LOADING: [{}{}] {}%", "=".repeat(filled), " ".repeat(BAR_WIDTH - filled), pct)
    }

    fn check(&mut self) {
        if self.completion.is_some() || self.total == 0 {
            return;
        }
        if self.settled >= self.total {
            self.finish(Completion::AllLoaded);
        } else if self.settled as f64 / self.total as f64 > ENOUGH {
            self.finish(Completion::MostLoaded);
        }
    }

    fn finish(&mut self, completion: Completion) {
        self.status = "SYSTEM READY!".to_string();
        self.completion = Some(completion);
        log::info!("Loading complete ({:?})", completion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_past_three_quarters() {
        let mut loading = LoadingTracker::new(0.0, 8000.0);
        loading.expect(5);
        for name in ["polonez", "wheel", "palm"] {
            loading.item_loaded(name);
        }
        assert!(!loading.is_complete());
        assert_eq!(loading.progress_bar(), "LOADING: [============        ] 60%");
        loading.item_failed("rockmd");
        assert_eq!(loading.completion(), Some(Completion::MostLoaded));
        assert_eq!(loading.percentage(), 100);
        assert_eq!(loading.failed(), 1);
    }

    #[test]
    fn all_loaded() {
        let mut loading = LoadingTracker::new(0.0, 8000.0);
        loading.expect(1);
        loading.item_loaded("palm");
        assert_eq!(loading.completion(), Some(Completion::AllLoaded));
        assert_eq!(loading.status(), "SYSTEM READY!");
    }

    #[test]
    fn timeout_forces_completion() {
        let mut loading = LoadingTracker::new(100.0, 8000.0);
        loading.expect(5);
        loading.poll(8099.0);
        assert!(!loading.is_complete());
        loading.poll(8100.0);
        assert_eq!(loading.completion(), Some(Completion::TimedOut));
    }
}
