use crate::engine::timing::Timeout;

/// What the central minigame overlay currently shows.
#[derive(Clone, Debug, PartialEq)]
pub enum Overlay {
    Hidden,
    Countdown(u32),
    Start,
    Score(u32),
    GameOver(u32),
}

/// Plain HUD state. The browser shell mirrors it into the DOM every frame.
#[derive(Debug)]
pub struct Hud {
    overlay: Overlay,
    instructions_visible: bool,
    escape_hint_visible: bool,
    gui_visible: bool,
    game_over_until: Option<Timeout>,
}

impl Default for Hud {
    fn default() -> Self {
        Hud {
            overlay: Overlay::Hidden,
            instructions_visible: true,
            escape_hint_visible: false,
            gui_visible: true,
            game_over_until: None,
        }
    }
}

impl Hud {
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn instructions_visible(&self) -> bool {
        self.instructions_visible
    }

    pub fn escape_hint_visible(&self) -> bool {
        self.escape_hint_visible
    }

    pub fn gui_visible(&self) -> bool {
        self.gui_visible
    }

    pub fn begin_session(&mut self, countdown: u32) {
        self.game_over_until = None;
        self.gui_visible = false;
        self.instructions_visible = false;
        self.escape_hint_visible = true;
        self.overlay = Overlay::Countdown(countdown);
    }

    pub fn show_countdown(&mut self, value: u32) {
        self.overlay = Overlay::Countdown(value);
    }

    pub fn show_start(&mut self) {
        self.overlay = Overlay::Start;
    }

    pub fn show_score(&mut self, score: u32) {
        self.overlay = Overlay::Score(score);
    }

    /// Shows the final score until `now_ms + duration_ms`, then idles.
    pub fn show_game_over(&mut self, score: u32, now_ms: f64, duration_ms: f64) {
        self.end_session();
        self.instructions_visible = false;
        self.overlay = Overlay::GameOver(score);
        self.game_over_until = Some(Timeout::new(now_ms, duration_ms));
    }

    pub fn show_idle(&mut self) {
        self.end_session();
        self.overlay = Overlay::Hidden;
        self.instructions_visible = true;
    }

    pub fn update(&mut self, now_ms: f64) {
        if self.game_over_until.is_some_and(|t| t.is_due(now_ms)) {
            self.game_over_until = None;
            self.overlay = Overlay::Hidden;
            self.instructions_visible = true;
        }
    }

    /// Text for the overlay element, `None` when it is hidden.
    pub fn overlay_text(&self) -> Option<String> {
        match &self.overlay {
            Overlay::Hidden => None,
            Overlay::Countdown(n) => Some(n.to_string()),
            Overlay::Start => Some("START!".to_string()),
            Overlay::Score(score) => Some(format!("SCORE: {}", score)),
            Overlay::GameOver(score) => Some(format!("GAME OVER<br><span>SCORE: {}</span>", score)),
        }
    }

    fn end_session(&mut self) {
        self.game_over_until = None;
        self.gui_visible = true;
        self.escape_hint_visible = false;
    }
}
