use crate::game::speed::SpeedListener;

pub type Rgb = (f32, f32, f32);

/// Parses `#rrggbb` into normalized RGB.
pub fn hex(code: &str) -> Option<Rgb> {
    let digits = code.strip_prefix('#').unwrap_or(code);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Named colors of the synthwave look.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub pink: Rgb,
    pub violet: Rgb,
    pub aqua: Rgb,
    pub blue: Rgb,
    pub yellow: Rgb,
    pub red: Rgb,
    pub tweety: Rgb,
    pub laguna: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        let c = |code: &str| hex(code).unwrap_or((1.0, 1.0, 1.0));
        Palette {
            pink: c("#c348dd"),
            violet: c("#4f33d9"),
            aqua: c("#40d5db"),
            blue: c("#4790ff"),
            yellow: c("#ffebac"),
            red: c("#fc3b96"),
            tweety: c("#ffdf7c"),
            laguna: c("#3b8ceb"),
        }
    }
}

const BASE_SCROLL: f32 = 0.06;

/// Offset of the scrolling road and terrain grids.
#[derive(Debug)]
pub struct TextureScroll {
    offset: f32,
    speed: f64,
}

impl Default for TextureScroll {
    fn default() -> Self {
        TextureScroll { offset: 0.0, speed: 1.0 }
    }
}

impl TextureScroll {
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn step_size(&self) -> f32 {
        BASE_SCROLL * self.speed as f32
    }

    /// Advances the grids by one frame. Wrapped to keep precision.
    pub fn update(&mut self) {
        self.offset = (self.offset + self.step_size()).rem_euclid(1.0);
    }
}

impl SpeedListener for TextureScroll {
    fn set_speed(&mut self, multiplier: f64) {
        self.speed = multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_codes() {
        assert_eq!(hex("#ff0000"), Some((1.0, 0.0, 0.0)));
        assert_eq!(hex("00ff00"), Some((0.0, 1.0, 0.0)));
        assert_eq!(hex("#fff"), None);
        assert_eq!(hex("#gg0000"), None);
    }

    #[test]
    fn scroll_step_follows_speed() {
        let mut scroll = TextureScroll::default();
        scroll.update();
        assert!((scroll.offset() - 0.06).abs() < 1e-6);

        scroll.set_speed(1.3);
        assert!((scroll.step_size() - 0.078).abs() < 1e-6);
        scroll.set_speed(1.0);
        assert!((scroll.step_size() - BASE_SCROLL).abs() < 1e-7);
    }

    #[test]
    fn offset_wraps() {
        let mut scroll = TextureScroll::default();
        for _ in 0..100 {
            scroll.update();
        }
        assert!((0.0..1.0).contains(&scroll.offset()));
    }
}
