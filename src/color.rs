//! RGB color value type and the distance metrics used for grouping balls.

use std::fmt;

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Neutral gray used whenever a color cannot be recovered.
pub const PLACEHOLDER_COLOR: Color = Color::new(128, 128, 128);

/// An 8-bit RGB triple. Hashable so it can key color groups directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels.
    pub fn brightness(&self) -> f32 {
        (self.r as f32 + self.g as f32 + self.b as f32) / 3.0
    }

    /// Spread between the strongest and weakest channel. Near zero for grays.
    pub fn channel_spread(&self) -> u8 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        max - min
    }

    pub fn manhattan_distance(&self, other: &Color) -> u32 {
        self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32
    }

    pub fn euclidean_distance(&self, other: &Color) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Channel-wise rounded mean of `colors`, `None` when empty.
    pub fn average<'a>(colors: impl IntoIterator<Item = &'a Color>) -> Option<Color> {
        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for c in colors {
            sum[0] += c.r as u64;
            sum[1] += c.g as u64;
            sum[2] += c.b as u64;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let mean = |s: u64| ((s as f64 / count as f64).round()).clamp(0.0, 255.0) as u8;
        Some(Color::new(mean(sum[0]), mean(sum[1]), mean(sum[2])))
    }
}

impl From<[u8; 3]> for Color {
    fn from(v: [u8; 3]) -> Self {
        Color::new(v[0], v[1], v[2])
    }
}

impl From<Color> for [u8; 3] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b]
    }
}

impl From<Rgb<u8>> for Color {
    fn from(px: Rgb<u8>) -> Self {
        Color::new(px.0[0], px.0[1], px.0[2])
    }
}

impl From<Color> for Rgb<u8> {
    fn from(c: Color) -> Self {
        Rgb([c.r, c.g, c.b])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Clamp a user supplied grouping tolerance into the accepted range.
pub fn clamp_tolerance(tolerance: u32) -> u32 {
    tolerance.clamp(MIN_TOLERANCE, MAX_TOLERANCE)
}

pub const MIN_TOLERANCE: u32 = 10;
pub const MAX_TOLERANCE: u32 = 100;

/// Two colors are similar when their Manhattan distance is strictly below `tolerance`.
pub fn colors_similar(a: &Color, b: &Color, tolerance: u32) -> bool {
    a.manhattan_distance(b) < tolerance
}

/// Readable color label derived from simple channel dominance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorName {
    BrightRed,
    Red,
    DarkRed,
    BrightGreen,
    Green,
    DarkGreen,
    BrightBlue,
    Blue,
    DarkBlue,
    Yellow,
    Magenta,
    Cyan,
    Gray,
}

impl ColorName {
    pub fn of(color: &Color) -> Self {
        let Color { r, g, b } = *color;
        let shade = |v: u8, bright, normal, dark| {
            if v > 200 {
                bright
            } else if v > 150 {
                normal
            } else {
                dark
            }
        };

        if r > g && r > b {
            shade(r, ColorName::BrightRed, ColorName::Red, ColorName::DarkRed)
        } else if g > r && g > b {
            shade(g, ColorName::BrightGreen, ColorName::Green, ColorName::DarkGreen)
        } else if b > r && b > g {
            shade(b, ColorName::BrightBlue, ColorName::Blue, ColorName::DarkBlue)
        } else if r > 150 && g > 150 {
            ColorName::Yellow
        } else if r > 150 && b > 150 {
            ColorName::Magenta
        } else if g > 150 && b > 150 {
            ColorName::Cyan
        } else {
            ColorName::Gray
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorName::BrightRed => "bright red",
            ColorName::Red => "red",
            ColorName::DarkRed => "dark red",
            ColorName::BrightGreen => "bright green",
            ColorName::Green => "green",
            ColorName::DarkGreen => "dark green",
            ColorName::BrightBlue => "bright blue",
            ColorName::Blue => "blue",
            ColorName::DarkBlue => "dark blue",
            ColorName::Yellow => "yellow",
            ColorName::Magenta => "magenta",
            ColorName::Cyan => "cyan",
            ColorName::Gray => "gray",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
