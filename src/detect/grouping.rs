use serde::Serialize;

use crate::color::{Color, clamp_tolerance, colors_similar};
use crate::config::DEFAULT_COLOR_TOLERANCE;
use crate::detect::sampler::DetectedBall;

/// Balls sharing a representative color. The key is the exact color of the
/// ball that opened the group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorGroup {
    pub color: Color,
    pub balls: Vec<DetectedBall>,
}

/// Insertion-ordered mapping from representative color to member balls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorGroups {
    groups: Vec<ColorGroup>,
}

impl ColorGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorGroup> {
        self.groups.iter()
    }

    pub fn get(&self, color: &Color) -> Option<&[DetectedBall]> {
        self.groups
            .iter()
            .find(|g| g.color == *color)
            .map(|g| g.balls.as_slice())
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.groups.iter().map(|g| g.color)
    }

    pub fn total_balls(&self) -> usize {
        self.groups.iter().map(|g| g.balls.len()).sum()
    }

    /// Per-color counts and shares, largest group first.
    pub fn summary(&self) -> AnalysisSummary {
        let total_balls = self.total_balls();
        let mut color_distribution: Vec<ColorShare> = self
            .groups
            .iter()
            .map(|g| ColorShare {
                color: g.color,
                count: g.balls.len(),
                percentage: if total_balls > 0 {
                    g.balls.len() as f64 / total_balls as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        color_distribution.sort_by(|a, b| b.count.cmp(&a.count));
        AnalysisSummary {
            total_balls,
            unique_colors: self.groups.len(),
            color_distribution,
        }
    }

    fn push(&mut self, color: Color, ball: DetectedBall) {
        match self.groups.iter_mut().find(|g| g.color == color) {
            Some(group) => group.balls.push(ball),
            None => self.groups.push(ColorGroup { color, balls: vec![ball] }),
        }
    }
}

impl<'a> IntoIterator for &'a ColorGroups {
    type Item = &'a ColorGroup;
    type IntoIter = std::slice::Iter<'a, ColorGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorShare {
    pub color: Color,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub total_balls: usize,
    pub unique_colors: usize,
    pub color_distribution: Vec<ColorShare>,
}

/// First-fit color bucketing under a Manhattan tolerance.
///
/// Each ball joins the first existing group whose key is within tolerance of
/// its color, otherwise it opens a new group keyed by its own color. Group
/// membership is anchored to the key only, so the result depends on the
/// order of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorGrouper {
    tolerance: u32,
}

impl Default for ColorGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR_TOLERANCE)
    }
}

impl ColorGrouper {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance: clamp_tolerance(tolerance),
        }
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: u32) {
        self.tolerance = clamp_tolerance(tolerance);
    }

    pub fn colors_similar(&self, a: &Color, b: &Color) -> bool {
        colors_similar(a, b, self.tolerance)
    }

    pub fn group(&self, balls: &[DetectedBall]) -> ColorGroups {
        let mut groups = ColorGroups::new();
        for ball in balls {
            let key = groups
                .colors()
                .find(|existing| self.colors_similar(&ball.color, existing))
                .unwrap_or(ball.color);
            groups.push(key, *ball);
        }
        log::debug!(
            "grouped {} balls into {} colors (tolerance {})",
            balls.len(),
            groups.len(),
            self.tolerance
        );
        groups
    }
}
