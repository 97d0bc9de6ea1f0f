//! Tube and ball model rebuilt from grouped detections.
//!
//! The model is a read-only reconstruction: tubes are filled once by
//! [`GameModelBuilder`] and never lose balls afterwards.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::color::{Color, ColorName};
use crate::detect::grid::Point;
use crate::detect::grouping::ColorGroups;
use crate::multi_row::AggregatedResults;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameModelError {
    #[error("tube capacity must be at least 1")]
    ZeroCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ball {
    pub color: Color,
    pub color_name: ColorName,
    pub position: Point,
    pub tube_index: usize,
    /// 0 is the bottom of the tube.
    pub level_index: usize,
}

impl Ball {
    pub fn new(color: Color, position: Point, tube_index: usize, level_index: usize) -> Self {
        Self {
            color,
            color_name: ColorName::of(&color),
            position,
            tube_index,
            level_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tube {
    index: usize,
    capacity: usize,
    is_empty: bool,
    balls: Vec<Ball>,
}

impl Tube {
    pub fn new(index: usize, capacity: usize, is_empty: bool) -> Self {
        Self {
            index,
            capacity,
            is_empty,
            balls: Vec::with_capacity(capacity),
        }
    }

    /// Appends `ball` on top, re-addressing it to this tube. Refused when full.
    pub fn add_ball(&mut self, mut ball: Ball) -> bool {
        if self.balls.len() >= self.capacity {
            return false;
        }
        ball.tube_index = self.index;
        ball.level_index = self.balls.len();
        self.balls.push(ball);
        true
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the tube was configured as one of the extra empty tubes.
    pub fn is_empty_flag(&self) -> bool {
        self.is_empty
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    pub fn top_ball(&self) -> Option<&Ball> {
        self.balls.last()
    }

    pub fn available_space(&self) -> usize {
        self.capacity - self.balls.len()
    }

    /// All balls share one color. True for an empty tube.
    pub fn is_pure(&self) -> bool {
        match self.balls.first() {
            Some(first) => self.balls.iter().all(|b| b.color == first.color),
            None => true,
        }
    }

    /// Full and of a single color.
    pub fn is_complete(&self) -> bool {
        !self.balls.is_empty() && self.balls.len() == self.capacity && self.is_pure()
    }

    pub fn snapshot(&self) -> TubeSnapshot {
        TubeSnapshot {
            index: self.index,
            capacity: self.capacity,
            is_empty: self.is_empty,
            ball_count: self.ball_count(),
            balls: self.balls.clone(),
            is_complete: self.is_complete(),
            is_pure: self.is_pure(),
            available_space: self.available_space(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorStatistics {
    pub color: Color,
    pub color_name: ColorName,
    pub count: usize,
    pub positions: Vec<Point>,
    pub tubes: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionStatus {
    pub complete_tubes: usize,
    pub pure_tubes: usize,
    pub empty_tubes: usize,
    pub total_tubes: usize,
    pub completion_percentage: f64,
}

/// Detected total against what the grid parameters promised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BallCountCheck {
    pub actual: usize,
    pub expected: usize,
}

impl BallCountCheck {
    pub fn matches(&self) -> bool {
        self.actual == self.expected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    tubes_with_balls: usize,
    empty_tubes: usize,
    balls_per_tube: usize,
    tubes: Vec<Tube>,
}

impl GameState {
    pub fn tubes_with_balls(&self) -> usize {
        self.tubes_with_balls
    }

    pub fn empty_tubes(&self) -> usize {
        self.empty_tubes
    }

    pub fn balls_per_tube(&self) -> usize {
        self.balls_per_tube
    }

    pub fn total_tubes(&self) -> usize {
        self.tubes.len()
    }

    pub fn tubes(&self) -> &[Tube] {
        &self.tubes
    }

    pub fn tube(&self, index: usize) -> Option<&Tube> {
        self.tubes.get(index)
    }

    pub fn total_balls(&self) -> usize {
        self.tubes.iter().map(Tube::ball_count).sum()
    }

    /// Per exact color, in order of first appearance walking the tubes.
    pub fn color_statistics(&self) -> Vec<ColorStatistics> {
        let mut stats: Vec<(ColorStatistics, BTreeSet<usize>)> = Vec::new();
        for ball in self.tubes.iter().flat_map(|t| t.balls.iter()) {
            let idx = match stats.iter().position(|(s, _)| s.color == ball.color) {
                Some(i) => i,
                None => {
                    stats.push((
                        ColorStatistics {
                            color: ball.color,
                            color_name: ball.color_name,
                            count: 0,
                            positions: Vec::new(),
                            tubes: Vec::new(),
                        },
                        BTreeSet::new(),
                    ));
                    stats.len() - 1
                }
            };
            let (entry, tubes) = &mut stats[idx];
            entry.count += 1;
            entry.positions.push(ball.position);
            tubes.insert(ball.tube_index);
        }
        stats
            .into_iter()
            .map(|(mut s, tubes)| {
                s.tubes = tubes.into_iter().collect();
                s
            })
            .collect()
    }

    pub fn completion_status(&self) -> CompletionStatus {
        let complete_tubes = self.tubes.iter().filter(|t| t.is_complete()).count();
        let pure_tubes = self.tubes.iter().filter(|t| t.is_pure()).count();
        let empty_tubes = self.tubes.iter().filter(|t| t.ball_count() == 0).count();
        let non_empty = self.tubes.len() - empty_tubes;
        CompletionStatus {
            complete_tubes,
            pure_tubes,
            empty_tubes,
            total_tubes: self.tubes.len(),
            completion_percentage: complete_tubes as f64 / non_empty.max(1) as f64 * 100.0,
        }
    }

    pub fn ball_count_check(&self, expected: usize) -> BallCountCheck {
        BallCountCheck {
            actual: self.total_balls(),
            expected,
        }
    }

    /// Plain nested view with every derived value filled in, ready to serialize.
    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            tubes_with_balls: self.tubes_with_balls,
            empty_tubes: self.empty_tubes,
            balls_per_tube: self.balls_per_tube,
            total_tubes: self.total_tubes(),
            total_balls: self.total_balls(),
            tubes: self.tubes.iter().map(Tube::snapshot).collect(),
            color_statistics: self.color_statistics(),
            completion_status: self.completion_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TubeSnapshot {
    pub index: usize,
    pub capacity: usize,
    pub is_empty: bool,
    pub ball_count: usize,
    pub balls: Vec<Ball>,
    pub is_complete: bool,
    pub is_pure: bool,
    pub available_space: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStateSnapshot {
    pub tubes_with_balls: usize,
    pub empty_tubes: usize,
    pub balls_per_tube: usize,
    pub total_tubes: usize,
    pub total_balls: usize,
    pub tubes: Vec<TubeSnapshot>,
    pub color_statistics: Vec<ColorStatistics>,
    pub completion_status: CompletionStatus,
}

/// A ball as handed to the builder: where it was seen and which tube it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallPlacement {
    pub position: Point,
    pub tube_index: usize,
}

/// Color groups plus an optional explicit count of ball-bearing tubes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInput {
    pub groups: Vec<(Color, Vec<BallPlacement>)>,
    pub tubes_with_balls: Option<usize>,
}

impl ModelInput {
    /// Single-row input; the tube count is inferred from the balls.
    pub fn from_groups(groups: &ColorGroups) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|g| {
                    let placements = g
                        .balls
                        .iter()
                        .map(|b| BallPlacement {
                            position: Point::new(b.x, b.y),
                            tube_index: b.tube_index(),
                        })
                        .collect();
                    (g.color, placements)
                })
                .collect(),
            tubes_with_balls: None,
        }
    }

    /// Multi-row input from the per-row view. Each row's tube indices are
    /// shifted by its offset so rows occupy consecutive tube ranges.
    pub fn from_aggregated(results: &AggregatedResults) -> Self {
        Self {
            groups: results
                .colors_by_row
                .iter()
                .map(|entry| {
                    let placements = entry
                        .balls
                        .iter()
                        .map(|b| BallPlacement {
                            position: Point::new(b.x, b.y),
                            tube_index: entry.tube_offset + b.tube_index(),
                        })
                        .collect();
                    (entry.key.color, placements)
                })
                .collect(),
            tubes_with_balls: Some(results.total_tubes),
        }
    }

    /// Number of distinct tube indices among all placements.
    pub fn distinct_tube_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|(_, balls)| balls.iter().map(|b| b.tube_index))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Builds a [`GameState`] from grouped detections. Performs no solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameModelBuilder {
    empty_tube_count: usize,
    balls_per_tube: usize,
}

impl GameModelBuilder {
    pub fn new(empty_tube_count: usize, balls_per_tube: usize) -> Result<Self, GameModelError> {
        if balls_per_tube == 0 {
            return Err(GameModelError::ZeroCapacity);
        }
        Ok(Self {
            empty_tube_count,
            balls_per_tube,
        })
    }

    /// Ball-bearing tubes come first, then the empty ones. Balls are appended
    /// in input order; those aimed at a missing or full tube are dropped.
    pub fn build(&self, input: &ModelInput) -> GameState {
        let tubes_with_balls = input
            .tubes_with_balls
            .unwrap_or_else(|| input.distinct_tube_count());
        let total = tubes_with_balls + self.empty_tube_count;

        let mut tubes: Vec<Tube> = (0..total)
            .map(|i| Tube::new(i, self.balls_per_tube, i >= tubes_with_balls))
            .collect();

        let mut dropped = 0usize;
        for (color, placements) in &input.groups {
            for placement in placements {
                let ball = Ball::new(*color, placement.position, placement.tube_index, 0);
                let added = tubes
                    .get_mut(placement.tube_index)
                    .is_some_and(|tube| tube.add_ball(ball));
                if !added {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            log::warn!("{dropped} balls did not fit their tube and were dropped");
        }

        GameState {
            tubes_with_balls,
            empty_tubes: self.empty_tube_count,
            balls_per_tube: self.balls_per_tube,
            tubes,
        }
    }
}
