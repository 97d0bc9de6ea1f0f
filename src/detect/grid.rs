//! Projects four picked corners into a regular tube/level sampling grid.

use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_BALL_RADIUS, DEFAULT_BALLS_PER_TUBE, DEFAULT_GRID_SPACING, DEFAULT_TUBE_COUNT,
    GridDefaults, MIN_BALL_RADIUS, MIN_GRID_SPACING,
};

pub const CORNER_COUNT: usize = 4;

/// Pixel coordinate in source-image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Errors raised for parameter values that can only come from a caller bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("ball radius must not be negative, got {0}")]
    NegativeRadius(i32),
    #[error("tube count must be at least 1")]
    ZeroTubes,
    #[error("balls per tube must be at least 1")]
    ZeroBallsPerTube,
}

/// One projected sample location tagged with its logical (tube, level) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSamplePoint {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub tube_index: usize,
    pub ball_index: usize,
}

/// Corners sorted into their quadrilateral roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Quad {
    /// Sort on (y, x), split into the top and bottom pairs, then order each pair by x.
    pub fn from_corners(corners: [Point; CORNER_COUNT]) -> Self {
        let mut points = corners;
        points.sort_by_key(|p| (p.y, p.x));
        let (mut top, mut bottom) = ([points[0], points[1]], [points[2], points[3]]);
        top.sort_by_key(|p| p.x);
        bottom.sort_by_key(|p| p.x);
        Self {
            top_left: top[0],
            top_right: top[1],
            bottom_left: bottom[0],
            bottom_right: bottom[1],
        }
    }

    /// Bilinear blend: `fx` runs along the tubes, `fy` from top edge to bottom edge.
    pub fn interpolate(&self, fx: f64, fy: f64) -> Point {
        let lerp = |a: Point, b: Point, t: f64| {
            (
                a.x as f64 * (1.0 - t) + b.x as f64 * t,
                a.y as f64 * (1.0 - t) + b.y as f64 * t,
            )
        };
        let (top_x, top_y) = lerp(self.top_left, self.top_right, fx);
        let (bottom_x, bottom_y) = lerp(self.bottom_left, self.bottom_right, fx);
        Point {
            x: (top_x * (1.0 - fy) + bottom_x * fy) as i32,
            y: (top_y * (1.0 - fy) + bottom_y * fy) as i32,
        }
    }
}

/// Holds the corner selection and layout parameters of one acquisition and
/// turns them into a [`GridSamplePoint`] list.
#[derive(Debug, Clone)]
pub struct GridProjector {
    corners: Vec<Point>,
    ball_radius: i32,
    tube_count: usize,
    balls_per_tube: usize,
    grid_spacing: u32,
}

impl Default for GridProjector {
    fn default() -> Self {
        Self {
            corners: Vec::with_capacity(CORNER_COUNT),
            ball_radius: DEFAULT_BALL_RADIUS,
            tube_count: DEFAULT_TUBE_COUNT,
            balls_per_tube: DEFAULT_BALLS_PER_TUBE,
            grid_spacing: DEFAULT_GRID_SPACING,
        }
    }
}

impl GridProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defaults(defaults: &GridDefaults) -> Result<Self, GridError> {
        let mut projector = Self::default();
        projector.set_ball_radius(defaults.ball_radius)?;
        projector.set_tube_parameters(defaults.tube_count, defaults.balls_per_tube)?;
        projector.set_grid_spacing(defaults.grid_spacing);
        Ok(projector)
    }

    /// Replaces the corner set. Anything other than exactly four points is refused.
    pub fn set_corner_points(&mut self, points: &[Point]) -> bool {
        if points.len() != CORNER_COUNT {
            return false;
        }
        self.corners = points.to_vec();
        true
    }

    pub fn add_corner_point(&mut self, point: Point) -> bool {
        if self.corners.len() >= CORNER_COUNT {
            return false;
        }
        self.corners.push(point);
        true
    }

    pub fn remove_corner_point(&mut self, index: usize) -> bool {
        if index >= self.corners.len() {
            return false;
        }
        self.corners.remove(index);
        true
    }

    pub fn clear_corner_points(&mut self) {
        self.corners.clear();
    }

    pub fn corner_points(&self) -> &[Point] {
        &self.corners
    }

    pub fn is_ready(&self) -> bool {
        self.corners.len() == CORNER_COUNT
    }

    /// Radii below the minimum are raised to it; negative radii are a caller bug.
    pub fn set_ball_radius(&mut self, radius: i32) -> Result<(), GridError> {
        if radius < 0 {
            return Err(GridError::NegativeRadius(radius));
        }
        self.ball_radius = radius.max(MIN_BALL_RADIUS);
        Ok(())
    }

    pub fn ball_radius(&self) -> i32 {
        self.ball_radius
    }

    pub fn set_tube_parameters(
        &mut self,
        tube_count: usize,
        balls_per_tube: usize,
    ) -> Result<(), GridError> {
        if tube_count == 0 {
            return Err(GridError::ZeroTubes);
        }
        if balls_per_tube == 0 {
            return Err(GridError::ZeroBallsPerTube);
        }
        self.tube_count = tube_count;
        self.balls_per_tube = balls_per_tube;
        Ok(())
    }

    pub fn tube_parameters(&self) -> (usize, usize) {
        (self.tube_count, self.balls_per_tube)
    }

    /// Spacing is carried for display only; it does not affect projection.
    pub fn set_grid_spacing(&mut self, spacing: u32) {
        self.grid_spacing = spacing.max(MIN_GRID_SPACING);
    }

    pub fn grid_spacing(&self) -> u32 {
        self.grid_spacing
    }

    pub fn expected_ball_count(&self) -> usize {
        self.tube_count * self.balls_per_tube
    }

    /// Builds the tube-major sample grid, or an empty list while fewer than
    /// four corners are set.
    pub fn generate(&self) -> Vec<GridSamplePoint> {
        let Ok(corners) = <[Point; CORNER_COUNT]>::try_from(self.corners.as_slice()) else {
            return Vec::new();
        };
        project_grid(
            Quad::from_corners(corners),
            self.ball_radius,
            self.tube_count,
            self.balls_per_tube,
        )
    }
}

/// Projects `tube_count x balls_per_tube` sample points over `quad`.
///
/// A count of one collapses the corresponding axis onto the top (or left) edge.
/// The radius is raised to the minimum ball radius like [`GridProjector::set_ball_radius`].
pub fn project_grid(
    quad: Quad,
    radius: i32,
    tube_count: usize,
    balls_per_tube: usize,
) -> Vec<GridSamplePoint> {
    let radius = radius.max(MIN_BALL_RADIUS);
    let steps_x = tube_count.saturating_sub(1).max(1) as f64;
    let steps_y = balls_per_tube.saturating_sub(1).max(1) as f64;

    let mut out = Vec::with_capacity(tube_count * balls_per_tube);
    for tube_index in 0..tube_count {
        let fx = tube_index as f64 / steps_x;
        for ball_index in 0..balls_per_tube {
            let fy = ball_index as f64 / steps_y;
            let p = quad.interpolate(fx, fy);
            out.push(GridSamplePoint {
                x: p.x,
                y: p.y,
                radius,
                tube_index,
                ball_index,
            });
        }
    }
    log::debug!(
        "projected {} grid points ({tube_count} tubes x {balls_per_tube} levels)",
        out.len()
    );
    out
}
