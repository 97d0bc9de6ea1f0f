//! Several acquisition passes ("rows" of tubes photographed or cropped
//! separately) sharing one pipeline, and the merge of their results.

use std::fmt;

use image::RgbImage;
use serde::Serialize;

use crate::color::{Color, PLACEHOLDER_COLOR};
use crate::config::{DEFAULT_BALLS_PER_TUBE, DEFAULT_MERGE_TOLERANCE, DEFAULT_TUBE_COUNT};
use crate::detect::grid::{CORNER_COUNT, GridError, GridSamplePoint, Point};
use crate::detect::grouping::ColorGroups;
use crate::detect::sampler::DetectedBall;
use crate::session::AcquisitionSession;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultiRowError {
    #[error("at least one row is required")]
    NoRows,
}

/// Everything captured for one row.
#[derive(Debug, Clone)]
pub struct RowRecord {
    corners: Vec<Point>,
    tube_count: usize,
    balls_per_tube: usize,
    grid: Vec<GridSamplePoint>,
    colors: ColorGroups,
    completed: bool,
    cropped_image: Option<RgbImage>,
    processed_image: Option<RgbImage>,
    grid_matrix: Vec<Vec<GridSamplePoint>>,
    color_matrix: Vec<Vec<Option<Color>>>,
}

impl Default for RowRecord {
    fn default() -> Self {
        Self {
            corners: Vec::new(),
            tube_count: DEFAULT_TUBE_COUNT,
            balls_per_tube: DEFAULT_BALLS_PER_TUBE,
            grid: Vec::new(),
            colors: ColorGroups::new(),
            completed: false,
            cropped_image: None,
            processed_image: None,
            grid_matrix: Vec::new(),
            color_matrix: Vec::new(),
        }
    }
}

impl RowRecord {
    pub fn corners(&self) -> &[Point] {
        &self.corners
    }

    pub fn tube_parameters(&self) -> (usize, usize) {
        (self.tube_count, self.balls_per_tube)
    }

    pub fn grid(&self) -> &[GridSamplePoint] {
        &self.grid
    }

    pub fn colors(&self) -> &ColorGroups {
        &self.colors
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn cropped_image(&self) -> Option<&RgbImage> {
        self.cropped_image.as_ref()
    }

    pub fn processed_image(&self) -> Option<&RgbImage> {
        self.processed_image.as_ref()
    }

    /// Grid points indexed `[tube][level]`.
    pub fn grid_matrix(&self) -> &[Vec<GridSamplePoint>] {
        &self.grid_matrix
    }

    /// Detected colors indexed `[tube][level]`, `None` where nothing qualified.
    pub fn color_matrix(&self) -> &[Vec<Option<Color>>] {
        &self.color_matrix
    }

    pub fn expected_ball_count(&self) -> usize {
        self.tube_count * self.balls_per_tube
    }

    /// Enough has been captured to move on to the next row.
    pub fn is_acquired(&self) -> bool {
        self.cropped_image.is_some() && self.corners.len() == CORNER_COUNT && !self.grid.is_empty()
    }
}

/// Arranges grid points into `[tube][level]`.
pub fn build_grid_matrix(grid: &[GridSamplePoint], tube_count: usize) -> Vec<Vec<GridSamplePoint>> {
    let mut matrix = vec![Vec::new(); tube_count];
    for p in grid {
        if let Some(column) = matrix.get_mut(p.tube_index) {
            column.push(*p);
        }
    }
    matrix
}

/// Places detected colors into a `[tube][level]` matrix.
pub fn build_color_matrix(
    balls: &[DetectedBall],
    tube_count: usize,
    balls_per_tube: usize,
) -> Vec<Vec<Option<Color>>> {
    let mut matrix = vec![vec![None; balls_per_tube]; tube_count];
    for ball in balls {
        let (tube, level) = ball.grid_position;
        if let Some(cell) = matrix.get_mut(tube).and_then(|c| c.get_mut(level)) {
            *cell = Some(ball.color);
        }
    }
    matrix
}

/// Row number paired with a representative color.
///
/// Displays in the legacy `R<n>_(r, g, b)` form with a 1-based row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RowColorKey {
    /// 0-based row index.
    pub row: usize,
    pub color: Color,
}

impl RowColorKey {
    /// Reads a legacy `R<n>_(r, g, b)` key. A malformed color part yields the
    /// neutral placeholder; a malformed row part yields `None`.
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let (row_part, color_part) = text.split_once('_')?;
        let row: usize = row_part.strip_prefix('R')?.trim().parse().ok()?;
        let row = row.checked_sub(1)?;
        let color = parse_color_tuple(color_part).unwrap_or(PLACEHOLDER_COLOR);
        Some(Self { row, color })
    }
}

impl fmt::Display for RowColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}_{}", self.row + 1, self.color)
    }
}

fn parse_color_tuple(text: &str) -> Option<Color> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut channels = inner.split(',').map(|v| v.trim().parse::<u8>());
    let r = channels.next()?.ok()?;
    let g = channels.next()?.ok()?;
    let b = channels.next()?.ok()?;
    if channels.next().is_some() {
        return None;
    }
    Some(Color::new(r, g, b))
}

/// One row's unmerged color group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowColors {
    pub key: RowColorKey,
    /// Global index of this row's first tube.
    pub tube_offset: usize,
    pub balls: Vec<DetectedBall>,
}

/// Groups of all rows merged under the Euclidean merge tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedColor {
    /// Mean color of all member balls.
    pub color: Color,
    pub balls: Vec<DetectedBall>,
    /// 0-based indices of the rows contributing to this color.
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResults {
    pub total_balls: usize,
    pub total_tubes: usize,
    pub colors_by_row: Vec<RowColors>,
    pub merged_colors: Vec<MergedColor>,
    pub completed_rows: usize,
    pub total_rows: usize,
}

/// Navigation and storage for a multi-row acquisition.
#[derive(Debug, Clone)]
pub struct MultiRowManager {
    current_row: usize,
    rows: Vec<RowRecord>,
    merge_tolerance: f64,
}

impl Default for MultiRowManager {
    fn default() -> Self {
        Self {
            current_row: 0,
            rows: vec![RowRecord::default()],
            merge_tolerance: DEFAULT_MERGE_TOLERANCE,
        }
    }
}

impl MultiRowManager {
    pub fn new(num_rows: usize) -> Result<Self, MultiRowError> {
        let mut manager = Self::default();
        manager.set_num_rows(num_rows)?;
        Ok(manager)
    }

    /// Starts over with `num_rows` fresh rows.
    pub fn set_num_rows(&mut self, num_rows: usize) -> Result<(), MultiRowError> {
        if num_rows == 0 {
            return Err(MultiRowError::NoRows);
        }
        self.current_row = 0;
        self.rows = vec![RowRecord::default(); num_rows];
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_multi_row(&self) -> bool {
        self.rows.len() > 1
    }

    pub fn set_merge_tolerance(&mut self, tolerance: f64) {
        self.merge_tolerance = tolerance.max(0.0);
    }

    pub fn merge_tolerance(&self) -> f64 {
        self.merge_tolerance
    }

    /// 0-based index of the row being edited.
    pub fn current_row_index(&self) -> usize {
        self.current_row
    }

    /// 1-based number of the row being edited.
    pub fn current_row_number(&self) -> usize {
        self.current_row + 1
    }

    pub fn current_row(&self) -> &RowRecord {
        &self.rows[self.current_row]
    }

    pub fn row(&self, index: usize) -> Option<&RowRecord> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[RowRecord] {
        &self.rows
    }

    fn current_mut(&mut self) -> &mut RowRecord {
        &mut self.rows[self.current_row]
    }

    pub fn set_current_row_corners(&mut self, corners: &[Point]) {
        self.current_mut().corners = corners.to_vec();
    }

    pub fn set_current_row_tube_params(
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
        let row = self.current_mut();
        row.tube_count = tube_count;
        row.balls_per_tube = balls_per_tube;
        Ok(())
    }

    pub fn set_current_row_grid(&mut self, grid: Vec<GridSamplePoint>) {
        self.current_mut().grid = grid;
    }

    /// Stores the row's color analysis and marks the row completed.
    pub fn set_current_row_colors(&mut self, colors: ColorGroups) {
        let row = self.current_mut();
        row.colors = colors;
        row.completed = true;
    }

    pub fn set_current_row_images(
        &mut self,
        cropped: Option<RgbImage>,
        processed: Option<RgbImage>,
    ) {
        let row = self.current_mut();
        row.cropped_image = cropped;
        row.processed_image = processed;
    }

    pub fn set_current_row_matrices(
        &mut self,
        grid_matrix: Vec<Vec<GridSamplePoint>>,
        color_matrix: Vec<Vec<Option<Color>>>,
    ) {
        let row = self.current_mut();
        row.grid_matrix = grid_matrix;
        row.color_matrix = color_matrix;
    }

    /// Replaces the current row with a session's state. The row counts as
    /// completed only when the session analyzed its grid and found some color.
    pub fn record_session(&mut self, session: &AcquisitionSession) {
        let (tube_count, balls_per_tube) = session.projector().tube_parameters();
        let row = self.current_mut();
        row.corners = session.corners().to_vec();
        row.tube_count = tube_count;
        row.balls_per_tube = balls_per_tube;
        row.grid = session.grid().to_vec();
        row.cropped_image = session.cropped_image().cloned();
        row.processed_image = session.overlay_image();
        row.grid_matrix = build_grid_matrix(session.grid(), tube_count);
        row.color_matrix = build_color_matrix(session.detected_balls(), tube_count, balls_per_tube);
        row.colors = session.color_groups().clone();
        row.completed = session.is_analyzed() && !row.colors.is_empty();
    }

    pub fn can_advance(&self) -> bool {
        self.current_row().is_acquired()
    }

    /// Moves to the next row if the current one is acquired and not the last.
    pub fn advance(&mut self) -> bool {
        if self.current_row + 1 >= self.rows.len() {
            return false;
        }
        if !self.can_advance() {
            log::debug!("row {} is not acquired yet, staying", self.current_row_number());
            return false;
        }
        self.current_row += 1;
        true
    }

    pub fn retreat(&mut self) -> bool {
        if self.current_row == 0 {
            return false;
        }
        self.current_row -= 1;
        true
    }

    pub fn is_first_row(&self) -> bool {
        self.current_row == 0
    }

    pub fn is_last_row(&self) -> bool {
        self.current_row + 1 == self.rows.len()
    }

    pub fn can_finish(&self) -> bool {
        self.is_last_row() && !self.current_row().colors.is_empty()
    }

    /// `"Row i/n"`, or empty outside multi-row mode.
    pub fn progress_text(&self) -> String {
        if !self.is_multi_row() {
            return String::new();
        }
        format!("Row {}/{}", self.current_row_number(), self.rows.len())
    }

    pub fn completed_row_count(&self) -> usize {
        self.rows.iter().filter(|r| r.completed).count()
    }

    pub fn all_rows_completed(&self) -> bool {
        self.completed_row_count() == self.rows.len()
    }

    pub fn total_expected_balls(&self) -> usize {
        self.rows.iter().map(RowRecord::expected_ball_count).sum()
    }

    pub fn reset(&mut self) {
        *self = Self {
            merge_tolerance: self.merge_tolerance,
            ..Self::default()
        };
    }

    /// Collects completed rows into both the per-row view and the merged view.
    pub fn aggregated_results(&self) -> AggregatedResults {
        let mut total_balls = 0;
        let mut total_tubes = 0;
        let mut colors_by_row = Vec::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            if !row.completed {
                continue;
            }
            for group in &row.colors {
                total_balls += group.balls.len();
                colors_by_row.push(RowColors {
                    key: RowColorKey {
                        row: row_idx,
                        color: group.color,
                    },
                    tube_offset: total_tubes,
                    balls: group.balls.clone(),
                });
            }
            total_tubes += row.tube_count;
        }

        let merged_colors = merge_row_colors(&colors_by_row, self.merge_tolerance);

        AggregatedResults {
            total_balls,
            total_tubes,
            colors_by_row,
            merged_colors,
            completed_rows: self.completed_row_count(),
            total_rows: self.rows.len(),
        }
    }
}

/// Re-clusters per-row groups by Euclidean distance between representatives.
///
/// A group joins the first merged color within `tolerance`, after which that
/// color's representative becomes the mean of all its balls. Representatives
/// drift as members join, so row order affects the outcome.
pub fn merge_row_colors(colors_by_row: &[RowColors], tolerance: f64) -> Vec<MergedColor> {
    let mut merged: Vec<MergedColor> = Vec::new();
    for entry in colors_by_row {
        let target = merged
            .iter_mut()
            .find(|m| m.color.euclidean_distance(&entry.key.color) < tolerance);
        match target {
            Some(m) => {
                m.balls.extend_from_slice(&entry.balls);
                if !m.rows.contains(&entry.key.row) {
                    m.rows.push(entry.key.row);
                }
                if let Some(mean) = Color::average(m.balls.iter().map(|b| &b.color)) {
                    m.color = mean;
                }
                log::debug!("merged {} into {} (now {} balls)", entry.key, m.color, m.balls.len());
            }
            None => merged.push(MergedColor {
                color: entry.key.color,
                balls: entry.balls.clone(),
                rows: vec![entry.key.row],
            }),
        }
    }
    merged
}
