//! State of one acquisition pass: source image, crop, corners, grid and the
//! color analysis run over it.

use image::RgbImage;

use crate::config::{ReaderConfig, SamplerConfig};
use crate::detect::grid::{GridError, GridProjector, GridSamplePoint, Point};
use crate::detect::grouping::{AnalysisSummary, ColorGrouper, ColorGroups};
use crate::detect::sampler::{DetectedBall, analyze_grid};
use crate::image_ops::{self, CropRect};

/// Threads the pipeline state explicitly between projection, sampling and
/// grouping. Each step replaces its output rather than mutating it.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionSession {
    source: Option<RgbImage>,
    cropped: Option<RgbImage>,
    projector: GridProjector,
    grouper: ColorGrouper,
    sampler: SamplerConfig,
    grid: Vec<GridSamplePoint>,
    detected: Vec<DetectedBall>,
    groups: ColorGroups,
    analyzed: bool,
}

impl AcquisitionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ReaderConfig) -> Result<Self, GridError> {
        Ok(Self {
            projector: GridProjector::from_defaults(&config.grid)?,
            grouper: ColorGrouper::new(config.color_tolerance),
            sampler: config.sampler.clone(),
            ..Self::default()
        })
    }

    /// Installs a new source image and discards everything derived from the previous one.
    pub fn set_image(&mut self, image: RgbImage) {
        self.source = Some(image);
        self.cropped = None;
        self.invalidate_grid();
    }

    pub fn source_image(&self) -> Option<&RgbImage> {
        self.source.as_ref()
    }

    /// Crops the source image. Returns false when there is no image or the
    /// rectangle is empty after clamping.
    pub fn crop(&mut self, rect: CropRect) -> bool {
        let Some(cropped) = self.source.as_ref().and_then(|img| image_ops::crop(img, rect)) else {
            return false;
        };
        self.cropped = Some(cropped);
        self.projector.clear_corner_points();
        self.invalidate_grid();
        true
    }

    pub fn cropped_image(&self) -> Option<&RgbImage> {
        self.cropped.as_ref()
    }

    /// Image the grid is sampled from: the crop when present, else the source.
    pub fn working_image(&self) -> Option<&RgbImage> {
        self.cropped.as_ref().or(self.source.as_ref())
    }

    pub fn projector(&self) -> &GridProjector {
        &self.projector
    }

    // Corner and parameter edits drop the grid and analysis built from the old values.

    pub fn add_corner(&mut self, point: Point) -> bool {
        let added = self.projector.add_corner_point(point);
        if added {
            self.invalidate_grid();
        }
        added
    }

    pub fn remove_corner(&mut self, index: usize) -> bool {
        let removed = self.projector.remove_corner_point(index);
        if removed {
            self.invalidate_grid();
        }
        removed
    }

    pub fn set_corners(&mut self, points: &[Point]) -> bool {
        let unchanged = self.projector.corner_points() == points;
        let accepted = self.projector.set_corner_points(points);
        if accepted && !unchanged {
            self.invalidate_grid();
        }
        accepted
    }

    pub fn clear_corners(&mut self) {
        self.projector.clear_corner_points();
        self.invalidate_grid();
    }

    pub fn corners(&self) -> &[Point] {
        self.projector.corner_points()
    }

    pub fn set_ball_radius(&mut self, radius: i32) -> Result<(), GridError> {
        let before = self.projector.ball_radius();
        self.projector.set_ball_radius(radius)?;
        if self.projector.ball_radius() != before {
            self.invalidate_grid();
        }
        Ok(())
    }

    pub fn set_tube_parameters(
        &mut self,
        tube_count: usize,
        balls_per_tube: usize,
    ) -> Result<(), GridError> {
        let before = self.projector.tube_parameters();
        self.projector.set_tube_parameters(tube_count, balls_per_tube)?;
        if self.projector.tube_parameters() != before {
            self.invalidate_grid();
        }
        Ok(())
    }

    pub fn set_tolerance(&mut self, tolerance: u32) {
        self.grouper.set_tolerance(tolerance);
    }

    pub fn tolerance(&self) -> u32 {
        self.grouper.tolerance()
    }

    pub fn is_ready_for_grid(&self) -> bool {
        self.projector.is_ready()
    }

    pub fn expected_ball_count(&self) -> usize {
        self.projector.expected_ball_count()
    }

    /// Regenerates the sample grid from the current corners and parameters.
    /// Empty while fewer than four corners are set.
    pub fn generate_grid(&mut self) -> &[GridSamplePoint] {
        self.grid = self.projector.generate();
        self.detected.clear();
        self.groups = ColorGroups::new();
        self.analyzed = false;
        &self.grid
    }

    pub fn grid(&self) -> &[GridSamplePoint] {
        &self.grid
    }

    /// Samples and groups the current grid. Yields empty groups when there is
    /// no image or no grid yet.
    pub fn analyze_colors(&mut self) -> &ColorGroups {
        let Some(image) = self.cropped.as_ref().or(self.source.as_ref()) else {
            log::debug!("color analysis skipped: no image loaded");
            return &self.groups;
        };
        if self.grid.is_empty() {
            log::debug!("color analysis skipped: no grid generated");
            return &self.groups;
        }
        self.detected = analyze_grid(image, &self.grid, &self.sampler);
        self.groups = self.grouper.group(&self.detected);
        self.analyzed = true;
        &self.groups
    }

    /// Whether the current grid has been sampled, even if nothing was found.
    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    pub fn detected_balls(&self) -> &[DetectedBall] {
        &self.detected
    }

    pub fn color_groups(&self) -> &ColorGroups {
        &self.groups
    }

    pub fn analysis_summary(&self) -> AnalysisSummary {
        self.groups.summary()
    }

    /// Copy of the working image with the sample grid drawn on it.
    pub fn overlay_image(&self) -> Option<RgbImage> {
        self.working_image()
            .map(|img| image_ops::draw_grid_overlay(img, &self.grid))
    }

    fn invalidate_grid(&mut self) {
        self.grid.clear();
        self.detected.clear();
        self.groups = ColorGroups::new();
        self.analyzed = false;
    }
}
