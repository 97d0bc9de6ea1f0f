//! Samples one representative color per grid point with a filtered radial scan.

use std::collections::HashMap;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::config::SamplerConfig;
use crate::detect::grid::GridSamplePoint;

/// A grid point whose scan produced a qualifying color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedBall {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub color: Color,
    /// `(tube_index, ball_index)` of the originating grid point.
    pub grid_position: (usize, usize),
}

impl DetectedBall {
    pub fn tube_index(&self) -> usize {
        self.grid_position.0
    }

    pub fn ball_index(&self) -> usize {
        self.grid_position.1
    }
}

/// Exact-color frequency table that remembers first-seen order.
#[derive(Debug, Default)]
struct ColorHistogram {
    index: HashMap<Color, usize>,
    buckets: Vec<(Color, u32)>,
}

impl ColorHistogram {
    fn add(&mut self, color: Color) {
        match self.index.get(&color) {
            Some(&i) => self.buckets[i].1 += 1,
            None => {
                self.index.insert(color, self.buckets.len());
                self.buckets.push((color, 1));
            }
        }
    }

    /// Most frequent bucket passing `accept`; ties go to the first one scanned.
    fn dominant(&self, accept: impl Fn(&Color) -> bool) -> Option<Color> {
        let mut best: Option<(Color, u32)> = None;
        for &(color, count) in &self.buckets {
            if !accept(&color) {
                continue;
            }
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((color, count));
            }
        }
        best.map(|(color, _)| color)
    }
}

fn is_ball_color(color: &Color, config: &SamplerConfig) -> bool {
    let brightness = color.brightness();
    brightness > config.min_brightness
        && brightness < config.max_brightness
        && color.channel_spread() > config.min_channel_spread
}

/// Scans concentric rings inside the inner part of the circle and returns the
/// most frequent color that is neither gray, too dark nor too bright.
///
/// Rings are `ring_step` pixels apart. Each ring is sampled at an integer
/// degree step chosen so the sample count follows the ring circumference.
/// Pixels falling outside the image are skipped. Among equally frequent
/// candidates the one first met during the scan wins.
pub fn dominant_color_in_circle(
    image: &RgbImage,
    x: i32,
    y: i32,
    radius: i32,
    config: &SamplerConfig,
) -> Option<Color> {
    let (width, height) = image.dimensions();
    let inner_radius = (radius as f32 * config.inner_radius_fraction) as i32;
    let ring_step = config.ring_step.max(1);

    let mut histogram = ColorHistogram::default();
    for r in (0..inner_radius.max(0)).step_by(ring_step) {
        let circumference = ((2.0 * std::f64::consts::PI * r as f64) as i32).max(1);
        let angle_step = ((360.0 / circumference as f64) as usize).max(1);
        for angle in (0..360).step_by(angle_step) {
            let theta = (angle as f64).to_radians();
            let px = (x as f64 + r as f64 * theta.cos()) as i64;
            let py = (y as f64 + r as f64 * theta.sin()) as i64;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            histogram.add(Color::from(*image.get_pixel(px as u32, py as u32)));
        }
    }

    histogram.dominant(|c| is_ball_color(c, config))
}

/// Samples every grid point, keeping only points that yield a color.
pub fn analyze_grid(
    image: &RgbImage,
    grid: &[GridSamplePoint],
    config: &SamplerConfig,
) -> Vec<DetectedBall> {
    let detected: Vec<DetectedBall> = grid
        .iter()
        .filter_map(|p| {
            let color = dominant_color_in_circle(image, p.x, p.y, p.radius, config)?;
            Some(DetectedBall {
                x: p.x,
                y: p.y,
                radius: p.radius,
                color,
                grid_position: (p.tube_index, p.ball_index),
            })
        })
        .collect();
    log::debug!(
        "sampled {} grid points: {} balls detected, {} without a ball color",
        grid.len(),
        detected.len(),
        grid.len() - detected.len()
    );
    detected
}
