//! Image loading, cropping and the sample-grid overlay.

use std::path::Path;

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::detect::grid::GridSamplePoint;

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OVERLAY_STROKE: i32 = 2;
const OVERLAY_CENTER_RADIUS: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ImageOpsError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes any supported format and converts it to 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<RgbImage, ImageOpsError> {
    Ok(image::open(path)?.to_rgb8())
}

/// Crop rectangle with `left < right` and `top < bottom` once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    /// Builds a rectangle from two opposite corners given in any order.
    pub fn from_corners(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            left: x1.min(x2),
            top: y1.min(y2),
            right: x1.max(x2),
            bottom: y1.max(y2),
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Intersects with an image of the given size.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self::from_corners(
            self.left.min(width),
            self.top.min(height),
            self.right.min(width),
            self.bottom.min(height),
        )
    }
}

/// Copies the area under `rect` into a new image. `None` when the clamped
/// rectangle is empty.
pub fn crop(image: &RgbImage, rect: CropRect) -> Option<RgbImage> {
    let (width, height) = image.dimensions();
    let rect = rect.clamp_to(width, height);
    if rect.width() == 0 || rect.height() == 0 {
        return None;
    }
    Some(imageops::crop_imm(image, rect.left, rect.top, rect.width(), rect.height()).to_image())
}

pub fn pixel_color(image: &RgbImage, x: i32, y: i32) -> Option<Color> {
    if x < 0 || y < 0 {
        return None;
    }
    image.get_pixel_checked(x as u32, y as u32).map(|px| Color::from(*px))
}

/// Returns a copy of `image` with every grid point outlined and its center marked.
pub fn draw_grid_overlay(image: &RgbImage, grid: &[GridSamplePoint]) -> RgbImage {
    let mut canvas = image.clone();
    for p in grid {
        for inset in 0..OVERLAY_STROKE {
            let r = p.radius - inset;
            if r > 0 {
                draw_hollow_circle_mut(&mut canvas, (p.x, p.y), r, OVERLAY_COLOR);
            }
        }
        draw_filled_circle_mut(&mut canvas, (p.x, p.y), OVERLAY_CENTER_RADIUS, OVERLAY_COLOR);
    }
    canvas
}
