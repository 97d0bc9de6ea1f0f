use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::color::Color;
use crate::detect::grid::Point;

const BACKGROUND: Rgb<u8> = Rgb([245, 245, 245]);
const TUBE_OUTLINE: Rgb<u8> = Rgb([90, 90, 90]);

pub const DEMO_RED: Color = Color::new(200, 30, 30);
pub const DEMO_GREEN: Color = Color::new(40, 170, 60);
pub const DEMO_BLUE: Color = Color::new(40, 80, 210);
pub const DEMO_YELLOW: Color = Color::new(230, 200, 40);

/// Geometry of a synthetic ball sort screenshot.
///
/// `tubes[t][l]` is the ball at level `l` counted from the top of tube `t`;
/// `None` leaves the slot empty.
#[derive(Debug, Clone)]
pub struct PuzzleLayout {
    pub origin: Point,
    pub tube_spacing: i32,
    pub ball_spacing: i32,
    pub ball_radius: i32,
    pub tubes: Vec<Vec<Option<Color>>>,
}

impl PuzzleLayout {
    pub fn tube_count(&self) -> usize {
        self.tubes.len()
    }

    pub fn balls_per_tube(&self) -> usize {
        self.tubes.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn ball_center(&self, tube: usize, level: usize) -> Point {
        Point::new(
            self.origin.x + tube as i32 * self.tube_spacing,
            self.origin.y + level as i32 * self.ball_spacing,
        )
    }

    /// Centers of the four extreme ball slots, in picking order TL, TR, BL, BR.
    pub fn corner_points(&self) -> [Point; 4] {
        let last_tube = self.tube_count().saturating_sub(1);
        let last_level = self.balls_per_tube().saturating_sub(1);
        [
            self.ball_center(0, 0),
            self.ball_center(last_tube, 0),
            self.ball_center(0, last_level),
            self.ball_center(last_tube, last_level),
        ]
    }

    /// Image large enough to hold every tube with a margin.
    pub fn canvas_size(&self) -> (u32, u32) {
        let margin = self.ball_radius * 3;
        let far = self.ball_center(
            self.tube_count().saturating_sub(1),
            self.balls_per_tube().saturating_sub(1),
        );
        ((far.x + margin).max(1) as u32, (far.y + margin).max(1) as u32)
    }
}

/// Four tubes of four mixed balls on a light background.
pub fn demo_layout() -> PuzzleLayout {
    let (r, g, b, y) = (Some(DEMO_RED), Some(DEMO_GREEN), Some(DEMO_BLUE), Some(DEMO_YELLOW));
    PuzzleLayout {
        origin: Point::new(60, 60),
        tube_spacing: 80,
        ball_spacing: 50,
        ball_radius: 18,
        tubes: vec![
            vec![r, g, b, y],
            vec![g, r, y, b],
            vec![b, y, r, g],
            vec![y, b, g, r],
        ],
    }
}

pub fn uniform_image(width: u32, height: u32, color: Color) -> RgbImage {
    RgbImage::from_pixel(width, height, color.into())
}

/// Draws tube outlines and filled balls for `layout`.
pub fn render_puzzle(layout: &PuzzleLayout) -> RgbImage {
    let (width, height) = layout.canvas_size();
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    let pad = layout.ball_radius + 4;
    let last_level = layout.balls_per_tube().saturating_sub(1) as i32;
    let tube_height = last_level * layout.ball_spacing + 2 * pad;
    for (t, column) in layout.tubes.iter().enumerate() {
        let top = layout.ball_center(t, 0);
        let outline = Rect::at(top.x - pad, top.y - pad)
            .of_size((2 * pad) as u32, tube_height.max(1) as u32);
        draw_hollow_rect_mut(&mut img, outline, TUBE_OUTLINE);

        for (l, slot) in column.iter().enumerate() {
            let Some(color) = slot else {
                continue;
            };
            let c = layout.ball_center(t, l);
            draw_filled_circle_mut(&mut img, (c.x, c.y), layout.ball_radius, (*color).into());
        }
    }
    img
}
