pub mod grid;
pub mod grouping;
pub mod sampler;

pub use grid::{GridError, GridProjector, GridSamplePoint, Point, Quad};
pub use grouping::{AnalysisSummary, ColorGroup, ColorGrouper, ColorGroups, ColorShare};
pub use sampler::{DetectedBall, analyze_grid, dominant_color_in_circle};
