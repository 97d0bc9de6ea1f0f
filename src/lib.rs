//! Reads a photographed ball sort puzzle into a tube/ball model.
//!
//! Pipeline: four picked corners are projected into a tube/level grid
//! ([`detect::grid`]), each grid point is sampled for a dominant color
//! ([`detect::sampler`]), colors are bucketed ([`detect::grouping`]), rows
//! photographed separately are merged ([`multi_row`]) and the result is
//! rebuilt as tubes of balls ([`game_model`]).

pub mod color;
pub mod config;
pub mod detect;
pub mod game_model;
pub mod image_ops;
pub mod multi_row;
pub mod session;
pub mod test_image_gen;

pub use color::{Color, ColorName};
pub use config::ReaderConfig;
pub use detect::{ColorGrouper, ColorGroups, DetectedBall, GridProjector, GridSamplePoint, Point};
pub use game_model::{GameModelBuilder, GameState, ModelInput};
pub use multi_row::{AggregatedResults, MultiRowManager};
pub use session::AcquisitionSession;
