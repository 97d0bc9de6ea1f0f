use clap::{ArgGroup, Parser};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use ball_sort_reader::config::ReaderConfig;
use ball_sort_reader::detect::grouping::AnalysisSummary;
use ball_sort_reader::detect::Point;
use ball_sort_reader::game_model::{GameModelBuilder, GameStateSnapshot, ModelInput};
use ball_sort_reader::image_ops::{self, CropRect};
use ball_sort_reader::session::AcquisitionSession;
use ball_sort_reader::test_image_gen::{demo_layout, render_puzzle};

#[derive(Parser, Debug)]
#[command(
    name = "ball_sort",
    about = "Read a ball sort puzzle screenshot into a tube/ball game state",
    version,
    group(
        ArgGroup::new("input")
            .required(true)
            .args(["image", "demo"])
    )
)]
struct Cli {
    /// Puzzle image to read
    #[arg(short = 'i', long = "image")]
    image: Option<PathBuf>,

    /// Use a generated puzzle instead of an image file
    #[arg(long = "demo")]
    demo: bool,

    /// Corner ball center as `x,y`; give exactly four
    #[arg(short = 'c', long = "corner", value_parser = parse_point)]
    corners: Vec<Point>,

    /// Crop rectangle `left,top,right,bottom` applied before sampling
    #[arg(long = "crop", value_parser = parse_crop)]
    crop: Option<CropRect>,

    /// Ball radius in pixels
    #[arg(short = 'r', long = "radius")]
    radius: Option<i32>,

    /// Number of tubes in the picked area
    #[arg(short = 't', long = "tubes")]
    tubes: Option<usize>,

    /// Balls per tube (tube capacity)
    #[arg(short = 'b', long = "balls")]
    balls: Option<usize>,

    /// Color grouping tolerance (10-100)
    #[arg(long = "tolerance")]
    tolerance: Option<u32>,

    /// Extra empty tubes in the game
    #[arg(short = 'e', long = "empty-tubes")]
    empty_tubes: Option<usize>,

    /// JSON file overriding reader defaults
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Write the image with the sample grid drawn on it
    #[arg(long = "overlay")]
    overlay: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    summary: AnalysisSummary,
    game: GameStateSnapshot,
}

fn parse_ints<const N: usize>(s: &str) -> Result<[i64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma separated integers, got `{s}`"));
    }
    let mut out = [0i64; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|e| format!("`{part}`: {e}"))?;
    }
    Ok(out)
}

fn parse_point(s: &str) -> Result<Point, String> {
    let [x, y] = parse_ints::<2>(s)?;
    let x = i32::try_from(x).map_err(|e| e.to_string())?;
    let y = i32::try_from(y).map_err(|e| e.to_string())?;
    Ok(Point::new(x, y))
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let [l, t, r, b] = parse_ints::<4>(s)?;
    let to_u32 = |v: i64| u32::try_from(v).map_err(|e| format!("{v}: {e}"));
    Ok(CropRect::from_corners(to_u32(l)?, to_u32(t)?, to_u32(r)?, to_u32(b)?))
}

fn write_text_file(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ReaderConfig::from_json_file(path)?,
        None => ReaderConfig::default(),
    };
    let mut session = AcquisitionSession::with_config(&config)?;

    let mut corners = cli.corners.clone();
    let mut radius = cli.radius;
    let mut tubes = cli.tubes;
    let mut balls = cli.balls;

    if cli.demo {
        let layout = demo_layout();
        session.set_image(render_puzzle(&layout));
        if corners.is_empty() {
            corners = layout.corner_points().to_vec();
        }
        radius = radius.or(Some(layout.ball_radius));
        tubes = tubes.or(Some(layout.tube_count()));
        balls = balls.or(Some(layout.balls_per_tube()));
    } else if let Some(path) = &cli.image {
        session.set_image(image_ops::load_rgb(path)?);
    }

    if let Some(rect) = cli.crop
        && !session.crop(rect)
    {
        return Err(format!("crop rectangle {rect:?} is empty for this image").into());
    }

    if let Some(r) = radius {
        session.set_ball_radius(r)?;
    }
    let (default_tubes, default_balls) = session.projector().tube_parameters();
    let balls_per_tube = balls.unwrap_or(default_balls);
    session.set_tube_parameters(tubes.unwrap_or(default_tubes), balls_per_tube)?;
    if let Some(t) = cli.tolerance {
        session.set_tolerance(t);
    }

    if !session.set_corners(&corners) {
        return Err(format!("expected 4 corners, got {}", corners.len()).into());
    }

    let grid_len = session.generate_grid().len();
    log::info!("generated {grid_len} sample points");
    let groups = session.analyze_colors();
    log::info!("found {} colors over {} balls", groups.len(), groups.total_balls());

    if let Some(path) = &cli.overlay
        && let Some(overlay) = session.overlay_image()
    {
        overlay.save(path)?;
        log::info!("wrote overlay {}", path.display());
    }

    let empty_tubes = cli.empty_tubes.unwrap_or(config.empty_tubes);
    let builder = GameModelBuilder::new(empty_tubes, balls_per_tube)?;
    let state = builder.build(&ModelInput::from_groups(session.color_groups()));

    let check = state.ball_count_check(session.expected_ball_count());
    if check.matches() {
        log::info!("all {} expected balls placed", check.expected);
    } else {
        log::warn!("placed {} balls, expected {}", check.actual, check.expected);
    }

    let report = Report {
        summary: session.analysis_summary(),
        game: state.snapshot(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &cli.out {
        Some(path) => write_text_file(path, &json)?,
        None => println!("{json}"),
    }

    Ok(())
}
