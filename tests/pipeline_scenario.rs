use ball_sort_reader::color::Color;
use ball_sort_reader::config::ReaderConfig;
use ball_sort_reader::detect::Point;
use ball_sort_reader::game_model::{GameModelBuilder, ModelInput};
use ball_sort_reader::image_ops::{self, CropRect};
use ball_sort_reader::session::AcquisitionSession;
use ball_sort_reader::test_image_gen::{
    DEMO_BLUE, DEMO_GREEN, DEMO_RED, DEMO_YELLOW, demo_layout, render_puzzle, uniform_image,
};

const RED: Color = Color::new(200, 30, 30);

#[test]
fn uniform_red_square_becomes_two_complete_tubes() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut session = AcquisitionSession::new();
    session.set_image(uniform_image(200, 200, RED));
    assert!(session.set_corners(&[
        Point::new(50, 50),
        Point::new(150, 50),
        Point::new(50, 150),
        Point::new(150, 150),
    ]));
    session.set_ball_radius(10).expect("radius");
    session.set_tube_parameters(2, 2).expect("tube parameters");

    assert_eq!(session.generate_grid().len(), 4);
    let groups = session.analyze_colors();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.get(&RED).map(|b| b.len()), Some(4));
    assert_eq!(session.detected_balls().len(), 4);

    let state = GameModelBuilder::new(0, 2)
        .expect("capacity")
        .build(&ModelInput::from_groups(session.color_groups()));
    assert_eq!(state.total_tubes(), 2);
    assert_eq!(state.tubes_with_balls(), 2);
    for tube in state.tubes() {
        assert_eq!(tube.ball_count(), 2);
        assert!(tube.is_complete());
    }
    assert!(state.ball_count_check(session.expected_ball_count()).matches());
    assert_eq!(state.completion_status().completion_percentage, 100.0);
}

#[test]
fn demo_puzzle_reads_back_its_layout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let layout = demo_layout();

    let mut session = AcquisitionSession::with_config(&ReaderConfig::default()).expect("config");
    session.set_image(render_puzzle(&layout));
    assert!(session.set_corners(&layout.corner_points()));
    session.set_ball_radius(layout.ball_radius).expect("radius");
    session
        .set_tube_parameters(layout.tube_count(), layout.balls_per_tube())
        .expect("tube parameters");
    session.generate_grid();
    session.analyze_colors();

    assert_eq!(session.detected_balls().len(), 16);
    let groups = session.color_groups();
    assert_eq!(groups.len(), 4);
    for color in [DEMO_RED, DEMO_GREEN, DEMO_BLUE, DEMO_YELLOW] {
        assert_eq!(groups.get(&color).map(|b| b.len()), Some(4), "color {color}");
    }

    let summary = session.analysis_summary();
    assert_eq!(summary.total_balls, 16);
    assert!(summary.color_distribution.iter().all(|s| s.count == 4));

    let state = GameModelBuilder::new(2, layout.balls_per_tube())
        .expect("capacity")
        .build(&ModelInput::from_groups(groups));
    assert_eq!(state.total_tubes(), 6);
    assert_eq!(state.total_balls(), 16);

    let status = state.completion_status();
    assert_eq!(status.complete_tubes, 0);
    assert_eq!(status.empty_tubes, 2);
    assert_eq!(status.pure_tubes, 2);

    for (t, column) in layout.tubes.iter().enumerate() {
        let mut expected: Vec<Color> = column.iter().flatten().copied().collect();
        let mut actual: Vec<Color> = state
            .tube(t)
            .expect("tube")
            .balls()
            .iter()
            .map(|b| b.color)
            .collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected, "tube {t}");
    }
}

#[test]
fn missing_slots_are_not_detected() {
    let mut layout = demo_layout();
    layout.tubes[1][0] = None;
    layout.tubes[3][0] = None;

    let mut session = AcquisitionSession::new();
    session.set_image(render_puzzle(&layout));
    assert!(session.set_corners(&layout.corner_points()));
    session.set_ball_radius(layout.ball_radius).expect("radius");
    session.set_tube_parameters(4, 4).expect("tube parameters");
    session.generate_grid();
    session.analyze_colors();

    assert_eq!(session.detected_balls().len(), 14);
    let state = GameModelBuilder::new(0, 4)
        .expect("capacity")
        .build(&ModelInput::from_groups(session.color_groups()));
    let check = state.ball_count_check(session.expected_ball_count());
    assert_eq!((check.actual, check.expected), (14, 16));
    assert_eq!(state.tube(1).map(|t| t.available_space()), Some(1));
}

#[test]
fn analysis_before_grid_or_image_is_empty() {
    let mut session = AcquisitionSession::new();
    assert!(session.analyze_colors().is_empty());

    session.set_image(uniform_image(50, 50, RED));
    assert!(session.analyze_colors().is_empty());
    assert!(!session.is_ready_for_grid());
    assert!(session.generate_grid().is_empty());
    assert!(session.overlay_image().is_some());
}

#[test]
fn cropping_resets_corners_and_samples_the_crop() {
    let mut img = uniform_image(200, 100, Color::new(128, 128, 128));
    for y in 0..100 {
        for x in 100..200 {
            img.put_pixel(x, y, RED.into());
        }
    }
    let mut session = AcquisitionSession::new();
    session.set_image(img);
    assert!(session.set_corners(&[
        Point::new(0, 0),
        Point::new(10, 0),
        Point::new(0, 10),
        Point::new(10, 10),
    ]));

    assert!(!session.crop(CropRect::from_corners(300, 0, 250, 50)));
    assert!(session.crop(CropRect::from_corners(200, 100, 100, 0)));
    assert!(session.corners().is_empty());
    assert_eq!(session.cropped_image().map(|i| i.dimensions()), Some((100, 100)));

    assert!(session.set_corners(&[
        Point::new(20, 20),
        Point::new(80, 20),
        Point::new(20, 80),
        Point::new(80, 80),
    ]));
    session.set_tube_parameters(3, 3).expect("tube parameters");
    session.generate_grid();
    assert_eq!(session.analyze_colors().total_balls(), 9);
}

#[test]
fn overlay_marks_grid_points() {
    let img = uniform_image(60, 60, Color::new(255, 255, 255));
    let grid = [ball_sort_reader::GridSamplePoint {
        x: 30,
        y: 30,
        radius: 10,
        tube_index: 0,
        ball_index: 0,
    }];
    let overlay = image_ops::draw_grid_overlay(&img, &grid);
    assert_eq!(image_ops::pixel_color(&overlay, 30, 30), Some(Color::new(255, 0, 0)));
    assert_eq!(image_ops::pixel_color(&overlay, 40, 30), Some(Color::new(255, 0, 0)));
    assert_eq!(image_ops::pixel_color(&overlay, 35, 30), Some(Color::new(255, 255, 255)));
    assert_eq!(image_ops::pixel_color(&overlay, 0, 0), Some(Color::new(255, 255, 255)));
    assert_eq!(image_ops::pixel_color(&overlay, 60, 0), None);
    assert_eq!(image_ops::pixel_color(&overlay, -1, 0), None);
}

#[test]
fn config_json_overrides_only_named_fields() {
    let json = r#"{ "color_tolerance": 55, "sampler": { "ring_step": 1 } }"#;
    let config = ReaderConfig::from_json_str(json).expect("valid json");
    assert_eq!(config.color_tolerance, 55);
    assert_eq!(config.sampler.ring_step, 1);
    assert_eq!(config.sampler.min_channel_spread, 15);
    assert_eq!(config.grid.balls_per_tube, 4);
    assert_eq!(config.merge_tolerance, 60.0);

    assert!(ReaderConfig::from_json_str("{ not json").is_err());

    let session = AcquisitionSession::with_config(&ReaderConfig {
        color_tolerance: 5,
        ..ReaderConfig::default()
    })
    .expect("config");
    assert_eq!(session.tolerance(), 10);
}

#[test]
fn parameter_changes_drop_the_stale_grid() {
    let corners = [
        Point::new(50, 50),
        Point::new(150, 50),
        Point::new(50, 150),
        Point::new(150, 150),
    ];
    let mut session = AcquisitionSession::new();
    session.set_image(uniform_image(200, 200, RED));
    assert!(session.set_corners(&corners));
    session.set_tube_parameters(2, 2).expect("tube parameters");
    session.generate_grid();
    assert_eq!(session.analyze_colors().total_balls(), 4);
    assert!(session.is_analyzed());

    session.set_tube_parameters(3, 3).expect("tube parameters");
    assert!(session.grid().is_empty());
    assert!(session.detected_balls().is_empty());
    assert!(session.color_groups().is_empty());
    assert!(!session.is_analyzed());
    assert!(session.analyze_colors().is_empty());

    assert_eq!(session.generate_grid().len(), session.expected_ball_count());
    assert_eq!(session.analyze_colors().total_balls(), 9);

    // same values keep the grid
    session.set_tube_parameters(3, 3).expect("tube parameters");
    assert!(session.set_corners(&corners));
    session.set_ball_radius(session.projector().ball_radius()).expect("radius");
    assert_eq!(session.grid().len(), 9);
    assert!(session.is_analyzed());

    session.set_ball_radius(12).expect("radius");
    assert!(session.grid().is_empty());

    session.generate_grid();
    assert!(session.set_corners(&[
        Point::new(40, 50),
        Point::new(150, 50),
        Point::new(50, 150),
        Point::new(150, 150),
    ]));
    assert!(session.grid().is_empty());

    session.generate_grid();
    assert!(session.remove_corner(3));
    assert!(session.grid().is_empty());
    assert!(session.generate_grid().is_empty());

    assert!(session.add_corner(Point::new(150, 150)));
    assert_eq!(session.generate_grid().len(), 9);
    assert!(!session.add_corner(Point::new(1, 1)));
    assert_eq!(session.grid().len(), 9);
}
