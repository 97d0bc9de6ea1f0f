use ball_sort_reader::color::{Color, ColorName};
use ball_sort_reader::detect::Point;
use ball_sort_reader::game_model::{
    Ball, BallPlacement, GameModelBuilder, GameModelError, ModelInput, Tube,
};

const RED: Color = Color::new(200, 30, 30);
const BLUE: Color = Color::new(40, 80, 210);

fn placements(tubes: &[usize]) -> Vec<BallPlacement> {
    tubes
        .iter()
        .enumerate()
        .map(|(i, &t)| BallPlacement {
            position: Point::new(t as i32 * 50, i as i32 * 10),
            tube_index: t,
        })
        .collect()
}

#[test]
fn tube_never_exceeds_capacity() {
    let input = ModelInput {
        groups: vec![(RED, placements(&[0, 0, 0, 0, 0, 0]))],
        tubes_with_balls: None,
    };
    let state = GameModelBuilder::new(0, 4).expect("capacity").build(&input);

    assert_eq!(state.total_tubes(), 1);
    let tube = state.tube(0).expect("tube 0");
    assert_eq!(tube.ball_count(), 4);
    assert_eq!(tube.available_space(), 0);
    assert_eq!(
        tube.balls().iter().map(|b| b.level_index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert!(tube.is_complete());
    assert_eq!(state.ball_count_check(6).actual, 4);
    assert!(!state.ball_count_check(6).matches());
}

#[test]
fn purity_and_completeness() {
    let mut empty = Tube::new(0, 3, true);
    assert!(empty.is_pure());
    assert!(!empty.is_complete());
    assert!(empty.top_ball().is_none());

    assert!(empty.add_ball(Ball::new(RED, Point::new(0, 0), 9, 9)));
    assert!(empty.is_pure());
    assert!(!empty.is_complete());
    let top = empty.top_ball().expect("one ball");
    assert_eq!((top.tube_index, top.level_index), (0, 0));

    let mut mixed = Tube::new(1, 2, false);
    assert!(mixed.add_ball(Ball::new(RED, Point::new(0, 0), 1, 0)));
    assert!(mixed.add_ball(Ball::new(BLUE, Point::new(0, 10), 1, 0)));
    assert!(!mixed.add_ball(Ball::new(BLUE, Point::new(0, 20), 1, 0)));
    assert_eq!(mixed.ball_count(), 2);
    assert!(!mixed.is_pure());
    assert!(!mixed.is_complete());
}

#[test]
fn inferred_tube_count_and_empty_tubes() {
    let input = ModelInput {
        groups: vec![
            (RED, placements(&[0, 1, 0])),
            (BLUE, placements(&[1, 2, 2, 2])),
        ],
        tubes_with_balls: None,
    };
    assert_eq!(input.distinct_tube_count(), 3);

    let state = GameModelBuilder::new(2, 3).expect("capacity").build(&input);
    assert_eq!(state.tubes_with_balls(), 3);
    assert_eq!(state.empty_tubes(), 2);
    assert_eq!(state.total_tubes(), 5);
    assert_eq!(state.total_balls(), 7);

    let flags: Vec<bool> = state.tubes().iter().map(|t| t.is_empty_flag()).collect();
    assert_eq!(flags, vec![false, false, false, true, true]);
    assert_eq!(
        state.tubes().iter().map(|t| t.index()).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4]
    );

    // Insertion order, not vertical order: red went in before blue.
    let tube1 = state.tube(1).expect("tube 1");
    assert_eq!(tube1.balls()[0].color, RED);
    assert_eq!(tube1.balls()[1].color, BLUE);

    let status = state.completion_status();
    assert_eq!(status.complete_tubes, 1);
    assert_eq!(status.pure_tubes, 4);
    assert_eq!(status.empty_tubes, 2);
    assert_eq!(status.total_tubes, 5);
    assert!((status.completion_percentage - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn explicit_tube_count_drops_out_of_range_balls() {
    let input = ModelInput {
        groups: vec![(RED, placements(&[0, 5, 1]))],
        tubes_with_balls: Some(2),
    };
    let state = GameModelBuilder::new(1, 4).expect("capacity").build(&input);
    assert_eq!(state.total_tubes(), 3);
    assert_eq!(state.total_balls(), 2);
}

#[test]
fn color_statistics_collect_positions_and_tubes() {
    let input = ModelInput {
        groups: vec![(RED, placements(&[1, 0, 1])), (BLUE, placements(&[0]))],
        tubes_with_balls: None,
    };
    let state = GameModelBuilder::new(0, 4).expect("capacity").build(&input);
    let stats = state.color_statistics();

    assert_eq!(stats.len(), 2);
    let red = stats.iter().find(|s| s.color == RED).expect("red stats");
    assert_eq!(red.count, 3);
    assert_eq!(red.tubes, vec![0, 1]);
    assert_eq!(red.positions.len(), 3);
    assert_eq!(red.color_name, ColorName::Red);
    let blue = stats.iter().find(|s| s.color == BLUE).expect("blue stats");
    assert_eq!(blue.tubes, vec![0]);
}

#[test]
fn nothing_detected_gives_only_empty_tubes() {
    let state = GameModelBuilder::new(2, 4).expect("capacity").build(&ModelInput::default());
    assert_eq!(state.total_tubes(), 2);
    let status = state.completion_status();
    assert_eq!(status.empty_tubes, 2);
    assert_eq!(status.completion_percentage, 0.0);
}

#[test]
fn zero_capacity_is_rejected() {
    assert_eq!(GameModelBuilder::new(2, 0), Err(GameModelError::ZeroCapacity));
}

#[test]
fn snapshot_serializes_nested_tree() {
    let input = ModelInput {
        groups: vec![(RED, placements(&[0, 0]))],
        tubes_with_balls: None,
    };
    let state = GameModelBuilder::new(1, 2).expect("capacity").build(&input);
    let json = serde_json::to_value(state.snapshot()).expect("serializable");

    assert_eq!(json["total_tubes"], 2);
    assert_eq!(json["total_balls"], 2);
    assert_eq!(json["tubes"][0]["is_complete"], true);
    assert_eq!(json["tubes"][0]["balls"][0]["color"], serde_json::json!([200, 30, 30]));
    assert_eq!(json["tubes"][0]["balls"][1]["level_index"], 1);
    assert_eq!(json["tubes"][0]["balls"][0]["color_name"], "red");
    assert_eq!(json["tubes"][1]["is_empty"], true);
    assert_eq!(json["tubes"][1]["is_pure"], true);
    assert_eq!(json["completion_status"]["complete_tubes"], 1);
    assert_eq!(json["color_statistics"][0]["count"], 2);
}
