//! End-to-end planning scenarios through the background planner handle

use std::thread;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use rrt_dubins::path_planning::{start_planning, PlanningHandle, RobotConfig, WorkspaceConfig};
use rrt_dubins::{
    create_circle_obstacle, PathPlanner, PlanResult, PlanningError, Point2D, Pose2D, RRTDubinsConfig,
    RRTDubinsPlanner, SamplingBasedPlanner, SearchState, Termination,
};

fn wait_until_done(handle: &PlanningHandle, max_polls: usize) -> usize {
    let mut token = handle.poll_progress();
    for _ in 0..max_polls {
        if handle.is_done(token) {
            return token;
        }
        thread::sleep(Duration::from_millis(5));
        let next = handle.poll_progress();
        assert!(next >= token, "progress went backwards: {} -> {}", token, next);
        token = next;
    }
    panic!("planner did not finish after {} polls", max_polls);
}

fn unit_square_planner(seed: u64) -> RRTDubinsPlanner {
    let workspace =
        WorkspaceConfig::from_rings(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], vec![]).unwrap();
    let robot = RobotConfig::new(0.0, 0.1, 0.1).unwrap();
    RRTDubinsPlanner::new(Point2D::new(0.0, 0.0), 0.0, Point2D::new(1.0, 1.0), 0.0, 5000, 0.2, workspace, robot)
        .unwrap()
        .with_config(RRTDubinsConfig {
            max_iterations: 5000,
            step_size: 0.2,
            seed: Some(seed),
            ..Default::default()
        })
        .unwrap()
}

fn walled_planner(max_iterations: usize) -> RRTDubinsPlanner {
    let workspace = WorkspaceConfig::from_rings(
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
        vec![vec![(4.5, 0.0), (5.5, 0.0), (5.5, 10.0), (4.5, 10.0)]],
    )
    .unwrap();
    let robot = RobotConfig::new(0.2, 0.5, 0.5).unwrap();
    RRTDubinsPlanner::new(
        Point2D::new(1.0, 5.0),
        0.0,
        Point2D::new(9.0, 5.0),
        0.0,
        max_iterations,
        0.5,
        workspace,
        robot,
    )
    .unwrap()
    .with_config(RRTDubinsConfig {
        max_iterations,
        step_size: 0.5,
        seed: Some(11),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn unit_square_without_obstacles_succeeds() {
    let planner = unit_square_planner(42);
    let handle = start_planning(&planner);
    let token = wait_until_done(&handle, 4000);

    assert_eq!(handle.status(), SearchState::Succeeded);
    let result = handle.finalize(token).unwrap();
    let path = result.path().expect("path expected");
    assert!(path.length >= 1.414);
    assert_eq!(path.start().unwrap(), Pose2D::new(0.0, 0.0, 0.0));
    assert_eq!(path.goal().unwrap(), Pose2D::new(1.0, 1.0, 0.0));

    // arcs may bulge slightly between collision samples
    let slack = 0.01;
    for p in path.waypoints(0.01).points {
        assert!(p.x >= -slack && p.x <= 1.0 + slack && p.y >= -slack && p.y <= 1.0 + slack, "{:?}", p);
    }
}

#[test]
fn wall_across_workspace_exhausts() {
    let planner = walled_planner(300);
    let handle = planner.plan_async();
    let token = wait_until_done(&handle, 4000);

    assert_eq!(token, 300);
    assert_eq!(handle.status(), SearchState::Exhausted);
    assert_eq!(
        handle.finalize(token).unwrap(),
        PlanResult::NoSolutionFound { iterations: 300, termination: Termination::Exhausted }
    );
}

#[test]
fn finalize_twice_returns_identical_results() {
    let planner = unit_square_planner(5);
    let handle = planner.plan_async();
    let token = wait_until_done(&handle, 4000);
    let first = handle.finalize(token).unwrap();
    let second = handle.finalize(token + 1).unwrap();
    assert_eq!(first, second);
}

#[test]
fn cancellation_ends_run_quickly() {
    let planner = walled_planner(usize::MAX);
    let handle = planner.plan_async();
    thread::sleep(Duration::from_millis(20));
    handle.cancel();
    let token = wait_until_done(&handle, 400);

    match handle.finalize(token).unwrap() {
        PlanResult::NoSolutionFound { iterations, termination } => {
            assert_eq!(termination, Termination::Cancelled);
            assert_eq!(iterations, handle.poll_progress());
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[test]
fn dropping_handle_cancels_worker() {
    let planner = walled_planner(usize::MAX);
    let handle = planner.plan_async();
    drop(handle);
    // the worker observes the flag and exits on its own; nothing to join
    let handle = planner.plan_async();
    handle.cancel();
    wait_until_done(&handle, 400);
}

#[test]
fn finalize_before_completion_reports_not_ready() {
    let planner = walled_planner(usize::MAX);
    let handle = planner.plan_async();
    assert!(matches!(handle.finalize(0), Err(PlanningError::PlanNotReady { .. })));
    handle.cancel();
    wait_until_done(&handle, 400);
}

#[test]
fn blocking_plan_matches_background_plan() {
    let planner = unit_square_planner(9);
    let blocking = planner.plan();
    let handle = planner.plan_async();
    let token = wait_until_done(&handle, 4000);
    assert_eq!(handle.finalize(token).unwrap(), blocking);
}

#[test]
fn path_avoids_circle_obstacles() {
    let workspace = WorkspaceConfig::new(
        rrt_dubins::Polygon::from_tuples(&[(-6.0, -6.0), (-6.0, 15.0), (15.0, 15.0), (15.0, -6.0)]).unwrap(),
        vec![create_circle_obstacle(Point2D::new(0.5, 2.5), 1.5).unwrap()],
    )
    .unwrap();
    let robot = RobotConfig::from_max_steer(0.5, 1.0, 0.8).unwrap();
    let mut planner = RRTDubinsPlanner::new(
        Point2D::new(-5.0, -5.0),
        (-45.0f64).to_radians(),
        Point2D::new(6.0, 10.0),
        45.0f64.to_radians(),
        5000,
        0.5,
        workspace,
        robot,
    )
    .unwrap();
    planner.set_seed(Some(1));
    planner.set_max_iterations(20_000).unwrap();

    let result = planner.plan();
    assert!(result.is_found(), "expected a path around the circle, got {:?}", result);
    let path = result.path().unwrap();
    let checker = planner.collision_checker();
    for segment in &path.segments {
        assert!(checker.is_path_free(segment, planner.config().path_resolution));
    }
    let total: f64 = path.segments.iter().map(|s| s.length()).sum();
    assert_abs_diff_eq!(total, path.length, epsilon = 1e-9);
}

#[test]
fn plans_into_pocket_of_concave_obstacle() {
    let workspace = WorkspaceConfig::from_rings(
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
        vec![vec![
            (2.0, 2.0),
            (8.0, 2.0),
            (8.0, 9.0),
            (7.0, 9.0),
            (7.0, 3.0),
            (3.0, 3.0),
            (3.0, 9.0),
            (2.0, 9.0),
        ]],
    )
    .unwrap();
    let robot = RobotConfig::new(0.1, 0.5, 0.5).unwrap();
    let down = -std::f64::consts::FRAC_PI_2;
    let mut planner = RRTDubinsPlanner::new(
        Point2D::new(5.0, 9.8),
        down,
        Point2D::new(5.0, 5.0),
        down,
        20_000,
        0.5,
        workspace,
        robot,
    )
    .unwrap();
    planner.set_seed(Some(1));

    assert!(planner.collision_checker().is_free(&Pose2D::new(5.0, 5.0, down)));
    let result = planner.plan();
    assert!(result.is_found(), "goal inside the pocket is reachable, got {:?}", result);
    let path = result.path().unwrap();
    for segment in &path.segments {
        assert!(planner.collision_checker().is_path_free(segment, planner.config().path_resolution));
    }
}

#[test]
fn config_loads_from_partial_json() {
    let config: RRTDubinsConfig =
        serde_json::from_str(r#"{"max_iterations": 250, "seed": 3}"#).unwrap();
    assert_eq!(config.max_iterations, 250);
    assert_eq!(config.seed, Some(3));
    assert_eq!(config.step_size, RRTDubinsConfig::default().step_size);
    assert_eq!(config.goal_sample_rate, 0.05);

    let robot: RobotConfig =
        serde_json::from_str(r#"{"robot_radius": 0.3, "robot_length": 1.0, "min_turning_radius": 2.0}"#).unwrap();
    assert!(robot.validate().is_ok());
}

#[test]
fn self_intersecting_boundary_is_rejected() {
    let result = WorkspaceConfig::from_rings(vec![(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)], vec![]);
    assert!(matches!(result, Err(PlanningError::InvalidGeometry(_))));

    let json = r#"{"boundary": [{"x": 0.0, "y": 0.0}, {"x": 2.0, "y": 2.0}, {"x": 2.0, "y": 0.0}, {"x": 0.0, "y": 2.0}]}"#;
    assert!(serde_json::from_str::<WorkspaceConfig>(json).is_err());
}
