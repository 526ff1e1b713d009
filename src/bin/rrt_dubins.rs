// RRT path planning with Dubins steering
//
// Plans on a background worker and polls it until done, then plots the
// workspace, the inflated obstacles and the resulting path.
// Run with RUST_LOG=debug for planner diagnostics.

use std::thread::sleep;
use std::time::Duration;

use log::{info, warn};

use rrt_dubins::path_planning::{RRTDubinsPlanner, RobotConfig, WorkspaceConfig};
use rrt_dubins::utils::Visualizer;
use rrt_dubins::{create_circle_obstacle, PlanResult, PlanningError, Point2D, Polygon};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const MAX_POLLS: usize = 6000;

fn main() -> Result<(), PlanningError> {
    env_logger::init();

    // wheelbase 1.0 m, max steer 0.8 rad
    let robot = RobotConfig::from_max_steer(1.0, 1.0, 0.8)?;

    let boundary = Polygon::from_tuples(&[(-6.0, -6.0), (-6.0, 15.0), (15.0, 15.0), (15.0, -6.0), (-6.0, -6.0)])?;
    let obstacles = vec![
        create_circle_obstacle(Point2D::new(3.0, 3.0), 1.5)?,
        create_circle_obstacle(Point2D::new(0.0, 9.0), 1.0)?,
        Polygon::from_tuples(&[(8.0, 0.0), (11.0, 0.0), (11.0, 6.0), (8.0, 6.0)])?,
    ];
    let workspace = WorkspaceConfig::new(boundary, obstacles)?;

    let planner = RRTDubinsPlanner::new(
        Point2D::new(-5.0, -5.0),
        (-45.0f64).to_radians(),
        Point2D::new(6.0, 10.0),
        45.0f64.to_radians(),
        5000,
        0.5,
        workspace,
        robot,
    )?;

    let handle = planner.plan_async();
    let mut token = handle.poll_progress();
    let mut polls = 0;
    while !handle.is_done(token) {
        if polls == MAX_POLLS {
            warn!("Planner still running after {} polls, cancelling", polls);
            handle.cancel();
        }
        sleep(POLL_INTERVAL);
        token = handle.poll_progress();
        polls += 1;
    }

    let result = handle.finalize(token)?;
    let mut vis = Visualizer::new();
    vis.set_title("RRT-Dubins")
        .plot_workspace(planner.workspace(), Some(planner.collision_checker().inflated_obstacles()))
        .plot_start(&planner.start())
        .plot_goal(&planner.goal());

    match &result {
        PlanResult::Found(path) => {
            info!(
                "Found path of length {:.2} m with {} segments after {} iterations",
                path.length,
                path.segments.len(),
                path.iterations
            );
            vis.plot_planned_path(path, planner.config().path_resolution);
        }
        PlanResult::NoSolutionFound { iterations, termination } => {
            info!("No path found after {} iterations ({:?})", iterations, termination);
        }
    }

    let img_dir = format!("{}/img", env!("CARGO_MANIFEST_DIR"));
    if let Err(e) = std::fs::create_dir_all(&img_dir) {
        warn!("Cannot create {}: {}", img_dir, e);
    }
    if let Err(e) = vis.save_svg(&format!("{}/rrt_dubins.svg", img_dir)) {
        warn!("Failed to save plot: {}", e);
    }

    Ok(())
}
