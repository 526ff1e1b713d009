//! rrt_dubins - RRT path planning for a Dubins car in polygonal workspaces
//!
//! A search runs either on the calling thread or on a background worker
//! that callers poll for progress and completion.

// Core modules
pub mod common;
pub mod geometry;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{Point2D, Pose2D, Path2D};
pub use common::{PathPlanner, SamplingBasedPlanner};
pub use common::{PlanningError, PlanningResult};
pub use geometry::{create_circle_obstacle, create_circle_obstacle_with_sides, Polygon};
pub use path_planning::{
    start_planning, PlanResult, PlannedPath, PlanningHandle, RRTDubinsConfig, RRTDubinsPlanner,
    RobotConfig, SearchState, Termination, WorkspaceConfig,
};
