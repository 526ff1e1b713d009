// Path Planning algorithms module

pub mod dubins_path;
pub mod workspace;
pub mod rrt_dubins;
pub mod planner_future;

pub use dubins_path::{shortest_path, DubinsPath, DubinsSegment, DubinsWord, SegmentType};
pub use workspace::{is_free, is_path_free, CollisionChecker, RobotConfig, WorkspaceConfig};
pub use rrt_dubins::*;
pub use planner_future::{start_planning, PlanningHandle};
