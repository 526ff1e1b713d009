//! Common traits defining interfaces for the planners

use crate::common::error::PlanningResult;
use crate::path_planning::PlanResult;

/// Trait for path planning algorithms
///
/// Start, goal and workspace are fixed when the planner is built; `plan`
/// runs a complete search on the calling thread.
pub trait PathPlanner {
    /// Plan a path from the configured start to the configured goal
    fn plan(&self) -> PlanResult;
}

/// Trait for sampling-based path planning algorithms (RRT, PRM, etc.)
pub trait SamplingBasedPlanner: PathPlanner {
    /// Maximum number of sampling iterations per run
    fn max_iterations(&self) -> usize;

    /// Set maximum iterations for planning
    fn set_max_iterations(&mut self, max_iter: usize) -> PlanningResult<()>;

    /// Fix the random seed for reproducible runs (`None` draws from entropy)
    fn set_seed(&mut self, seed: Option<u64>);
}
