//! Error types for rrt_dubins

use thiserror::Error;

/// Main error type for the planner
///
/// Failing to find a path is not an error: it is reported as
/// [`PlanResult::NoSolutionFound`](crate::path_planning::PlanResult).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// Malformed boundary, obstacle or circle parameters
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// Invalid planner or robot parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// No Dubins word connects the two poses
    #[error("No Dubins path exists between the given poses")]
    NoPathExists,
    /// `finalize` was called before the worker published a result
    #[error("Plan not ready after {iterations} iterations")]
    PlanNotReady { iterations: usize },
    /// The worker thread stopped without publishing a result
    #[error("Worker thread disconnected before publishing a result")]
    WorkerDisconnected,
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlanningError>;
