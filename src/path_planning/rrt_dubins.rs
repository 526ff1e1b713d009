//! RRT path planner with Dubins steering
//!
//! Grows a tree of collision-free Dubins segments from the start pose.
//! Every new node tries a direct Dubins connection to the goal pose, and
//! the first collision-free connection ends the search.

use std::f64::consts::PI;

use log::{debug, info, trace, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::common::{
    Path2D, PathPlanner, PlanningError, PlanningResult, Point2D, Pose2D, SamplingBasedPlanner,
};
use crate::path_planning::dubins_path::{shortest_path, DubinsPath};
use crate::path_planning::planner_future::{start_planning, PlanningHandle};
use crate::path_planning::workspace::{CollisionChecker, RobotConfig, WorkspaceConfig};

/// Cap on rejection-sampling draws before falling back to the goal pose
pub const MAX_REJECTION_ATTEMPTS: usize = 10_000;

/// Lifecycle of one search run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SearchState {
    Idle = 0,
    Running = 1,
    Succeeded = 2,
    Exhausted = 3,
    Cancelled = 4,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Succeeded | SearchState::Exhausted | SearchState::Cancelled)
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SearchState::Running,
            2 => SearchState::Succeeded,
            3 => SearchState::Exhausted,
            4 => SearchState::Cancelled,
            _ => SearchState::Idle,
        }
    }
}

/// Why a run ended without a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    Exhausted,
    Cancelled,
}

/// Root-to-goal chain of Dubins segments
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPath {
    pub segments: Vec<DubinsPath>,
    pub length: f64,
    pub iterations: usize,
}

impl PlannedPath {
    pub fn start(&self) -> Option<Pose2D> {
        self.segments.first().map(|s| s.start())
    }

    pub fn goal(&self) -> Option<Pose2D> {
        self.segments.last().map(|s| s.end())
    }

    /// Poses sampled every `resolution` along the whole path, segment joints appear once
    pub fn poses(&self, resolution: f64) -> impl Iterator<Item = Pose2D> + '_ {
        self.segments
            .iter()
            .enumerate()
            .flat_map(move |(i, segment)| segment.poses(resolution).skip(usize::from(i > 0)))
    }

    /// Sampled polyline of the path
    pub fn waypoints(&self, resolution: f64) -> Path2D {
        Path2D::from_points(self.poses(resolution).map(|pose| pose.position()).collect())
    }
}

/// Outcome of a planning run
#[derive(Debug, Clone, PartialEq)]
pub enum PlanResult {
    Found(PlannedPath),
    NoSolutionFound {
        iterations: usize,
        termination: Termination,
    },
}

impl PlanResult {
    pub fn is_found(&self) -> bool {
        matches!(self, PlanResult::Found(_))
    }

    pub fn path(&self) -> Option<&PlannedPath> {
        match self {
            PlanResult::Found(path) => Some(path),
            PlanResult::NoSolutionFound { .. } => None,
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            PlanResult::Found(path) => path.iterations,
            PlanResult::NoSolutionFound { iterations, .. } => *iterations,
        }
    }

    /// Terminal search state this result corresponds to
    pub fn state(&self) -> SearchState {
        match self {
            PlanResult::Found(_) => SearchState::Succeeded,
            PlanResult::NoSolutionFound { termination: Termination::Exhausted, .. } => SearchState::Exhausted,
            PlanResult::NoSolutionFound { termination: Termination::Cancelled, .. } => SearchState::Cancelled,
        }
    }
}

/// Configuration for the RRT-Dubins search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RRTDubinsConfig {
    /// Maximum number of tree-growth iterations
    pub max_iterations: usize,
    /// Maximum arc length of one tree extension
    pub step_size: f64,
    /// Probability of sampling the goal pose (0-1)
    pub goal_sample_rate: f64,
    /// Arc-length spacing of collision samples along an edge
    pub path_resolution: f64,
    /// Only try goal connections from nodes this close to the goal
    pub goal_connection_radius: Option<f64>,
    /// RNG seed, `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for RRTDubinsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            step_size: 0.1,
            goal_sample_rate: 0.05,
            path_resolution: 0.05,
            goal_connection_radius: None,
            seed: None,
        }
    }
}

impl RRTDubinsConfig {
    pub fn validate(&self) -> PlanningResult<()> {
        if self.max_iterations == 0 {
            return Err(PlanningError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "step_size must be finite and positive, got {}",
                self.step_size
            )));
        }
        if !(0.0..=1.0).contains(&self.goal_sample_rate) {
            return Err(PlanningError::InvalidParameter(format!(
                "goal_sample_rate must lie in [0, 1], got {}",
                self.goal_sample_rate
            )));
        }
        if !self.path_resolution.is_finite() || self.path_resolution <= 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "path_resolution must be finite and positive, got {}",
                self.path_resolution
            )));
        }
        if let Some(radius) = self.goal_connection_radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(PlanningError::InvalidParameter(format!(
                    "goal_connection_radius must be finite and positive, got {}",
                    radius
                )));
            }
        }
        Ok(())
    }
}

/// Node of the search tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub pose: Pose2D,
    /// Arc length from the root
    pub cost: f64,
    pub parent: Option<usize>,
    /// Dubins segment from the parent, `None` for the root
    pub edge: Option<DubinsPath>,
}

/// Single-threaded RRT-Dubins search over an append-only node arena
pub struct SearchEngine {
    config: RRTDubinsConfig,
    start: Pose2D,
    goal: Pose2D,
    rho: f64,
    checker: CollisionChecker,
    nodes: Vec<TreeNode>,
    rng: StdRng,
    x_dist: Uniform<f64>,
    y_dist: Uniform<f64>,
    yaw_dist: Uniform<f64>,
    iterations: usize,
    state: SearchState,
    goal_index: Option<usize>,
}

impl SearchEngine {
    pub fn new(
        start: Pose2D,
        goal: Pose2D,
        checker: CollisionChecker,
        robot: &RobotConfig,
        config: RRTDubinsConfig,
    ) -> PlanningResult<Self> {
        config.validate()?;
        robot.validate()?;
        if !start.is_finite() || !goal.is_finite() {
            return Err(PlanningError::InvalidParameter(
                "start and goal poses must be finite".to_string(),
            ));
        }
        Ok(Self::from_validated(start, goal, checker, robot.min_turning_radius, config))
    }

    fn from_validated(
        start: Pose2D,
        goal: Pose2D,
        checker: CollisionChecker,
        rho: f64,
        config: RRTDubinsConfig,
    ) -> Self {
        let bbox = checker.workspace().bounding_box();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        if !checker.is_free(&start) {
            warn!("Start pose ({:.3}, {:.3}) is not in free space", start.x, start.y);
        }
        if !checker.is_free(&goal) {
            warn!("Goal pose ({:.3}, {:.3}) is not in free space", goal.x, goal.y);
        }

        SearchEngine {
            config,
            start,
            goal,
            rho,
            checker,
            nodes: vec![TreeNode { pose: start, cost: 0.0, parent: None, edge: None }],
            rng,
            x_dist: Uniform::new(bbox.min.x, bbox.max.x),
            y_dist: Uniform::new(bbox.min.y, bbox.max.y),
            yaw_dist: Uniform::new(-PI, PI),
            iterations: 0,
            state: SearchState::Idle,
            goal_index: None,
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn config(&self) -> &RRTDubinsConfig {
        &self.config
    }

    pub fn collision_checker(&self) -> &CollisionChecker {
        &self.checker
    }

    /// Run to completion
    ///
    /// `is_cancelled` is polled before every iteration and `on_progress`
    /// receives the number of completed iterations after each one.
    pub fn run<C, P>(&mut self, is_cancelled: C, mut on_progress: P) -> PlanResult
    where
        C: Fn() -> bool,
        P: FnMut(usize),
    {
        if self.state.is_terminal() {
            return self.result();
        }

        info!(
            "RRT-Dubins search from ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2}), max {} iterations",
            self.start.x, self.start.y, self.start.yaw,
            self.goal.x, self.goal.y, self.goal.yaw,
            self.config.max_iterations
        );
        self.state = SearchState::Running;

        while self.iterations < self.config.max_iterations {
            if is_cancelled() {
                self.state = SearchState::Cancelled;
                break;
            }
            self.iterations += 1;
            let reached = self.extend();
            on_progress(self.iterations);
            if reached {
                self.state = SearchState::Succeeded;
                break;
            }
        }
        if self.state == SearchState::Running {
            self.state = SearchState::Exhausted;
        }

        let result = self.result();
        match &result {
            PlanResult::Found(path) => info!(
                "Path found after {} iterations: length {:.3}, {} segments, {} tree nodes",
                self.iterations,
                path.length,
                path.segments.len(),
                self.nodes.len()
            ),
            PlanResult::NoSolutionFound { termination, .. } => info!(
                "No path found ({:?}) after {} iterations, {} tree nodes",
                termination,
                self.iterations,
                self.nodes.len()
            ),
        }
        result
    }

    /// Current outcome; a run still in progress reports `Exhausted`
    pub fn result(&self) -> PlanResult {
        match (self.state, self.goal_index) {
            (SearchState::Succeeded, Some(goal_index)) => PlanResult::Found(self.generate_final_course(goal_index)),
            (SearchState::Cancelled, _) => PlanResult::NoSolutionFound {
                iterations: self.iterations,
                termination: Termination::Cancelled,
            },
            _ => PlanResult::NoSolutionFound {
                iterations: self.iterations,
                termination: Termination::Exhausted,
            },
        }
    }

    /// One iteration; true once the goal is in the tree
    fn extend(&mut self) -> bool {
        let sample = self.sample();
        let nearest_index = self.nearest_node_index(sample.position());
        let from = self.nodes[nearest_index].pose;

        let edge = match shortest_path(&from, &sample, self.rho) {
            Ok(path) => path.truncated(self.config.step_size),
            Err(e) => {
                trace!("Iteration {}: steering failed: {}", self.iterations, e);
                return false;
            }
        };
        if edge.length() <= 0.0 {
            trace!("Iteration {}: zero-length extension", self.iterations);
            return false;
        }
        if !self.checker.is_path_free(&edge, self.config.path_resolution) {
            trace!("Iteration {}: extension collides", self.iterations);
            return false;
        }

        let new_index = self.insert(nearest_index, edge);
        self.try_connect_goal(new_index)
    }

    fn try_connect_goal(&mut self, index: usize) -> bool {
        let pose = self.nodes[index].pose;
        if let Some(radius) = self.config.goal_connection_radius {
            if pose.position().distance(&self.goal.position()) > radius {
                return false;
            }
        }

        let edge = match shortest_path(&pose, &self.goal, self.rho) {
            Ok(path) => path,
            Err(_) => return false,
        };
        if edge.length() <= 0.0 {
            self.goal_index = Some(index);
            debug!("Node {} reached the goal pose directly", index);
            return true;
        }
        if !self.checker.is_path_free(&edge, self.config.path_resolution) {
            return false;
        }

        let goal_index = self.insert(index, edge);
        debug!(
            "Goal connected from node {} at iteration {}, cost {:.3}",
            index, self.iterations, self.nodes[goal_index].cost
        );
        self.goal_index = Some(goal_index);
        true
    }

    fn insert(&mut self, parent: usize, edge: DubinsPath) -> usize {
        let node = TreeNode {
            pose: edge.end(),
            cost: self.nodes[parent].cost + edge.length(),
            parent: Some(parent),
            edge: Some(edge),
        };
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn sample(&mut self) -> Pose2D {
        if self.rng.gen::<f64>() < self.config.goal_sample_rate {
            return self.goal;
        }

        let boundary = self.checker.workspace().boundary();
        for _ in 0..MAX_REJECTION_ATTEMPTS {
            let p = Point2D::new(self.x_dist.sample(&mut self.rng), self.y_dist.sample(&mut self.rng));
            if boundary.contains(p) {
                return Pose2D::from_position(p, self.yaw_dist.sample(&mut self.rng));
            }
        }
        trace!("Rejection sampling gave up after {} draws", MAX_REJECTION_ATTEMPTS);
        self.goal
    }

    /// Euclidean nearest node, heading ignored; ties go to the oldest node
    fn nearest_node_index(&self, p: Point2D) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, node)| OrderedFloat(node.pose.position().distance_squared(&p)))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn generate_final_course(&self, goal_index: usize) -> PlannedPath {
        let mut segments = Vec::new();
        let mut node_index = Some(goal_index);

        while let Some(index) = node_index {
            let node = &self.nodes[index];
            if let Some(edge) = &node.edge {
                segments.push(edge.clone());
            }
            node_index = node.parent;
        }
        segments.reverse();

        PlannedPath {
            segments,
            length: self.nodes[goal_index].cost,
            iterations: self.iterations,
        }
    }
}

/// RRT planner for a Dubins car in a polygonal workspace
#[derive(Debug, Clone)]
pub struct RRTDubinsPlanner {
    start: Pose2D,
    goal: Pose2D,
    robot: RobotConfig,
    checker: CollisionChecker,
    config: RRTDubinsConfig,
}

impl RRTDubinsPlanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: Point2D,
        start_yaw: f64,
        goal: Point2D,
        goal_yaw: f64,
        max_iterations: usize,
        step_size: f64,
        workspace: WorkspaceConfig,
        robot: RobotConfig,
    ) -> PlanningResult<Self> {
        let start = Pose2D::from_position(start, start_yaw);
        let goal = Pose2D::from_position(goal, goal_yaw);
        if !start.is_finite() || !goal.is_finite() {
            return Err(PlanningError::InvalidParameter(
                "start and goal poses must be finite".to_string(),
            ));
        }
        robot.validate()?;

        let config = RRTDubinsConfig { max_iterations, step_size, ..Default::default() };
        config.validate()?;
        let checker = CollisionChecker::new(&workspace, &robot)?;

        debug!(
            "RRT-Dubins planner: turning radius {:.3}, robot radius {:.3}, step {:.3}, {} obstacles",
            robot.min_turning_radius,
            robot.robot_radius,
            step_size,
            workspace.obstacles().len()
        );

        Ok(RRTDubinsPlanner { start, goal, robot, checker, config })
    }

    /// Replace the search parameters
    pub fn with_config(mut self, config: RRTDubinsConfig) -> PlanningResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &RRTDubinsConfig {
        &self.config
    }

    pub fn start(&self) -> Pose2D {
        self.start
    }

    pub fn goal(&self) -> Pose2D {
        self.goal
    }

    pub fn robot(&self) -> &RobotConfig {
        &self.robot
    }

    pub fn workspace(&self) -> &WorkspaceConfig {
        self.checker.workspace()
    }

    pub fn collision_checker(&self) -> &CollisionChecker {
        &self.checker
    }

    /// Fresh search engine for one run
    pub fn engine(&self) -> SearchEngine {
        SearchEngine::from_validated(
            self.start,
            self.goal,
            self.checker.clone(),
            self.robot.min_turning_radius,
            self.config,
        )
    }

    /// Start the search on a worker thread and return immediately
    pub fn plan_async(&self) -> PlanningHandle {
        start_planning(self)
    }
}

impl PathPlanner for RRTDubinsPlanner {
    fn plan(&self) -> PlanResult {
        self.engine().run(|| false, |_| {})
    }
}

impl SamplingBasedPlanner for RRTDubinsPlanner {
    fn max_iterations(&self) -> usize {
        self.config.max_iterations
    }

    fn set_max_iterations(&mut self, max_iter: usize) -> PlanningResult<()> {
        if max_iter == 0 {
            return Err(PlanningError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        self.config.max_iterations = max_iter;
        Ok(())
    }

    fn set_seed(&mut self, seed: Option<u64>) {
        self.config.seed = seed;
    }
}
