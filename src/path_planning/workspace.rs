//! Workspace, robot model and collision checking
//!
//! The robot is modelled as a disc of `robot_radius` for clearance: every
//! obstacle is inflated by that radius once, after which poses are checked
//! as points. The workspace boundary is not shrunk, so poses on the
//! boundary edge count as inside.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{PlanningError, PlanningResult, Point2D, Pose2D};
use crate::geometry::{inflate, BoundingBox, InflatedPolygon, Polygon};
use crate::path_planning::dubins_path::DubinsPath;

/// Robot geometry and steering limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Clearance radius used to inflate obstacles
    pub robot_radius: f64,
    /// Wheelbase
    pub robot_length: f64,
    /// Minimum turning radius of the Dubins car
    pub min_turning_radius: f64,
}

impl RobotConfig {
    pub fn new(robot_radius: f64, robot_length: f64, min_turning_radius: f64) -> PlanningResult<Self> {
        let robot = RobotConfig { robot_radius, robot_length, min_turning_radius };
        robot.validate()?;
        Ok(robot)
    }

    /// Kinematic bicycle: turning radius = wheelbase / tan(max_steer)
    pub fn from_max_steer(robot_radius: f64, robot_length: f64, max_steer: f64) -> PlanningResult<Self> {
        if !max_steer.is_finite() || max_steer <= 0.0 || max_steer >= std::f64::consts::FRAC_PI_2 {
            return Err(PlanningError::InvalidParameter(format!(
                "max_steer must lie in (0, pi/2), got {}",
                max_steer
            )));
        }
        if !robot_length.is_finite() || robot_length <= 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "robot_length must be positive to derive a turning radius, got {}",
                robot_length
            )));
        }
        Self::new(robot_radius, robot_length, robot_length / max_steer.tan())
    }

    pub fn validate(&self) -> PlanningResult<()> {
        if !self.robot_radius.is_finite() || self.robot_radius < 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "robot_radius must be finite and non-negative, got {}",
                self.robot_radius
            )));
        }
        if !self.robot_length.is_finite() || self.robot_length < 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "robot_length must be finite and non-negative, got {}",
                self.robot_length
            )));
        }
        if !self.min_turning_radius.is_finite() || self.min_turning_radius <= 0.0 {
            return Err(PlanningError::InvalidParameter(format!(
                "min_turning_radius must be finite and positive, got {}",
                self.min_turning_radius
            )));
        }
        Ok(())
    }
}

/// Unvalidated workspace as read from a scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkspace {
    pub boundary: Polygon,
    #[serde(default)]
    pub obstacles: Vec<Polygon>,
}

/// Boundary polygon plus obstacle polygons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWorkspace")]
pub struct WorkspaceConfig {
    boundary: Polygon,
    obstacles: Vec<Polygon>,
}

impl WorkspaceConfig {
    /// Every obstacle must lie within the boundary; touching it is allowed
    pub fn new(boundary: Polygon, obstacles: Vec<Polygon>) -> PlanningResult<Self> {
        for (i, obstacle) in obstacles.iter().enumerate() {
            if let Some(v) = obstacle.vertices().iter().find(|&&v| !boundary.contains(v)) {
                return Err(PlanningError::InvalidGeometry(format!(
                    "obstacle {} has vertex ({}, {}) outside the workspace boundary",
                    i, v.x, v.y
                )));
            }
            // a concave boundary can pass between two vertices of an edge
            if !boundary.contains_polygon(obstacle) {
                return Err(PlanningError::InvalidGeometry(format!(
                    "obstacle {} leaves the workspace boundary between its vertices",
                    i
                )));
            }
        }
        Ok(WorkspaceConfig { boundary, obstacles })
    }

    /// Build from raw (x, y) rings
    pub fn from_rings(boundary: Vec<(f64, f64)>, obstacles: Vec<Vec<(f64, f64)>>) -> PlanningResult<Self> {
        let boundary = Polygon::from_tuples(&boundary)?;
        let obstacles = obstacles
            .iter()
            .map(|ring| Polygon::from_tuples(ring))
            .collect::<PlanningResult<Vec<_>>>()?;
        Self::new(boundary, obstacles)
    }

    pub fn boundary(&self) -> &Polygon {
        &self.boundary
    }

    pub fn obstacles(&self) -> &[Polygon] {
        &self.obstacles
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.boundary.bounding_box()
    }
}

impl TryFrom<RawWorkspace> for WorkspaceConfig {
    type Error = PlanningError;

    fn try_from(raw: RawWorkspace) -> PlanningResult<Self> {
        WorkspaceConfig::new(raw.boundary, raw.obstacles)
    }
}

/// True if the pose lies inside the boundary and outside every inflated obstacle
pub fn is_free(pose: &Pose2D, workspace: &WorkspaceConfig, inflated_obstacles: &[InflatedPolygon]) -> bool {
    let p = pose.position();
    workspace.boundary.contains(p) && !inflated_obstacles.iter().any(|obstacle| obstacle.contains(p))
}

/// True if every pose sampled along `path` every `resolution` is free
///
/// Obstacles thinner than `resolution` can slip between samples.
pub fn is_path_free(
    path: &DubinsPath,
    workspace: &WorkspaceConfig,
    inflated_obstacles: &[InflatedPolygon],
    resolution: f64,
) -> bool {
    path.poses(resolution).all(|pose| is_free(&pose, workspace, inflated_obstacles))
}

/// Collision checker with obstacles inflated once per planner
#[derive(Debug, Clone)]
pub struct CollisionChecker {
    workspace: WorkspaceConfig,
    inflated: Vec<InflatedPolygon>,
}

impl CollisionChecker {
    pub fn new(workspace: &WorkspaceConfig, robot: &RobotConfig) -> PlanningResult<Self> {
        let inflated = workspace
            .obstacles()
            .iter()
            .map(|obstacle| inflate(obstacle, robot.robot_radius))
            .collect::<PlanningResult<Vec<_>>>()?;

        debug!(
            "Collision checker ready: {} obstacles inflated by {:.3} into {} convex pieces",
            inflated.len(),
            robot.robot_radius,
            inflated.iter().map(|obstacle| obstacle.pieces().len()).sum::<usize>()
        );

        Ok(CollisionChecker {
            workspace: workspace.clone(),
            inflated,
        })
    }

    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.workspace
    }

    pub fn inflated_obstacles(&self) -> &[InflatedPolygon] {
        &self.inflated
    }

    pub fn is_point_free(&self, p: Point2D) -> bool {
        self.workspace.boundary.contains(p) && !self.inflated.iter().any(|obstacle| obstacle.contains(p))
    }

    pub fn is_free(&self, pose: &Pose2D) -> bool {
        self.is_point_free(pose.position())
    }

    pub fn is_path_free(&self, path: &DubinsPath, resolution: f64) -> bool {
        path.poses(resolution).all(|pose| self.is_free(&pose))
    }
}
