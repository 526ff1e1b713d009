//! Obstacle shape constructors

use std::f64::consts::PI;

use crate::common::{PlanningError, PlanningResult, Point2D};
use crate::geometry::polygon::Polygon;

/// Default number of sides used to approximate a circular obstacle
pub const CIRCLE_OBSTACLE_SIDES: usize = 16;

/// Regular polygon inscribed in the circle, with `CIRCLE_OBSTACLE_SIDES` sides
pub fn create_circle_obstacle(center: Point2D, radius: f64) -> PlanningResult<Polygon> {
    create_circle_obstacle_with_sides(center, radius, CIRCLE_OBSTACLE_SIDES)
}

/// Regular `sides`-gon whose vertices lie on the circle
///
/// The polygon under-covers the circle by at most `radius * (1 - cos(pi / sides))`
/// between vertices.
pub fn create_circle_obstacle_with_sides(
    center: Point2D,
    radius: f64,
    sides: usize,
) -> PlanningResult<Polygon> {
    if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
        return Err(PlanningError::InvalidGeometry(format!(
            "circle needs a finite center and positive radius, got center ({}, {}) radius {}",
            center.x, center.y, radius
        )));
    }
    if sides < 3 {
        return Err(PlanningError::InvalidGeometry(format!(
            "circle approximation needs at least 3 sides, got {}",
            sides
        )));
    }

    let vertices = (0..sides)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / sides as f64;
            Point2D::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect();
    Polygon::new(vertices)
}
