//! Minkowski inflation of obstacle polygons by the robot clearance
//!
//! An inflated obstacle is stored as a union of convex pieces. Convex
//! polygons inflate to a single piece; concave ones are triangulated first
//! and every triangle is inflated on its own. The Minkowski sum distributes
//! over the union, so the pieces together cover exactly the points within
//! `margin` of the obstacle (plus the corner rounding slack).

use std::f64::consts::PI;

use geo::TriangulateEarcut;
use itertools::Itertools;
use log::debug;
use nalgebra::Vector2;

use crate::common::{PlanningError, PlanningResult, Point2D};
use crate::geometry::polygon::{BoundingBox, Polygon, GEOMETRY_EPSILON};

/// Largest angle spanned by one piece of a rounded corner
pub const INFLATION_ARC_STEP: f64 = PI / 8.0;

/// Obstacle grown by a clearance margin
#[derive(Debug, Clone, PartialEq)]
pub struct InflatedPolygon {
    pieces: Vec<Polygon>,
    bbox: BoundingBox,
    margin: f64,
}

impl InflatedPolygon {
    fn from_pieces(pieces: Vec<Polygon>, margin: f64) -> PlanningResult<Self> {
        let bbox = pieces
            .iter()
            .map(|piece| piece.bounding_box())
            .reduce(|a, b| a.union(&b))
            .ok_or_else(|| PlanningError::InvalidGeometry("inflation produced no pieces".to_string()))?;
        Ok(InflatedPolygon { pieces, bbox, margin })
    }

    /// Convex pieces whose union is the inflated obstacle
    pub fn pieces(&self) -> &[Polygon] {
        &self.pieces
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Inclusive membership test
    pub fn contains(&self, p: Point2D) -> bool {
        self.bbox.contains(p) && self.pieces.iter().any(|piece| piece.contains(p))
    }

    /// True if the segment [a, b] touches any piece
    pub fn intersects_segment(&self, a: Point2D, b: Point2D) -> bool {
        self.pieces.iter().any(|piece| piece.intersects_segment(a, b))
    }
}

fn outward_normal(a: Point2D, b: Point2D) -> Vector2<f64> {
    let dir = (b.to_vector() - a.to_vector()).normalize();
    // right-hand normal points outward for counter-clockwise rings
    Vector2::new(dir.y, -dir.x)
}

/// Offset a convex polygon along its edge normals
///
/// Each corner is rounded with a polyline that circumscribes the true arc,
/// so the result always contains the exact Minkowski sum.
fn inflate_convex(polygon: &Polygon, margin: f64) -> PlanningResult<Polygon> {
    let base = polygon.to_ccw();
    let mut ring: Vec<Point2D> = Vec::with_capacity(base.len() * 4);
    for (prev, curr, next) in base
        .vertices()
        .iter()
        .copied()
        .circular_tuple_windows::<(Point2D, Point2D, Point2D)>()
    {
        let n_in = outward_normal(prev, curr);
        let n_out = outward_normal(curr, next);
        let corner = curr.to_vector();

        let start_angle = n_in.y.atan2(n_in.x);
        let mut sweep = (n_out.y.atan2(n_out.x) - start_angle).rem_euclid(2.0 * PI);
        if sweep > PI {
            // slight clockwise turn from rounding on a straight run
            sweep = 0.0;
        }

        ring.push(Point2D::from(corner + n_in * margin));
        let pieces = (sweep / INFLATION_ARC_STEP).ceil() as usize;
        if pieces > 0 {
            let step = sweep / pieces as f64;
            let radius = margin / (0.5 * step).cos();
            for j in 0..pieces {
                let angle = start_angle + (j as f64 + 0.5) * step;
                ring.push(Point2D::from(corner + Vector2::new(angle.cos(), angle.sin()) * radius));
            }
        }
        ring.push(Point2D::from(corner + n_out * margin));
    }

    Polygon::new(ring)
}

/// Triangles covering a concave polygon, slivers dropped
fn convex_parts(polygon: &Polygon) -> PlanningResult<Vec<Polygon>> {
    polygon
        .as_geo()
        .earcut_triangles()
        .into_iter()
        .map(|triangle| triangle.to_array().map(Point2D::from))
        .filter(|[a, b, c]| {
            let doubled_area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
            doubled_area.abs() > 2.0 * GEOMETRY_EPSILON
        })
        .map(|triangle| Polygon::new(triangle.to_vec()))
        .collect()
}

/// Grow `polygon` outward by `margin`
///
/// A zero margin keeps the polygon as its only piece.
pub fn inflate(polygon: &Polygon, margin: f64) -> PlanningResult<InflatedPolygon> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(PlanningError::InvalidGeometry(format!(
            "inflation margin must be finite and non-negative, got {}",
            margin
        )));
    }
    if margin == 0.0 {
        return InflatedPolygon::from_pieces(vec![polygon.clone()], margin);
    }
    if polygon.is_convex() {
        return InflatedPolygon::from_pieces(vec![inflate_convex(polygon, margin)?], margin);
    }

    let parts = convex_parts(polygon)?;
    debug!(
        "Inflating non-convex polygon with {} vertices as {} convex parts",
        polygon.len(),
        parts.len()
    );
    let pieces = parts
        .iter()
        .map(|part| inflate_convex(part, margin))
        .collect::<PlanningResult<Vec<_>>>()?;
    InflatedPolygon::from_pieces(pieces, margin)
}
