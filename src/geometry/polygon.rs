//! Simple polygons and the point/segment predicates used by collision checks
//!
//! The geometry itself is delegated to `geo`. On top of it every boundary
//! test is inclusive: a point within [`GEOMETRY_EPSILON`] of an edge counts
//! as inside. Applied to obstacles this resolves borderline cases to
//! "blocked".

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{
    Area, BoundingRect, Contains, ConvexHull, Coord, EuclideanDistance, Intersects, IsConvex, Line,
    LineString, Rect,
};
use serde::{Deserialize, Serialize};

use crate::common::{PlanningError, PlanningResult, Point2D};

/// Tolerance for the inclusive boundary tests
pub const GEOMETRY_EPSILON: f64 = 1e-9;

fn line(a: Point2D, b: Point2D) -> Line<f64> {
    Line::new(Coord::from(a), Coord::from(b))
}

/// Shortest distance from `p` to the segment [a, b]
pub fn point_segment_distance(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    geo::Point::from(p).euclidean_distance(&line(a, b))
}

/// True if the closed segments [p1, p2] and [q1, q2] come within [`GEOMETRY_EPSILON`]
pub fn segments_intersect(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D) -> bool {
    let (p, q) = (line(p1, p2), line(q1, q2));
    p.intersects(&q) || p.euclidean_distance(&q) <= GEOMETRY_EPSILON
}

/// True if the segments cross at a single point interior to both
pub fn segments_cross_properly(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D) -> bool {
    matches!(
        line_intersection(line(p1, p2), line(q1, q2)),
        Some(LineIntersection::SinglePoint { is_proper: true, .. })
    )
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point2D,
    pub max: Point2D,
}

impl BoundingBox {
    pub fn new(min: Point2D, max: Point2D) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, `None` for an empty slice
    pub fn from_points(points: &[Point2D]) -> Option<Self> {
        let ring: LineString<f64> = points.iter().map(|&p| Coord::from(p)).collect();
        ring.bounding_rect().map(BoundingBox::from)
    }

    /// Smallest box holding both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            Point2D::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point2D::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.min.x - GEOMETRY_EPSILON
            && p.x <= self.max.x + GEOMETRY_EPSILON
            && p.y >= self.min.y - GEOMETRY_EPSILON
            && p.y <= self.max.y + GEOMETRY_EPSILON
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().into(), rect.max().into())
    }
}

/// Simple polygon without holes
///
/// Construction enforces at least three distinct finite vertices, a
/// non-zero area and the absence of self-intersections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct Polygon {
    /// Open ring, the closing edge is implicit
    vertices: Vec<Point2D>,
    shape: geo::Polygon<f64>,
    bbox: BoundingBox,
}

impl Polygon {
    /// Validate a ring of vertices
    ///
    /// A trailing vertex equal to the first one and consecutive duplicate
    /// vertices are dropped before validation.
    pub fn new(mut vertices: Vec<Point2D>) -> PlanningResult<Self> {
        if let Some(p) = vertices.iter().find(|p| !p.is_finite()) {
            return Err(PlanningError::InvalidGeometry(format!(
                "polygon vertex ({}, {}) is not finite",
                p.x, p.y
            )));
        }

        vertices.dedup_by(|a, b| a.distance(b) <= GEOMETRY_EPSILON);
        while vertices.len() > 1
            && vertices[0].distance(&vertices[vertices.len() - 1]) <= GEOMETRY_EPSILON
        {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(PlanningError::InvalidGeometry(format!(
                "polygon needs at least 3 distinct vertices, got {}",
                vertices.len()
            )));
        }

        // geo closes the exterior ring itself
        let exterior: LineString<f64> = vertices.iter().map(|&p| Coord::from(p)).collect();
        let shape = geo::Polygon::new(exterior, vec![]);
        if shape.unsigned_area() <= GEOMETRY_EPSILON {
            return Err(PlanningError::InvalidGeometry(
                "polygon has zero area".to_string(),
            ));
        }
        if !is_simple_ring(shape.exterior()) {
            return Err(PlanningError::InvalidGeometry(
                "polygon is self-intersecting".to_string(),
            ));
        }
        let bbox = shape
            .bounding_rect()
            .map(BoundingBox::from)
            .ok_or_else(|| PlanningError::InvalidGeometry("polygon has no extent".to_string()))?;

        Ok(Polygon { vertices, shape, bbox })
    }

    /// Build from (x, y) tuples, the shape used by the binding layer
    pub fn from_tuples(ring: &[(f64, f64)]) -> PlanningResult<Self> {
        Self::new(ring.iter().map(|&xy| Point2D::from(xy)).collect())
    }

    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Underlying `geo` polygon
    pub fn as_geo(&self) -> &geo::Polygon<f64> {
        &self.shape
    }

    /// Edges (a, b) in ring order, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        self.shape
            .exterior()
            .lines()
            .map(|edge| (Point2D::from(edge.start), Point2D::from(edge.end)))
    }

    /// Positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        self.shape.signed_area()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Same polygon with counter-clockwise winding
    pub fn to_ccw(&self) -> Polygon {
        if self.is_ccw() {
            return self.clone();
        }
        let vertices: Vec<Point2D> = self.vertices.iter().rev().copied().collect();
        let exterior: LineString<f64> = vertices.iter().map(|&p| Coord::from(p)).collect();
        Polygon {
            vertices,
            shape: geo::Polygon::new(exterior, vec![]),
            bbox: self.bbox,
        }
    }

    /// True if no vertex turns against the winding direction
    pub fn is_convex(&self) -> bool {
        self.shape.exterior().is_convex()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// Distance from `p` to the nearest edge
    pub fn distance_to_boundary(&self, p: Point2D) -> f64 {
        geo::Point::from(p).euclidean_distance(self.shape.exterior())
    }

    /// Inclusive point-in-polygon test
    pub fn contains(&self, p: Point2D) -> bool {
        self.bbox.contains(p)
            && (self.shape.intersects(&geo::Point::from(p))
                || self.distance_to_boundary(p) <= GEOMETRY_EPSILON)
    }

    /// True if the segment [a, b] touches the polygon boundary or interior
    pub fn intersects_segment(&self, a: Point2D, b: Point2D) -> bool {
        let segment = line(a, b);
        segment.intersects(&self.shape)
            || self
                .shape
                .exterior()
                .lines()
                .any(|edge| edge.euclidean_distance(&segment) <= GEOMETRY_EPSILON)
    }

    /// True if `other` lies inside this polygon; shared boundary is allowed
    pub fn contains_polygon(&self, other: &Polygon) -> bool {
        self.shape.contains(&other.shape)
    }

    /// Convex hull, counter-clockwise, no collinear vertices
    pub fn convex_hull(&self) -> PlanningResult<Polygon> {
        let hull = self.shape.convex_hull();
        Polygon::new(hull.exterior().coords().map(|&c| Point2D::from(c)).collect())
    }
}

/// No two edges of the closed ring meet except neighbours at their shared vertex
fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();

    for i in 0..n {
        // neighbour folding back over this edge
        if let Some(LineIntersection::Collinear { intersection }) =
            line_intersection(edges[i], edges[(i + 1) % n])
        {
            if intersection.start != intersection.end {
                return false;
            }
        }

        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if line_intersection(edges[i], edges[j]).is_some() {
                return false;
            }
        }
    }
    true
}

impl TryFrom<Vec<Point2D>> for Polygon {
    type Error = PlanningError;

    fn try_from(vertices: Vec<Point2D>) -> PlanningResult<Self> {
        Polygon::new(vertices)
    }
}

impl From<Polygon> for Vec<Point2D> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

/// Inclusive point-in-polygon test
pub fn point_in_polygon(polygon: &Polygon, p: Point2D) -> bool {
    polygon.contains(p)
}

/// True if the segment [a, b] touches the polygon boundary or interior
pub fn segment_intersects_polygon(a: Point2D, b: Point2D, polygon: &Polygon) -> bool {
    polygon.intersects_segment(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(size: f64) -> Polygon {
        Polygon::from_tuples(&[(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]).unwrap()
    }

    fn u_shape() -> Polygon {
        Polygon::from_tuples(&[
            (0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (2.0, 3.0),
            (2.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_polygon_drops_closing_vertex() {
        let poly = Polygon::from_tuples(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(poly.len(), 3);
        assert_abs_diff_eq!(poly.signed_area(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_polygon_rejects_degenerate_rings() {
        assert!(matches!(
            Polygon::from_tuples(&[(0.0, 0.0), (1.0, 0.0)]),
            Err(PlanningError::InvalidGeometry(_))
        ));
        assert!(matches!(
            Polygon::from_tuples(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
            Err(PlanningError::InvalidGeometry(_))
        ));
        assert!(matches!(
            Polygon::from_tuples(&[(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0)]),
            Err(PlanningError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_polygon_rejects_bowtie() {
        let result = Polygon::from_tuples(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
        assert!(matches!(result, Err(PlanningError::InvalidGeometry(_))));
    }

    #[test]
    fn test_point_in_polygon_is_boundary_inclusive() {
        let poly = square(1.0);
        assert!(point_in_polygon(&poly, Point2D::new(0.5, 0.5)));
        assert!(point_in_polygon(&poly, Point2D::new(0.0, 0.0)));
        assert!(point_in_polygon(&poly, Point2D::new(1.0, 0.3)));
        assert!(!point_in_polygon(&poly, Point2D::new(1.0 + 1e-6, 0.3)));
        assert!(!point_in_polygon(&poly, Point2D::new(-0.5, 0.5)));
    }

    #[test]
    fn test_point_in_concave_polygon() {
        let poly = u_shape();
        assert!(poly.contains(Point2D::new(0.5, 2.0)));
        assert!(poly.contains(Point2D::new(1.5, 0.5)));
        assert!(!poly.contains(Point2D::new(1.5, 2.0)));
        assert!(!poly.is_convex());
        assert!(square(2.0).is_convex());
    }

    #[test]
    fn test_segment_intersects_polygon() {
        let poly = square(1.0);
        // crosses straight through without either endpoint inside
        assert!(segment_intersects_polygon(Point2D::new(-1.0, 0.5), Point2D::new(2.0, 0.5), &poly));
        // touches the corner (0, 1) and nothing else
        assert!(segment_intersects_polygon(Point2D::new(-1.0, 0.0), Point2D::new(1.0, 2.0), &poly));
        // same direction shifted off the corner
        assert!(!segment_intersects_polygon(Point2D::new(-1.0, 1.0), Point2D::new(1.0, 3.0), &poly));
        // passes beside
        assert!(!segment_intersects_polygon(Point2D::new(-1.0, 1.5), Point2D::new(2.0, 1.5), &poly));
        // fully inside
        assert!(segment_intersects_polygon(Point2D::new(0.2, 0.2), Point2D::new(0.8, 0.8), &poly));
    }

    #[test]
    fn test_convex_hull_of_u_shape() {
        let hull = u_shape().convex_hull().unwrap();
        assert_eq!(hull.len(), 4);
        assert!(hull.is_ccw());
        assert!(hull.contains(Point2D::new(1.5, 2.0)));
        assert_abs_diff_eq!(hull.signed_area(), 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = u_shape().bounding_box();
        assert_eq!(bbox.min, Point2D::new(0.0, 0.0));
        assert_eq!(bbox.max, Point2D::new(3.0, 3.0));
        assert!(bbox.contains(Point2D::new(3.0, 1.0)));
        assert!(!bbox.contains(Point2D::new(3.1, 1.0)));

        let from_points = BoundingBox::from_points(u_shape().vertices()).unwrap();
        assert_eq!(from_points, bbox);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_proper_crossing() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(2.0, 2.0);
        assert!(segments_cross_properly(a, b, Point2D::new(0.0, 2.0), Point2D::new(2.0, 0.0)));
        // touching at an endpoint is not a proper crossing
        assert!(!segments_cross_properly(a, b, Point2D::new(2.0, 2.0), Point2D::new(3.0, 0.0)));
        assert!(segments_intersect(a, b, Point2D::new(2.0, 2.0), Point2D::new(3.0, 0.0)));
        assert!(!segments_cross_properly(a, b, Point2D::new(3.0, 3.0), Point2D::new(4.0, 4.0)));
    }

    #[test]
    fn test_contains_polygon() {
        let outer = square(4.0);
        let inner = Polygon::from_tuples(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0)]).unwrap();
        // shares the bottom edge with the outer square
        let touching = Polygon::from_tuples(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)]).unwrap();
        let straddling = Polygon::from_tuples(&[(3.0, 1.0), (5.0, 1.0), (5.0, 2.0), (3.0, 2.0)]).unwrap();
        assert!(outer.contains_polygon(&inner));
        assert!(outer.contains_polygon(&touching));
        assert!(!outer.contains_polygon(&straddling));
    }

    #[test]
    fn test_to_ccw() {
        let cw = Polygon::from_tuples(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap();
        assert!(!cw.is_ccw());
        let ccw = cw.to_ccw();
        assert!(ccw.is_ccw());
        assert_abs_diff_eq!(ccw.signed_area(), 1.0, epsilon = 1e-12);
        assert_eq!(ccw.bounding_box(), cw.bounding_box());
    }

    #[test]
    fn test_point_segment_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(2.0, 0.0);
        assert_abs_diff_eq!(point_segment_distance(Point2D::new(1.0, 1.0), a, b), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(point_segment_distance(Point2D::new(3.0, 0.0), a, b), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(point_segment_distance(Point2D::new(1.0, 0.0), a, a), 1.0, epsilon = 1e-12);
    }
}
