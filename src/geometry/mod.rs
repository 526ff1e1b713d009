//! Planar geometry kernel: polygons, inclusive predicates, inflation

pub mod polygon;
pub mod inflation;
pub mod shapes;

pub use polygon::{
    point_in_polygon, point_segment_distance, segment_intersects_polygon, segments_cross_properly,
    segments_intersect, BoundingBox, Polygon, GEOMETRY_EPSILON,
};
pub use inflation::{inflate, InflatedPolygon, INFLATION_ARC_STEP};
pub use shapes::{create_circle_obstacle, create_circle_obstacle_with_sides, CIRCLE_OBSTACLE_SIDES};
