//! Utility modules for rrt_dubins

pub mod visualization;

pub use visualization::{Visualizer, PathStyle, PointStyle, colors};
