//! Visualization utilities for rrt_dubins
//!
//! Plot layers are collected first and drawn onto a single gnuplot axes
//! when the figure is shown or saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PlotOption, PointSize, PointSymbol};

use crate::common::{Path2D, Point2D, Pose2D};
use crate::geometry::{InflatedPolygon, Polygon};
use crate::path_planning::{PlannedPath, TreeNode, WorkspaceConfig};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";
    pub const LIGHT_GRAY: &str = "#C0C0C0";

    // Semantic colors
    pub const BOUNDARY: &str = BLACK;
    pub const OBSTACLE: &str = BLACK;
    pub const INFLATED: &str = ORANGE;
    pub const TREE: &str = LIGHT_GRAY;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Layer {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Main visualizer struct
pub struct Visualizer {
    layers: Vec<Layer>,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Number of plot layers added so far
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Plot a polyline
    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.layers.push(Layer::Lines {
            x: path.x_coords(),
            y: path.y_coords(),
            style: style.clone(),
        });
        self
    }

    /// Plot a closed polygon outline
    pub fn plot_polygon(&mut self, polygon: &Polygon, style: &PathStyle) -> &mut Self {
        let mut ring: Vec<Point2D> = polygon.vertices().to_vec();
        ring.push(polygon.vertices()[0]);
        self.plot_path(&Path2D::from_points(ring), style)
    }

    /// Plot the boundary, the raw obstacles and optionally the outlines of their inflated pieces
    pub fn plot_workspace(
        &mut self,
        workspace: &WorkspaceConfig,
        inflated: Option<&[InflatedPolygon]>,
    ) -> &mut Self {
        self.plot_polygon(workspace.boundary(), &PathStyle::new(colors::BOUNDARY, "Boundary"));

        for (i, obstacle) in workspace.obstacles().iter().enumerate() {
            let caption = if i == 0 { "Obstacles" } else { "" };
            self.plot_polygon(obstacle, &PathStyle::new(colors::OBSTACLE, caption));
        }
        if let Some(inflated) = inflated {
            for (i, piece) in inflated.iter().flat_map(|obstacle| obstacle.pieces()).enumerate() {
                let caption = if i == 0 { "Inflated" } else { "" };
                self.plot_polygon(piece, &PathStyle::new(colors::INFLATED, caption).with_line_width(1.0));
            }
        }
        self
    }

    /// Plot every tree edge as one broken polyline
    pub fn plot_tree(&mut self, nodes: &[TreeNode], resolution: f64) -> &mut Self {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for edge in nodes.iter().filter_map(|node| node.edge.as_ref()) {
            for pose in edge.poses(resolution) {
                x.push(pose.x);
                y.push(pose.y);
            }
            // NaN breaks the line between edges
            x.push(f64::NAN);
            y.push(f64::NAN);
        }
        self.layers.push(Layer::Lines {
            x,
            y,
            style: PathStyle::new(colors::TREE, "Tree").with_line_width(1.0),
        });
        self
    }

    /// Plot a planned Dubins path sampled every `resolution`
    pub fn plot_planned_path(&mut self, path: &PlannedPath, resolution: f64) -> &mut Self {
        self.plot_path(&path.waypoints(resolution), &PathStyle::default())
    }

    /// Plot a single point (start, goal, etc.)
    pub fn plot_point(&mut self, point: Point2D, style: &PointStyle) -> &mut Self {
        self.layers.push(Layer::Points {
            x: vec![point.x],
            y: vec![point.y],
            style: style.clone(),
        });
        self
    }

    /// Plot a pose as a point with a heading tick of length `size`
    pub fn plot_pose(&mut self, pose: &Pose2D, size: f64, style: &PointStyle) -> &mut Self {
        self.plot_point(pose.position(), style);
        let tip = Point2D::new(pose.x + size * pose.yaw.cos(), pose.y + size * pose.yaw.sin());
        self.layers.push(Layer::Lines {
            x: vec![pose.x, tip.x],
            y: vec![pose.y, tip.y],
            style: PathStyle::new(&style.color, ""),
        });
        self
    }

    pub fn plot_start(&mut self, pose: &Pose2D) -> &mut Self {
        self.plot_pose(pose, 0.5, &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, pose: &Pose2D) -> &mut Self {
        self.plot_pose(pose, 0.5, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    /// Finalize and show the plot
    pub fn show(&mut self) -> Result<(), String> {
        let mut figure = self.render();
        figure.show().map_err(|e| e.to_string()).map(|_| ())
    }

    /// Save plot to PNG file
    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    /// Save plot to SVG file
    pub fn save_svg(&mut self, path: &str) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        {
            let axes = figure.axes2d();

            for layer in &self.layers {
                match layer {
                    Layer::Lines { x, y, style } => {
                        let mut options: Vec<PlotOption<&str>> =
                            vec![Color(style.color.as_str()), LineWidth(style.line_width)];
                        if !style.caption.is_empty() {
                            options.push(Caption(style.caption.as_str()));
                        }
                        axes.lines(x, y, &options);
                    }
                    Layer::Points { x, y, style } => {
                        let mut options: Vec<PlotOption<&str>> = vec![
                            Color(style.color.as_str()),
                            PointSymbol(style.symbol),
                            PointSize(style.size),
                        ];
                        if !style.caption.is_empty() {
                            options.push(Caption(style.caption.as_str()));
                        }
                        axes.points(x, y, &options);
                    }
                }
            }

            if !self.title.is_empty() {
                axes.set_title(&self.title, &[]);
            }
            axes.set_x_label(&self.x_label, &[]);
            axes.set_y_label(&self.y_label, &[]);
            if let Some((min, max)) = self.x_range {
                axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
            }
            if let Some((min, max)) = self.y_range {
                axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
            }
            if let Some(ratio) = self.aspect_ratio {
                axes.set_aspect_ratio(AutoOption::Fix(ratio));
            }
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
