//! Visualization utilities for rust_dynamic_planning
//!
//! Renders trajectories, explored trees and obstacles in the XY plane
//! using gnuplot. Layers are queued and drawn into a single set of axes
//! when the figure is shown or saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{PlanningError, PlanningResult, PositionVelocity, SphereObstacle};
use crate::planning::{PlanningGraph, Trajectory};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const TREE: &str = GRAY;
}

/// Convert an RGBA color with components in `[0, 1]` to `#RRGGBB`
pub fn rgba_to_hex(rgba: [f64; 4]) -> String {
    let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02X}{:02X}{:02X}",
        channel(rgba[0]),
        channel(rgba[1]),
        channel(rgba[2])
    )
}

#[derive(Debug, Clone)]
enum Layer {
    Lines {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
        width: f64,
        caption: Option<String>,
    },
    Points {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
        size: f64,
        symbol: char,
        caption: Option<String>,
    },
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

    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Plot a trajectory, colored red to blue as time advances
    pub fn plot_trajectory(
        &mut self,
        traj: &Trajectory<PositionVelocity>,
        caption: &str,
    ) -> &mut Self {
        let states = traj.states();
        let times = traj.times();

        for (i, w) in states.windows(2).enumerate() {
            self.layers.push(Layer::Lines {
                x: vec![w[0].x(), w[1].x()],
                y: vec![w[0].y(), w[1].y()],
                color: rgba_to_hex(traj.color_at(times[i])),
                width: 2.5,
                caption: if i == 0 { Some(caption.to_string()) } else { None },
            });
        }
        self
    }

    /// Plot every edge of an explored tree
    pub fn plot_graph(&mut self, graph: &PlanningGraph<PositionVelocity>) -> &mut Self {
        for (i, (_, _, traj)) in graph.edges().enumerate() {
            self.layers.push(Layer::Lines {
                x: traj.states().iter().map(|s| s.x()).collect(),
                y: traj.states().iter().map(|s| s.y()).collect(),
                color: colors::TREE.to_string(),
                width: 0.5,
                caption: if i == 0 { Some("Tree".to_string()) } else { None },
            });
        }
        self
    }

    /// Plot obstacle outlines in the XY plane
    pub fn plot_obstacles(&mut self, obstacles: &[SphereObstacle]) -> &mut Self {
        const N_SEGMENTS: usize = 36;
        for (i, obs) in obstacles.iter().enumerate() {
            let angles = (0..=N_SEGMENTS)
                .map(|k| 2.0 * std::f64::consts::PI * k as f64 / N_SEGMENTS as f64);
            self.layers.push(Layer::Lines {
                x: angles.clone().map(|a| obs.center[0] + obs.radius * a.cos()).collect(),
                y: angles.map(|a| obs.center[1] + obs.radius * a.sin()).collect(),
                color: colors::OBSTACLE.to_string(),
                width: 1.5,
                caption: if i == 0 { Some("Obstacles".to_string()) } else { None },
            });
        }
        self
    }

    fn plot_marker(&mut self, state: &PositionVelocity, color: &str, caption: &str) -> &mut Self {
        self.layers.push(Layer::Points {
            x: vec![state.x()],
            y: vec![state.y()],
            color: color.to_string(),
            size: 1.5,
            symbol: 'O',
            caption: Some(caption.to_string()),
        });
        self
    }

    pub fn plot_start(&mut self, state: &PositionVelocity) -> &mut Self {
        self.plot_marker(state, colors::START, "Start")
    }

    pub fn plot_goal(&mut self, state: &PositionVelocity) -> &mut Self {
        self.plot_marker(state, colors::GOAL, "Goal")
    }

    /// Finalize and show the plot
    pub fn show(&self) -> PlanningResult<()> {
        let mut figure = self.render();
        figure
            .show()
            .map(|_| ())
            .map_err(|e| PlanningError::VisualizationError(e.to_string()))
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> PlanningResult<()> {
        let mut figure = self.render();
        figure
            .save_to_png(path, width, height)
            .map_err(|e| PlanningError::VisualizationError(e.to_string()))
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for layer in &self.layers {
            match layer {
                Layer::Lines {
                    x,
                    y,
                    color,
                    width,
                    caption,
                } => {
                    let mut options = vec![Color(color.as_str()), LineWidth(*width)];
                    if let Some(caption) = caption {
                        options.push(Caption(caption.as_str()));
                    }
                    axes.lines(x, y, &options);
                }
                Layer::Points {
                    x,
                    y,
                    color,
                    size,
                    symbol,
                    caption,
                } => {
                    let mut options = vec![
                        Color(color.as_str()),
                        PointSymbol(*symbol),
                        PointSize(*size),
                    ];
                    if let Some(caption) = caption {
                        options.push(Caption(caption.as_str()));
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

        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
