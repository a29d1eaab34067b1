// Graph dynamic planner demo
//
// Plans a path for a point robot through a field of circular obstacles,
// optionally reading the planner config from the YAML file given as the
// first argument, and plots the result with the explored tree.

use std::env;

use tracing::{info, warn};

use rust_dynamic_planning::planning::{StraightLineConfig, StraightLineConnector};
use rust_dynamic_planning::utils::Visualizer;
use rust_dynamic_planning::{
    GraphDynamicPlanner, GraphPlannerConfig, PlanningResult, PositionVelocity, SphereObstacle,
    StateBounds,
};

fn main() -> PlanningResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => GraphPlannerConfig::from_yaml_file(&path)?,
        None => GraphPlannerConfig {
            search_radius: 1.5,
            max_runtime: 0.5,
            seed: Some(7),
            ..Default::default()
        },
    };
    info!(?config, "planner configuration");

    let obstacles = vec![
        SphereObstacle::new(3.0, 3.0, 0.0, 1.0),
        SphereObstacle::new(5.0, 6.5, 0.0, 1.2),
        SphereObstacle::new(7.0, 2.5, 0.0, 0.8),
    ];
    let bounds = StateBounds::planar(0.0, 10.0, 0.0, 10.0)?;
    let connector = StraightLineConnector::new(
        obstacles.clone(),
        Some(bounds.clone()),
        StraightLineConfig::default(),
    )?;

    let mut planner: GraphDynamicPlanner<PositionVelocity, StraightLineConnector> =
        GraphDynamicPlanner::new(config, bounds, connector)?;

    let start = PositionVelocity::new(1.0, 1.0, 0.0, 0.0, 0.0, 0.0);
    let goal = PositionVelocity::new(9.0, 9.0, 0.0, 0.0, 0.0, 0.0);

    let traj = planner.plan(&start, &goal, 0.0);
    if traj.is_empty() {
        warn!("planner returned no trajectory");
    } else {
        info!(
            samples = traj.len(),
            duration = traj.duration(),
            "planned trajectory"
        );
    }

    let mut vis = Visualizer::new();
    vis.set_title("Graph Dynamic Planner")
        .set_x_range(0.0, 10.0)
        .set_y_range(0.0, 10.0);
    if let Some(graph) = planner.last_graph() {
        info!(nodes = graph.len(), "explored tree");
        vis.plot_graph(graph);
    }
    vis.plot_obstacles(&obstacles)
        .plot_trajectory(&traj, "Trajectory")
        .plot_start(&start)
        .plot_goal(&goal);

    let img_dir = format!("{}/img", env!("CARGO_MANIFEST_DIR"));
    std::fs::create_dir_all(&img_dir)?;
    vis.save_png(&format!("{}/graph_dynamic_planner.png", img_dir), 800, 800)?;
    vis.show()?;

    Ok(())
}
