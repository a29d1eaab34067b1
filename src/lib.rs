//! RustDynamicPlanning - graph-based dynamic planning with recursive feasibility
//!
//! This crate grows a tree of dynamically feasible trajectories and only
//! commits to plans that end somewhere the robot can stay safe, falling
//! back to a verified loop when the goal cannot be reached in time.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod planning;

// Re-export common types for convenience
pub use common::{PositionVelocity, SphereObstacle, StateBounds};
pub use common::{DynamicPlanner, EdgePlanner, SearchIndex, State};
pub use common::{PlanningError, PlanningResult};
pub use planning::{GraphDynamicPlanner, GraphPlannerConfig, PlanningGraph, Trajectory};
