//! Straight-line edge planner for position/velocity states
//!
//! Connects two states with a constant-speed straight segment, checked
//! for collisions at a fixed spatial resolution.

use crate::common::{
    EdgePlanner, PlanningError, PlanningResult, PositionVelocity, SphereObstacle, StateBounds,
};
use crate::planning::trajectory::Trajectory;

/// Configuration for the straight-line connector
#[derive(Debug, Clone)]
pub struct StraightLineConfig {
    /// Travel speed along the segment [m/s]
    pub speed: f64,
    /// Spacing of collision-checked samples [m]
    pub resolution: f64,
    /// Longest segment the connector will attempt [m]
    pub max_edge_length: f64,
    /// Robot radius for collision checking [m]
    pub robot_radius: f64,
}

impl Default for StraightLineConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            resolution: 0.1,
            max_edge_length: 3.0,
            robot_radius: 0.2,
        }
    }
}

/// Edge planner producing constant-speed straight segments
#[derive(Debug, Clone)]
pub struct StraightLineConnector {
    config: StraightLineConfig,
    obstacles: Vec<SphereObstacle>,
    bounds: Option<StateBounds>,
}

impl StraightLineConnector {
    pub fn new(
        obstacles: Vec<SphereObstacle>,
        bounds: Option<StateBounds>,
        config: StraightLineConfig,
    ) -> PlanningResult<Self> {
        if !(config.speed > 0.0) || !config.speed.is_finite() {
            return Err(PlanningError::InvalidParameter(format!(
                "speed must be positive, got {}",
                config.speed
            )));
        }
        if !(config.resolution > 0.0) {
            return Err(PlanningError::InvalidParameter(format!(
                "resolution must be positive, got {}",
                config.resolution
            )));
        }
        Ok(Self {
            config,
            obstacles,
            bounds,
        })
    }

    pub fn config(&self) -> &StraightLineConfig {
        &self.config
    }

    pub fn obstacles(&self) -> &[SphereObstacle] {
        &self.obstacles
    }

    fn is_free(&self, state: &PositionVelocity) -> bool {
        if let Some(bounds) = &self.bounds {
            if !bounds.contains_position(&state.position) {
                return false;
            }
        }
        let clearance = self.config.robot_radius;
        self.obstacles
            .iter()
            .all(|obs| (state.position - obs.center).norm() > obs.radius + clearance)
    }
}

impl EdgePlanner<PositionVelocity> for StraightLineConnector {
    fn attempt_connect(
        &self,
        from: &PositionVelocity,
        to: &PositionVelocity,
        start_time: f64,
    ) -> Trajectory<PositionVelocity> {
        let length = (to.position - from.position).norm();
        if length > self.config.max_edge_length {
            return Trajectory::empty();
        }

        let n_expand = ((length / self.config.resolution).ceil() as usize).max(1);
        let duration = length / self.config.speed;

        let mut states = Vec::with_capacity(n_expand + 1);
        let mut times = Vec::with_capacity(n_expand + 1);
        for i in 0..=n_expand {
            let frac = i as f64 / n_expand as f64;
            let state = *from * (1.0 - frac) + *to * frac;
            if !self.is_free(&state) {
                return Trajectory::empty();
            }
            states.push(state);
            times.push(start_time + frac * duration);
        }

        Trajectory::new(states, times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pv(x: f64, y: f64) -> PositionVelocity {
        PositionVelocity::new(x, y, 0.0, 0.0, 0.0, 0.0)
    }

    fn connector(obstacles: Vec<SphereObstacle>) -> StraightLineConnector {
        let bounds = StateBounds::planar(-5.0, 5.0, -5.0, 5.0).unwrap();
        let config = StraightLineConfig {
            speed: 2.0,
            ..Default::default()
        };
        StraightLineConnector::new(obstacles, Some(bounds), config).unwrap()
    }

    #[test]
    fn test_free_segment_timing() {
        let planner = connector(Vec::new());
        let traj = planner.attempt_connect(&pv(0.0, 0.0), &pv(2.0, 0.0), 1.0);
        assert!(!traj.is_empty());
        assert_eq!(traj.first_state(), Some(&pv(0.0, 0.0)));
        assert!((traj.last_state().unwrap().x() - 2.0).abs() < 1e-10);
        assert!((traj.first_time().unwrap() - 1.0).abs() < 1e-10);
        assert!((traj.duration() - 1.0).abs() < 1e-10);
        assert!((planner.cost(&traj) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_long_edges() {
        let planner = connector(Vec::new());
        assert!(planner.attempt_connect(&pv(0.0, 0.0), &pv(3.5, 0.0), 0.0).is_empty());
    }

    #[test]
    fn test_rejects_collisions_and_leaving_bounds() {
        let planner = connector(vec![SphereObstacle::new(1.0, 0.0, 0.0, 0.3)]);
        assert!(planner.attempt_connect(&pv(0.0, 0.0), &pv(2.0, 0.0), 0.0).is_empty());
        assert!(!planner.attempt_connect(&pv(0.0, 1.0), &pv(2.0, 1.0), 0.0).is_empty());
        assert!(planner.attempt_connect(&pv(4.0, 4.0), &pv(6.0, 4.0), 0.0).is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let config = StraightLineConfig {
            speed: 0.0,
            ..Default::default()
        };
        assert!(StraightLineConnector::new(Vec::new(), None, config).is_err());
    }
}
