//! Timestamped state sequences with linear interpolation
//!
//! Edge planners produce trajectories, the planning graph stores one per
//! tree edge, and extraction concatenates them into the planner output.

use std::time::Duration;

use tracing::warn;

use crate::common::{PlanningError, PlanningResult, State};
use crate::planning::node::same_vertex;
use crate::utils::throttle::LogThrottle;

static CLAMP_THROTTLE: LogThrottle = LogThrottle::new(Duration::from_secs(1));

/// Time-ordered sequence of states
#[derive(Debug, Clone)]
pub struct Trajectory<S> {
    states: Vec<S>,
    times: Vec<f64>,
}

impl<S> Default for Trajectory<S> {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            times: Vec::new(),
        }
    }
}

impl<S: State> Trajectory<S> {
    /// Build from parallel state/time lists
    ///
    /// Mismatched lengths are truncated to the shorter list, and a time
    /// that runs backwards is raised to its predecessor.
    pub fn new(mut states: Vec<S>, mut times: Vec<f64>) -> Self {
        if states.len() != times.len() {
            warn!(
                states = states.len(),
                times = times.len(),
                "Trajectory: states/times are not the same length, truncating"
            );
            let n = states.len().min(times.len());
            states.truncate(n);
            times.truncate(n);
        }

        for i in 1..times.len() {
            if times[i - 1] > times[i] {
                warn!(index = i, "Trajectory: fixing an inversion in the list of times");
                times[i] = times[i - 1];
            }
        }

        Self { states, times }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Join segments end to end
    ///
    /// Each segment is shifted to start when the previous one ends. A
    /// segment whose first state repeats the previous last state loses
    /// that first sample.
    pub fn concatenate<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = Trajectory<S>>,
    {
        let mut states: Vec<S> = Vec::new();
        let mut times: Vec<f64> = Vec::new();

        for mut segment in segments {
            if segment.is_empty() {
                continue;
            }

            let skip = match (states.last(), times.last()) {
                (Some(last_state), Some(&end)) => {
                    segment.reset_first_time(end);
                    usize::from(same_vertex(last_state, &segment.states[0]))
                }
                _ => 0,
            };

            states.extend(segment.states.into_iter().skip(skip));
            times.extend(segment.times.into_iter().skip(skip));
        }

        Self { states, times }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn first_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    pub fn first_state(&self) -> Option<&S> {
        self.states.first()
    }

    pub fn last_state(&self) -> Option<&S> {
        self.states.last()
    }

    /// Last time minus first time, zero when empty
    pub fn duration(&self) -> f64 {
        match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// State at time `t`, linearly interpolated
    ///
    /// Times outside the trajectory clamp to the first or last state and
    /// emit a (throttled) warning. A NaN time has no place to clamp to and
    /// is rejected.
    pub fn interpolate(&self, t: f64) -> PlanningResult<S> {
        let (first, last) = match (self.states.first(), self.states.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(PlanningError::EmptyTrajectory),
        };
        if t.is_nan() {
            return Err(PlanningError::InvalidParameter(
                "cannot interpolate at a NaN time".to_string(),
            ));
        }

        let hi = self.times.partition_point(|&time| time < t);

        if hi == 0 {
            if t < self.times[0] && CLAMP_THROTTLE.ready() {
                warn!(
                    t,
                    first_time = self.times[0],
                    "Trajectory: interpolating before first time"
                );
            }
            return Ok(first.clone());
        }

        if hi == self.times.len() {
            if CLAMP_THROTTLE.ready() {
                warn!(
                    t,
                    last_time = self.times[hi - 1],
                    "Trajectory: interpolating after last time"
                );
            }
            return Ok(last.clone());
        }

        // times[lo] < t <= times[hi], so the interval is never degenerate
        let lo = hi - 1;
        let frac = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        Ok(self.states[lo].clone() * (1.0 - frac) + self.states[hi].clone() * frac)
    }

    /// Shift every timestamp so the trajectory begins at `t`
    pub fn reset_first_time(&mut self, t: f64) {
        if let Some(&first) = self.times.first() {
            let shift = t - first;
            for time in &mut self.times {
                *time += shift;
            }
        }
    }

    /// RGBA color for time `t`, fading red to blue over the trajectory
    pub fn color_at(&self, t: f64) -> [f64; 4] {
        let duration = self.duration();
        let r = match self.first_time() {
            Some(first) if duration > 0.0 => ((t - first) / duration).clamp(0.0, 1.0),
            _ => 0.0,
        };
        [r, 0.0, 1.0 - r, 0.9]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PositionVelocity;

    fn pv(x: f64, y: f64) -> PositionVelocity {
        PositionVelocity::new(x, y, 0.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_interpolate_midpoint_and_clamping() {
        let traj = Trajectory::new(vec![pv(0.0, 0.0), pv(4.0, -2.0)], vec![0.0, 10.0]);

        let mid = traj.interpolate(5.0).unwrap();
        assert!((mid.x() - 2.0).abs() < 1e-10);
        assert!((mid.y() + 1.0).abs() < 1e-10);

        assert_eq!(traj.interpolate(-1.0).unwrap(), pv(0.0, 0.0));
        assert_eq!(traj.interpolate(11.0).unwrap(), pv(4.0, -2.0));
        assert_eq!(traj.interpolate(10.0).unwrap(), pv(4.0, -2.0));
    }

    #[test]
    fn test_interpolate_empty_is_error() {
        let traj: Trajectory<PositionVelocity> = Trajectory::empty();
        assert!(matches!(traj.interpolate(0.0), Err(PlanningError::EmptyTrajectory)));
    }

    #[test]
    fn test_interpolate_non_finite_times() {
        let traj = Trajectory::new(vec![pv(0.0, 0.0), pv(4.0, -2.0)], vec![0.0, 10.0]);
        assert!(matches!(traj.interpolate(f64::NAN), Err(PlanningError::InvalidParameter(_))));
        assert_eq!(traj.interpolate(f64::NEG_INFINITY).unwrap(), pv(0.0, 0.0));
        assert_eq!(traj.interpolate(f64::INFINITY).unwrap(), pv(4.0, -2.0));
    }

    #[test]
    fn test_repairs_time_inversions() {
        let traj = Trajectory::new(
            vec![pv(0.0, 0.0), pv(1.0, 0.0), pv(2.0, 0.0)],
            vec![0.0, 5.0, 3.0],
        );
        assert_eq!(traj.times(), &[0.0, 5.0, 5.0]);
        assert!(traj.times().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_truncates_length_mismatch() {
        let traj = Trajectory::new(
            vec![pv(0.0, 0.0), pv(1.0, 0.0), pv(2.0, 0.0)],
            vec![0.0, 1.0],
        );
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.times().len(), 2);

        let traj = Trajectory::new(vec![pv(0.0, 0.0)], vec![0.0, 1.0, 2.0]);
        assert_eq!(traj.len(), 1);
        assert_eq!(traj.times(), &[0.0]);
    }

    #[test]
    fn test_duration_and_reset_first_time() {
        let mut traj = Trajectory::new(vec![pv(0.0, 0.0), pv(1.0, 0.0)], vec![2.0, 5.5]);
        assert!((traj.duration() - 3.5).abs() < 1e-10);

        traj.reset_first_time(10.0);
        assert_eq!(traj.first_time(), Some(10.0));
        assert_eq!(traj.last_time(), Some(13.5));
        assert!((traj.duration() - 3.5).abs() < 1e-10);

        let empty: Trajectory<PositionVelocity> = Trajectory::empty();
        assert_eq!(empty.duration(), 0.0);
    }

    #[test]
    fn test_concatenate_is_continuous() {
        let a = Trajectory::new(vec![pv(0.0, 0.0), pv(1.0, 0.0)], vec![0.0, 1.0]);
        // Second leg was planned against a stale departure time
        let b = Trajectory::new(vec![pv(1.0, 0.0), pv(1.0, 2.0)], vec![7.0, 9.0]);

        let joined = Trajectory::concatenate(vec![a, Trajectory::empty(), b]);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.times(), &[0.0, 1.0, 3.0]);
        assert_eq!(joined.first_state(), Some(&pv(0.0, 0.0)));
        assert_eq!(joined.last_state(), Some(&pv(1.0, 2.0)));
    }

    #[test]
    fn test_concatenate_keeps_distinct_junction_samples() {
        let a = Trajectory::new(vec![pv(0.0, 0.0), pv(1.0, 0.0)], vec![0.0, 1.0]);
        let b = Trajectory::new(vec![pv(1.5, 0.0), pv(2.0, 0.0)], vec![0.0, 1.0]);
        let joined = Trajectory::concatenate(vec![a, b]);
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.times(), &[0.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_color_gradient() {
        let traj = Trajectory::new(vec![pv(0.0, 0.0), pv(1.0, 0.0)], vec![0.0, 4.0]);
        assert_eq!(traj.color_at(0.0), [0.0, 0.0, 1.0, 0.9]);
        assert_eq!(traj.color_at(2.0), [0.5, 0.0, 0.5, 0.9]);
        assert_eq!(traj.color_at(100.0), [1.0, 0.0, 0.0, 0.9]);
    }
}
