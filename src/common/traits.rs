//! Common traits defining the collaborator contracts of the planning core

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use nalgebra::DVector;
use rand::Rng;

use crate::planning::{NodeId, Trajectory};

/// Trait for states the planner can search over
///
/// Beyond vector-space arithmetic (used for linear interpolation), a
/// state only has to flatten into a numeric vector and be drawable at
/// random from its planning domain.
pub trait State:
    Clone + Debug + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
    /// Region that random samples are drawn from
    type Domain;

    /// Flatten into a fixed-size numeric vector
    fn to_vector(&self) -> DVector<f64>;

    /// Draw a random state from the domain
    fn sample<R: Rng + ?Sized>(domain: &Self::Domain, rng: &mut R) -> Self;

    /// Euclidean distance between flattened states
    fn distance(&self, other: &Self) -> f64 {
        (self.to_vector() - other.to_vector()).norm()
    }
}

/// Trait for per-robot edge planners
///
/// An empty trajectory means the two states cannot be connected. That is
/// the common case while sampling, so it is not reported as an error.
pub trait EdgePlanner<S: State> {
    /// Try to connect `from` to `to`, departing at `start_time`
    fn attempt_connect(&self, from: &S, to: &S, start_time: f64) -> Trajectory<S>;

    /// Cost of traversing an edge. Defaults to its duration.
    fn cost(&self, traj: &Trajectory<S>) -> f64 {
        traj.duration()
    }
}

/// Trait for nearest-neighbor indices over planning graph nodes
pub trait SearchIndex<S: State> {
    /// Create an index holding a single designated initial node
    fn with_initial_node(id: NodeId, state: &S) -> Self
    where
        Self: Sized;

    /// Register a node under its state
    fn insert(&mut self, id: NodeId, state: &S);

    /// Up to `k` nodes ordered by increasing distance to `query`
    fn k_nearest(&self, query: &S, k: usize) -> Vec<NodeId>;

    /// All nodes within `radius` of `query`, in no particular order
    fn within_radius(&self, query: &S, radius: f64) -> Vec<NodeId>;

    /// The node this index was created with
    fn initial_node(&self) -> NodeId;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for planners producing timed trajectories between two states
pub trait DynamicPlanner<S: State> {
    /// Plan from start to goal, departing at `start_time`
    ///
    /// An empty trajectory means no commitment could be made this cycle.
    fn plan(&mut self, start: &S, goal: &S, start_time: f64) -> Trajectory<S>;
}
