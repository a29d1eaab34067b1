//! Brute-force nearest-neighbor index over planning nodes

use std::marker::PhantomData;

use itertools::Itertools;
use nalgebra::DVector;
use ordered_float::OrderedFloat;

use crate::common::{SearchIndex, State};
use crate::planning::node::NodeId;

/// Linear-scan [`SearchIndex`]
///
/// Keeps each node's flattened state and answers queries by measuring
/// every entry. Good enough for the few thousand nodes a single planning
/// cycle produces.
#[derive(Debug, Clone)]
pub struct SearchableSet<S> {
    entries: Vec<(NodeId, DVector<f64>)>,
    initial: NodeId,
    _state: PhantomData<fn() -> S>,
}

impl<S: State> SearchableSet<S> {
    fn distances<'a>(&'a self, query: &S) -> impl Iterator<Item = (OrderedFloat<f64>, NodeId)> + 'a
    where
        S: 'a,
    {
        let q = query.to_vector();
        self.entries
            .iter()
            .map(move |(id, v)| (OrderedFloat((v - &q).norm()), *id))
    }
}

impl<S: State> SearchIndex<S> for SearchableSet<S> {
    fn with_initial_node(id: NodeId, state: &S) -> Self {
        Self {
            entries: vec![(id, state.to_vector())],
            initial: id,
            _state: PhantomData,
        }
    }

    fn insert(&mut self, id: NodeId, state: &S) {
        self.entries.push((id, state.to_vector()));
    }

    fn k_nearest(&self, query: &S, k: usize) -> Vec<NodeId> {
        self.distances(query)
            .k_smallest(k)
            .map(|(_, id)| id)
            .collect()
    }

    fn within_radius(&self, query: &S, radius: f64) -> Vec<NodeId> {
        self.distances(query)
            .filter(|(d, _)| d.0 <= radius)
            .map(|(_, id)| id)
            .collect()
    }

    fn initial_node(&self) -> NodeId {
        self.initial
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
