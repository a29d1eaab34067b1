//! Nodes of the implicit planning tree and the arena that owns them
//!
//! Every node lives in a [`PlanningGraph`] and is addressed by its
//! [`NodeId`]. `children` are the forward tree edges, `best_parent` is a
//! plain back-reference used to walk toward the root. Traversals mutate
//! nodes in place, so one graph must only ever be walked by one caller
//! at a time.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::error;

use crate::common::State;
use crate::planning::trajectory::Trajectory;
use crate::utils::throttle::LogThrottle;

/// Distance below which two states are the same vertex
pub const VERTEX_TOLERANCE: f64 = 1e-8;

static MISSING_PARENT_THROTTLE: LogThrottle = LogThrottle::new(Duration::from_secs(1));
static INCONSISTENCY_THROTTLE: LogThrottle = LogThrottle::new(Duration::from_secs(1));
static RUNAWAY_WALK_THROTTLE: LogThrottle = LogThrottle::new(Duration::from_secs(1));

/// True if the two states are numerically equal within [`VERTEX_TOLERANCE`]
pub fn same_vertex<S: State>(a: &S, b: &S) -> bool {
    (a.to_vector() - b.to_vector()).norm() < VERTEX_TOLERANCE
}

/// Stable handle to a node inside a [`PlanningGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Vertex of the planning tree
#[derive(Debug, Clone)]
pub struct Node<S> {
    pub state: S,
    /// Arrival time along the best path, infinite until connected
    pub time: f64,
    /// Cost along the best-parent chain, infinite until connected
    pub cost_to_come: f64,
    pub is_viable: bool,
    pub best_parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Edge to `children[i]` is `trajs_to_children[i]`
    pub trajs_to_children: Vec<Trajectory<S>>,
}

impl<S: State> Node<S> {
    /// Tree root: connected at `time` with zero cost, viable by construction
    pub fn root(state: S, time: f64) -> Self {
        Self {
            state,
            time,
            cost_to_come: 0.0,
            is_viable: true,
            best_parent: None,
            children: Vec::new(),
            trajs_to_children: Vec::new(),
        }
    }

    /// Goal node, eligible as a connection target but not yet reached
    pub fn goal(state: S) -> Self {
        Self {
            state,
            time: f64::INFINITY,
            cost_to_come: f64::INFINITY,
            is_viable: true,
            best_parent: None,
            children: Vec::new(),
            trajs_to_children: Vec::new(),
        }
    }
}

/// Append-only arena of planning nodes
#[derive(Debug, Clone)]
pub struct PlanningGraph<S> {
    nodes: Vec<Node<S>>,
}

impl<S> Default for PlanningGraph<S> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<S: State> PlanningGraph<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node<S>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<S>)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Every forward edge as `(parent, child, trajectory)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Trajectory<S>)> {
        self.iter().flat_map(|(id, node)| {
            node.children
                .iter()
                .zip(node.trajs_to_children.iter())
                .map(move |(&child, traj)| (id, child, traj))
        })
    }

    /// Record a forward edge without touching the child's bookkeeping
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, traj: Trajectory<S>) {
        let node = &mut self.nodes[parent.0];
        node.children.push(child);
        node.trajs_to_children.push(traj);
    }

    /// Create an unviable node reached from `parent` along `traj`
    pub fn attach(
        &mut self,
        parent: NodeId,
        state: S,
        traj: Trajectory<S>,
        edge_cost: f64,
    ) -> NodeId {
        let (parent_time, parent_cost) = {
            let p = &self.nodes[parent.0];
            (p.time, p.cost_to_come)
        };
        let id = self.add_node(Node {
            state,
            time: parent_time + traj.duration(),
            cost_to_come: parent_cost + edge_cost,
            is_viable: false,
            best_parent: Some(parent),
            children: Vec::new(),
            trajs_to_children: Vec::new(),
        });
        self.add_child(parent, id, traj);
        id
    }

    pub fn same_vertex_ids(&self, a: NodeId, b: NodeId) -> bool {
        a == b || same_vertex(&self.nodes[a.0].state, &self.nodes[b.0].state)
    }

    /// Position of `child` among `parent`'s children, matched by state
    pub fn edge_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| self.same_vertex_ids(c, child))
    }

    /// Mark `from` and its unviable ancestors viable
    ///
    /// Stops at the first ancestor that is already viable. Returns the
    /// number of nodes marked.
    pub fn mark_ancestors_viable(&mut self, from: NodeId) -> usize {
        let mut marked = 0;
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.0];
            if node.is_viable {
                break;
            }
            node.is_viable = true;
            marked += 1;
            cursor = node.best_parent;
        }
        marked
    }

    /// Breadth-first refresh of times and costs below `from`
    ///
    /// Every visited edge is re-anchored to its parent's time. A child is
    /// rewired to the visited node when it has no best parent, when the
    /// visited node already is its best parent, or when its best parent
    /// has a higher cost-to-come. `anchor` is never expanded and never
    /// re-parented.
    ///
    /// A node is expanded again only after its cost-to-come strictly
    /// drops, so the walk ends on cycles as long as edge costs are
    /// non-negative.
    pub fn update_descendants<F>(&mut self, from: NodeId, anchor: NodeId, cost: F)
    where
        F: Fn(&Trajectory<S>) -> f64,
    {
        let mut queue = VecDeque::from([from]);
        let mut expanded_at: HashMap<NodeId, f64> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            if current == anchor {
                continue;
            }

            let (time, cost_to_come) = {
                let node = &self.nodes[current.0];
                (node.time, node.cost_to_come)
            };

            if let Some(&previous) = expanded_at.get(&current) {
                if !(cost_to_come < previous) {
                    continue;
                }
            }
            expanded_at.insert(current, cost_to_come);

            for ii in 0..self.nodes[current.0].children.len() {
                let child = self.nodes[current.0].children[ii];
                queue.push_back(child);

                let traj = &mut self.nodes[current.0].trajs_to_children[ii];
                traj.reset_first_time(time);
                let duration = traj.duration();
                let edge_cost = cost(&*traj);

                if child == anchor {
                    continue;
                }

                let rewire = match self.nodes[child.0].best_parent {
                    None => true,
                    Some(parent) if parent == current => true,
                    Some(parent) => self.nodes[parent.0].cost_to_come > cost_to_come,
                };

                if rewire {
                    let child_node = &mut self.nodes[child.0];
                    child_node.best_parent = Some(current);
                    child_node.time = time + duration;
                    child_node.cost_to_come = cost_to_come + edge_cost;
                }
            }
        }
    }

    /// Trajectory from `start` to `goal` along best-parent links
    ///
    /// Nodes are compared by state. When `start` and `goal` coincide the
    /// walk takes at least one step, so a closed loop is returned rather
    /// than nothing. A broken link truncates the result at that point.
    pub fn extract_trajectory(&self, start: NodeId, goal: NodeId) -> Trajectory<S> {
        let mut segments: VecDeque<Trajectory<S>> = VecDeque::new();
        let mut node = goal;
        let mut steps = 0;

        while !self.same_vertex_ids(node, start) || segments.is_empty() {
            if steps > self.nodes.len() {
                if RUNAWAY_WALK_THROTTLE.ready() {
                    error!(steps, "Extraction: best-parent walk does not reach start");
                }
                break;
            }
            steps += 1;

            let Some(parent) = self.nodes[node.0].best_parent else {
                if MISSING_PARENT_THROTTLE.ready() {
                    error!(node = node.0, "Extraction: parent was null");
                }
                break;
            };

            match self.edge_index(parent, node) {
                Some(ii) => {
                    segments.push_front(self.nodes[parent.0].trajs_to_children[ii].clone())
                }
                None => {
                    if INCONSISTENCY_THROTTLE.ready() {
                        error!(
                            parent = parent.0,
                            child = node.0,
                            "Extraction: parent/child inconsistency"
                        );
                    }
                    break;
                }
            }

            node = parent;
        }

        Trajectory::concatenate(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PositionVelocity;

    fn pv(x: f64, y: f64) -> PositionVelocity {
        PositionVelocity::new(x, y, 0.0, 0.0, 0.0, 0.0)
    }

    fn edge(
        graph: &PlanningGraph<PositionVelocity>,
        from: NodeId,
        to: PositionVelocity,
    ) -> Trajectory<PositionVelocity> {
        let start = graph.node(from);
        let t0 = if start.time.is_finite() { start.time } else { 0.0 };
        let duration = start.state.distance(&to);
        Trajectory::new(vec![start.state, to], vec![t0, t0 + duration])
    }

    fn grow(
        graph: &mut PlanningGraph<PositionVelocity>,
        parent: NodeId,
        to: PositionVelocity,
    ) -> NodeId {
        let traj = edge(graph, parent, to);
        let cost = traj.duration();
        graph.attach(parent, to, traj, cost)
    }

    fn assert_parent_child_consistent(graph: &PlanningGraph<PositionVelocity>, root: NodeId) {
        for (id, node) in graph.iter() {
            if id == root {
                continue;
            }
            let Some(parent) = node.best_parent else { continue };
            let p = graph.node(parent);
            let hits: Vec<usize> = p
                .children
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c == id)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(hits.len(), 1, "node {:?} listed {} times", id, hits.len());
            let traj = &p.trajs_to_children[hits[0]];
            assert!(same_vertex(traj.first_state().unwrap(), &p.state));
            assert!(same_vertex(traj.last_state().unwrap(), &node.state));
        }
    }

    fn assert_costs_follow_best_parents(graph: &PlanningGraph<PositionVelocity>, root: NodeId) {
        for (id, node) in graph.iter() {
            if id == root {
                continue;
            }
            let Some(parent) = node.best_parent else { continue };
            let p = graph.node(parent);
            let ii = graph.edge_index(parent, id).unwrap();
            let traj = &p.trajs_to_children[ii];
            let expected_cost = p.cost_to_come + traj.duration();
            let expected_time = p.time + traj.duration();
            assert!((node.cost_to_come - expected_cost).abs() < 1e-10, "cost of {:?}", id);
            assert!((node.time - expected_time).abs() < 1e-10, "time of {:?}", id);
        }
    }

    #[test]
    fn test_attach_accumulates_time_and_cost() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 2.0));
        let a = grow(&mut graph, root, pv(3.0, 4.0));
        let b = grow(&mut graph, a, pv(3.0, 5.0));

        assert!((graph.node(a).time - 7.0).abs() < 1e-10);
        assert!((graph.node(a).cost_to_come - 5.0).abs() < 1e-10);
        assert!((graph.node(b).time - 8.0).abs() < 1e-10);
        assert!((graph.node(b).cost_to_come - 6.0).abs() < 1e-10);
        assert!(!graph.node(b).is_viable);
        assert_eq!(graph.node(b).best_parent, Some(a));
        assert_parent_child_consistent(&graph, root);
    }

    #[test]
    fn test_mark_ancestors_viable_stops_at_viable() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let b = grow(&mut graph, a, pv(2.0, 0.0));
        let c = grow(&mut graph, b, pv(3.0, 0.0));

        assert_eq!(graph.mark_ancestors_viable(b), 2);
        assert!(graph.node(a).is_viable && graph.node(b).is_viable);
        assert!(!graph.node(c).is_viable);

        assert_eq!(graph.mark_ancestors_viable(c), 1);
        assert_eq!(graph.mark_ancestors_viable(c), 0);
        assert!(graph.iter().all(|(_, n)| n.is_viable));
    }

    #[test]
    fn test_update_descendants_propagates_new_timing() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let b = grow(&mut graph, a, pv(2.0, 0.0));
        let c = grow(&mut graph, b, pv(2.0, 2.0));
        let d = grow(&mut graph, a, pv(1.0, 1.0));

        // Pretend `a` was reached along a slower path
        {
            let node = graph.node_mut(a);
            node.time = 10.0;
            node.cost_to_come = 4.0;
        }
        graph.update_descendants(a, root, |traj| traj.duration());

        for &(id, time, cost) in &[(b, 11.0, 5.0), (c, 13.0, 7.0), (d, 11.0, 5.0)] {
            let node = graph.node(id);
            assert!((node.time - time).abs() < 1e-10, "time of {:?}", id);
            assert!((node.cost_to_come - cost).abs() < 1e-10, "cost of {:?}", id);
        }

        // Every edge below `a` departs when its parent arrives
        for (parent, child, traj) in graph.edges() {
            if parent == root {
                continue;
            }
            assert!((traj.first_time().unwrap() - graph.node(parent).time).abs() < 1e-10);
            let expected = graph.node(parent).cost_to_come + traj.duration();
            assert!((graph.node(child).cost_to_come - expected).abs() < 1e-10);
        }
        assert_parent_child_consistent(&graph, root);
    }

    #[test]
    fn test_update_descendants_rewires_to_cheaper_parent() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let far = grow(&mut graph, root, pv(5.0, 0.0));
        let near = grow(&mut graph, root, pv(1.0, 0.0));
        let target = grow(&mut graph, far, pv(2.0, 0.0));
        assert!((graph.node(target).cost_to_come - 8.0).abs() < 1e-10);

        let traj = edge(&graph, near, pv(2.0, 0.0));
        graph.add_child(near, target, traj);
        graph.update_descendants(near, root, |traj| traj.duration());

        let node = graph.node(target);
        assert_eq!(node.best_parent, Some(near));
        assert!((node.cost_to_come - 2.0).abs() < 1e-10);
        assert!((node.time - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_update_descendants_refreshes_subtree_after_late_rewire() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));

        // Long way round: a -> b -> d -> e
        let b = grow(&mut graph, a, pv(1.0, 5.0));
        let d = grow(&mut graph, b, pv(2.0, 5.0));
        let e = grow(&mut graph, d, pv(3.0, 5.0));

        // Short way round: a -> c1 -> c2, then an edge c2 -> d
        let c1 = grow(&mut graph, a, pv(1.5, 2.5));
        let c2 = grow(&mut graph, c1, pv(2.0, 4.5));
        let traj = edge(&graph, c2, pv(2.0, 5.0));
        graph.add_child(c2, d, traj);

        // `d` is expanded through `b` before `c2` offers the cheaper path
        graph.update_descendants(a, root, |traj| traj.duration());

        assert_eq!(graph.node(d).best_parent, Some(c2));
        let via_c2 = graph.node(c2).cost_to_come + 0.5;
        assert!((graph.node(d).cost_to_come - via_c2).abs() < 1e-10);
        assert!((graph.node(e).cost_to_come - (via_c2 + 1.0)).abs() < 1e-10);
        assert!((graph.node(e).time - (graph.node(d).time + 1.0)).abs() < 1e-10);
        assert_costs_follow_best_parents(&graph, root);
        assert_parent_child_consistent(&graph, root);
    }

    #[test]
    fn test_update_descendants_terminates_on_cycles_and_spares_anchor() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let b = grow(&mut graph, a, pv(1.0, 1.0));

        // Edges that lead back into the tree
        let back_to_a = edge(&graph, b, pv(1.0, 0.0));
        graph.add_child(b, a, back_to_a);
        let back_to_root = edge(&graph, b, pv(0.0, 0.0));
        graph.add_child(b, root, back_to_root);
        graph.node_mut(root).best_parent = Some(b);

        graph.update_descendants(a, root, |traj| traj.duration());

        let root_node = graph.node(root);
        assert_eq!(root_node.time, 0.0);
        assert_eq!(root_node.cost_to_come, 0.0);
        assert_eq!(graph.node(a).best_parent, Some(root));
        assert_eq!(graph.node(b).best_parent, Some(a));
    }

    #[test]
    fn test_extract_root_to_goal() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 1.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let _side = grow(&mut graph, root, pv(0.0, 3.0));
        let goal = graph.add_node(Node::goal(pv(1.0, 2.0)));
        let traj = edge(&graph, a, pv(1.0, 2.0));
        graph.add_child(a, goal, traj);
        graph.node_mut(goal).best_parent = Some(a);

        let out = graph.extract_trajectory(root, goal);
        assert_eq!(out.len(), 3);
        assert_eq!(out.first_state(), Some(&pv(0.0, 0.0)));
        assert_eq!(out.last_state(), Some(&pv(1.0, 2.0)));
        assert_eq!(out.times(), &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_extract_loop_back_to_root() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let b = grow(&mut graph, a, pv(1.0, 1.0));
        let back = edge(&graph, b, pv(0.0, 0.0));
        graph.add_child(b, root, back);
        graph.node_mut(root).best_parent = Some(b);

        let out = graph.extract_trajectory(root, root);
        assert!(!out.is_empty());
        assert!(same_vertex(out.first_state().unwrap(), &pv(0.0, 0.0)));
        assert!(same_vertex(out.last_state().unwrap(), &pv(0.0, 0.0)));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_extract_without_loop_is_empty() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        grow(&mut graph, root, pv(1.0, 0.0));
        assert!(graph.extract_trajectory(root, root).is_empty());
    }

    #[test]
    fn test_extract_truncates_on_inconsistency() {
        let mut graph = PlanningGraph::new();
        let root = graph.add_node(Node::root(pv(0.0, 0.0), 0.0));
        let a = grow(&mut graph, root, pv(1.0, 0.0));
        let b = grow(&mut graph, a, pv(2.0, 0.0));

        // Drop the root -> a edge while `a` still points at root
        {
            let r = graph.node_mut(root);
            r.children.clear();
            r.trajs_to_children.clear();
        }

        let out = graph.extract_trajectory(root, b);
        assert_eq!(out.first_state(), Some(&pv(1.0, 0.0)));
        assert_eq!(out.last_state(), Some(&pv(2.0, 0.0)));
    }
}
