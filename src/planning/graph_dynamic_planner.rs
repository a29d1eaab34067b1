//! Graph-based dynamic planner with recursive feasibility
//!
//! Grows a tree of dynamically reachable states from the start and only
//! ever commits to trajectories that end at a viable node: one with a
//! verified way back to safety. Each `plan` call runs under a wall-clock
//! budget and then blocks until the whole budget has elapsed, so callers
//! replanning on a fixed cadence see a constant latency.

use std::marker::PhantomData;
use std::path::Path;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::common::{DynamicPlanner, EdgePlanner, PlanningError, PlanningResult, SearchIndex, State};
use crate::planning::node::{same_vertex, Node, NodeId, PlanningGraph};
use crate::planning::searchable_set::SearchableSet;
use crate::planning::trajectory::Trajectory;

/// Configuration for the graph dynamic planner
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphPlannerConfig {
    /// Neighbors tried per expansion
    pub num_neighbors: usize,
    /// Radius for goal connection attempts
    pub search_radius: f64,
    /// Wall-clock budget per `plan` call [s]
    pub max_runtime: f64,
    /// Search for a loop back into the tree when a sample misses every goal
    pub verify_return_trips: bool,
    /// Fixed RNG seed, entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for GraphPlannerConfig {
    fn default() -> Self {
        Self {
            num_neighbors: 5,
            search_radius: 1.0,
            max_runtime: 1.0,
            verify_return_trips: false,
            seed: None,
        }
    }
}

impl GraphPlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> PlanningResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> PlanningResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> PlanningResult<()> {
        if self.num_neighbors == 0 {
            return Err(PlanningError::InvalidParameter(
                "num_neighbors must be at least 1".to_string(),
            ));
        }
        if !(self.search_radius > 0.0) || !self.search_radius.is_finite() {
            return Err(PlanningError::InvalidParameter(format!(
                "search_radius must be positive and finite, got {}",
                self.search_radius
            )));
        }
        let max_runtime = self.max_runtime_duration()?;
        if Instant::now().checked_add(max_runtime).is_none() {
            return Err(PlanningError::InvalidParameter(format!(
                "max_runtime of {} s puts the deadline out of range",
                self.max_runtime
            )));
        }
        Ok(())
    }

    /// Per-call budget as a `Duration`
    pub fn max_runtime_duration(&self) -> PlanningResult<Duration> {
        Duration::try_from_secs_f64(self.max_runtime).map_err(|_| {
            PlanningError::InvalidParameter(format!(
                "max_runtime must be a non-negative, representable number of seconds, got {}",
                self.max_runtime
            ))
        })
    }
}

/// Where a search looks for nodes to connect to
///
/// A return trip searches for a way back into the tree it is growing, so
/// its goal set is the tree index itself.
pub enum Goals<'a, I> {
    Set(&'a I),
    Tree,
}

impl<I> Clone for Goals<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Goals<'_, I> {}

/// Sampling-based planner producing recursively feasible trajectories
pub struct GraphDynamicPlanner<S: State, E, I = SearchableSet<S>> {
    config: GraphPlannerConfig,
    domain: S::Domain,
    edge_planner: E,
    rng: StdRng,
    max_runtime: Duration,
    name: String,
    last_graph: Option<PlanningGraph<S>>,
    _index: PhantomData<fn() -> I>,
}

impl<S, E, I> GraphDynamicPlanner<S, E, I>
where
    S: State,
    E: EdgePlanner<S>,
    I: SearchIndex<S>,
{
    pub fn new(
        config: GraphPlannerConfig,
        domain: S::Domain,
        edge_planner: E,
    ) -> PlanningResult<Self> {
        config.validate()?;
        let max_runtime = config.max_runtime_duration()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            domain,
            edge_planner,
            rng,
            max_runtime,
            name: "GraphDynamicPlanner".to_string(),
            last_graph: None,
            _index: PhantomData,
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn config(&self) -> &GraphPlannerConfig {
        &self.config
    }

    pub fn edge_planner(&self) -> &E {
        &self.edge_planner
    }

    /// Graph explored by the most recent `plan` call
    ///
    /// The start is node 0 and the goal node 1.
    pub fn last_graph(&self) -> Option<&PlanningGraph<S>> {
        self.last_graph.as_ref()
    }

    /// Dynamically feasible (not necessarily recursively feasible) edge
    pub fn sub_plan(&self, start: &S, goal: &S, start_time: f64) -> Trajectory<S> {
        self.edge_planner.attempt_connect(start, goal, start_time)
    }

    pub fn cost(&self, traj: &Trajectory<S>) -> f64 {
        self.edge_planner.cost(traj)
    }

    /// Plan from `start` to `goal` departing at `start_time`
    ///
    /// Returns an empty trajectory if nothing viable was found. Always
    /// takes `max_runtime` of wall-clock time.
    pub fn plan(&mut self, start: &S, goal: &S, start_time: f64) -> Trajectory<S> {
        let initial_call_time = Instant::now();
        let max_runtime = self.max_runtime;
        let Some(deadline) = initial_call_time.checked_add(max_runtime) else {
            error!(planner = %self.name, ?max_runtime, "Deadline out of range");
            return Trajectory::empty();
        };

        let mut graph = PlanningGraph::new();
        let start_id = graph.add_node(Node::root(start.clone(), start_time));
        let goal_id = graph.add_node(Node::goal(goal.clone()));

        let mut tree = I::with_initial_node(start_id, start);
        let goal_set = I::with_initial_node(goal_id, goal);

        let traj = self.recursive_plan(
            &mut graph,
            &mut tree,
            Goals::Set(&goal_set),
            start_time,
            true,
            deadline,
        );

        debug!(
            planner = %self.name,
            nodes = graph.len(),
            samples = traj.len(),
            "Search finished"
        );
        self.last_graph = Some(graph);

        // Wait around if we finish early
        let elapsed = initial_call_time.elapsed();
        if elapsed < max_runtime {
            std::thread::sleep(max_runtime - elapsed);
        }

        traj
    }

    /// Grow `tree` until a viable goal is reached or `deadline` passes
    ///
    /// Outbound searches return the trajectory from the tree root to the
    /// goal set's initial node, or on timeout a loop from the root back to
    /// itself if one has been verified. Return trips only mark viability
    /// and always return an empty trajectory.
    pub fn recursive_plan(
        &mut self,
        graph: &mut PlanningGraph<S>,
        tree: &mut I,
        goals: Goals<'_, I>,
        start_time: f64,
        outbound: bool,
        deadline: Instant,
    ) -> Trajectory<S> {
        debug!(planner = %self.name, start_time, outbound, "Starting search");

        while Instant::now() < deadline {
            // (1) Sample a new point
            let sample = S::sample(&self.domain, &mut self.rng);

            // (2) Hang it off the nearest neighbor that can reach it
            let Some(sample_id) = self.expand(graph, tree, &sample) else {
                continue;
            };

            // (3) Try to continue on to a nearby viable goal
            let (candidates, goal_root) = match goals {
                Goals::Set(set) => (
                    set.within_radius(&sample, self.config.search_radius),
                    set.initial_node(),
                ),
                Goals::Tree => (
                    tree.within_radius(&sample, self.config.search_radius),
                    tree.initial_node(),
                ),
            };

            let Some(goal) = self.connect_to_goal(graph, sample_id, &candidates) else {
                if outbound && self.config.verify_return_trips {
                    let sample_time = graph.node(sample_id).time;
                    self.recursive_plan(graph, tree, Goals::Tree, sample_time, false, deadline);
                }
                continue;
            };

            // (4) Reached a goal. Relaxation halts at the tree root when
            // going outbound and at the goal root on the way back.
            let anchor = if outbound { tree.initial_node() } else { goal_root };
            self.adopt_goal(graph, sample_id, goal, anchor);

            let marked = graph.mark_ancestors_viable(sample_id);
            debug!(planner = %self.name, marked, outbound, "Marked ancestors viable");

            return if outbound {
                graph.extract_trajectory(tree.initial_node(), goal_root)
            } else {
                Trajectory::empty()
            };
        }

        if !outbound {
            debug!(planner = %self.name, "Return trip ran out of time");
            return Trajectory::empty();
        }

        error!(planner = %self.name, nodes = graph.len(), "Planner ran out of time");

        let start = tree.initial_node();
        if graph.node(start).best_parent.is_none() {
            error!(planner = %self.name, "No viable loops available");
            return Trajectory::empty();
        }

        info!(planner = %self.name, "Found a viable loop");
        graph.extract_trajectory(start, start)
    }

    /// Attach `sample` to the first of its k nearest neighbors that connects
    fn expand(&self, graph: &mut PlanningGraph<S>, tree: &mut I, sample: &S) -> Option<NodeId> {
        for neighbor in tree.k_nearest(sample, self.config.num_neighbors) {
            let node = graph.node(neighbor);
            if same_vertex(&node.state, sample) {
                continue;
            }

            let sub_plan = self.sub_plan(&node.state, sample, node.time);
            if sub_plan.is_empty() {
                continue;
            }

            let edge_cost = self.cost(&sub_plan);
            let id = graph.attach(neighbor, sample.clone(), sub_plan, edge_cost);
            tree.insert(id, sample);
            return Some(id);
        }
        None
    }

    /// Add an edge from `from` to the first viable candidate it can reach
    fn connect_to_goal(
        &self,
        graph: &mut PlanningGraph<S>,
        from: NodeId,
        candidates: &[NodeId],
    ) -> Option<NodeId> {
        for &goal in candidates {
            if !graph.node(goal).is_viable {
                continue;
            }

            let from_node = graph.node(from);
            let sub_plan = self.sub_plan(&from_node.state, &graph.node(goal).state, from_node.time);
            if !sub_plan.is_empty() {
                graph.add_child(from, goal, sub_plan);
                return Some(goal);
            }
        }
        None
    }

    /// Make `sample` the goal's best parent if it is cheaper
    fn adopt_goal(
        &self,
        graph: &mut PlanningGraph<S>,
        sample: NodeId,
        goal: NodeId,
        anchor: NodeId,
    ) {
        let improves = match graph.node(goal).best_parent {
            None => true,
            Some(parent) => graph.node(parent).cost_to_come > graph.node(sample).cost_to_come,
        };
        if !improves {
            return;
        }

        graph.node_mut(goal).best_parent = Some(sample);
        graph.update_descendants(sample, anchor, |traj| self.cost(traj));
    }
}

impl<S, E, I> DynamicPlanner<S> for GraphDynamicPlanner<S, E, I>
where
    S: State,
    E: EdgePlanner<S>,
    I: SearchIndex<S>,
{
    fn plan(&mut self, start: &S, goal: &S, start_time: f64) -> Trajectory<S> {
        GraphDynamicPlanner::plan(self, start, goal, start_time)
    }
}
