//! Workflow graph built from a task registry.
//!
//! Tasks are nodes and "blocked-by" relations are edges pointing from the
//! prerequisite to the dependent task. Unlike a scheduling DAG the workflow
//! graph tolerates cycles: strongly connected groups are recorded and left
//! out of the topological order, and everything else stays analyzable.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;

use crate::core::registry::TaskRegistry;
use crate::core::task::{Task, TaskId};
use crate::error::{DataQualityWarning, Error, Result};
use crate::{swlog_debug, swlog_warn};

/// Immutable dependency graph for one analysis run.
///
/// Nodes are inserted in task id order, so `NodeIndex` order matches lexical
/// id order. Passes that iterate over node indices are deterministic for free.
pub struct WorkflowGraph {
    /// The underlying directed graph.
    graph: DiGraph<Task, ()>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
    /// Each cycle's member ids, sorted, and the list sorted by first member.
    cycles: Vec<Vec<TaskId>>,
    in_cycle: HashSet<NodeIndex>,
    /// Topological order of the nodes outside every cycle.
    acyclic_order: Vec<NodeIndex>,
    warnings: Vec<DataQualityWarning>,
}

impl WorkflowGraph {
    /// Build the graph from a registry.
    ///
    /// # Errors
    /// Returns `Error::Validation` listing every self-dependency. Dangling
    /// references and date inconsistencies become warnings on the graph.
    pub fn build(registry: &TaskRegistry) -> Result<Self> {
        let issues = registry.validate();
        if !issues.is_empty() {
            return Err(Error::Validation { issues });
        }

        let mut tasks: Vec<&Task> = registry.iter().collect();
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        let mut graph = DiGraph::with_capacity(tasks.len(), 0);
        let mut task_index = HashMap::with_capacity(tasks.len());
        for task in &tasks {
            let index = graph.add_node((*task).clone());
            task_index.insert(task.task_id.clone(), index);
        }

        let mut warnings = Vec::new();
        for task in &tasks {
            let to = task_index[&task.task_id];
            for dep in &task.depends_on {
                match task_index.get(dep) {
                    Some(&from) => {
                        graph.add_edge(from, to, ());
                    }
                    None => {
                        swlog_warn!("Dangling dependency {} -> {}", task.task_id, dep);
                        warnings.push(DataQualityWarning::DanglingDependency {
                            task_id: task.task_id.clone(),
                            missing: dep.clone(),
                        });
                    }
                }
            }
            if let (Some(start_date), Some(due_date)) = (task.start_date, task.due_date) {
                if due_date < start_date {
                    warnings.push(DataQualityWarning::DueBeforeStart {
                        task_id: task.task_id.clone(),
                        start_date,
                        due_date,
                    });
                }
            }
        }
        warnings.sort();

        let (cycles, in_cycle) = find_cycles(&graph);
        let acyclic_order = acyclic_topological_order(&graph, &in_cycle);

        swlog_debug!(
            "WorkflowGraph::build nodes={} edges={} cycles={} warnings={}",
            graph.node_count(),
            graph.edge_count(),
            cycles.len(),
            warnings.len()
        );

        Ok(Self {
            graph,
            task_index,
            cycles,
            in_cycle,
            acyclic_order,
            warnings,
        })
    }

    /// Get a reference to a task by its ID.
    pub fn get_task(&self, id: &TaskId) -> Option<&Task> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// Get the NodeIndex for a task by its ID.
    pub fn get_node_index(&self, id: &TaskId) -> Option<NodeIndex> {
        self.task_index.get(id).copied()
    }

    /// Task stored at a node. Panics on an index from another graph.
    pub fn task(&self, index: NodeIndex) -> &Task {
        &self.graph[index]
    }

    /// Get the number of tasks in the graph.
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of dependencies (edges) in the graph.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Check if `to` is directly blocked by `from`.
    pub fn has_dependency(&self, from: &TaskId, to: &TaskId) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) =
            (self.task_index.get(from), self.task_index.get(to))
        {
            self.graph.find_edge(from_idx, to_idx).is_some()
        } else {
            false
        }
    }

    /// Direct prerequisites of a node, in id order.
    pub fn prerequisites(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(index, Direction::Incoming)
    }

    /// Direct dependents of a node, in id order.
    pub fn dependents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(index, Direction::Outgoing)
    }

    /// Every task reachable by walking prerequisite edges, in id order.
    ///
    /// The node itself is left out even when it sits on a cycle.
    pub fn ancestors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, index);
        let mut found = Vec::new();
        while let Some(node) = bfs.next(reversed) {
            if node != index {
                found.push(node);
            }
        }
        found.sort();
        found
    }

    fn sorted_neighbors(&self, index: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(index, dir).collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Get all tasks the given task depends on.
    pub fn get_dependencies(&self, id: &TaskId) -> Vec<&Task> {
        match self.task_index.get(id) {
            Some(&index) => self
                .prerequisites(index)
                .into_iter()
                .map(|n| &self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Get all tasks that depend on the given task.
    pub fn get_dependents(&self, id: &TaskId) -> Vec<&Task> {
        match self.task_index.get(id) {
            Some(&index) => self
                .dependents(index)
                .into_iter()
                .map(|n| &self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Node indices in task id order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All tasks in task id order.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.graph.node_weights()
    }

    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Detected cycles, each as a sorted list of member ids.
    pub fn cycles(&self) -> &[Vec<TaskId>] {
        &self.cycles
    }

    pub fn is_in_cycle(&self, index: NodeIndex) -> bool {
        self.in_cycle.contains(&index)
    }

    /// Topological order of every task outside a cycle.
    ///
    /// Equal to the full topological order when the graph is acyclic.
    pub fn acyclic_order(&self) -> &[NodeIndex] {
        &self.acyclic_order
    }

    /// Tasks of the acyclic portion in topological order.
    pub fn topological_order(&self) -> Vec<&Task> {
        self.acyclic_order.iter().map(|&i| &self.graph[i]).collect()
    }

    /// Non-fatal problems found while building.
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    /// Largest number of direct prerequisites on any task.
    pub fn max_fan_in(&self) -> usize {
        self.max_degree(Direction::Incoming)
    }

    /// Largest number of direct dependents on any task.
    pub fn max_fan_out(&self) -> usize {
        self.max_degree(Direction::Outgoing)
    }

    fn max_degree(&self, dir: Direction) -> usize {
        self.node_indices()
            .map(|n| self.sorted_neighbors(n, dir).len())
            .max()
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .field("cycles", &self.cycles.len())
            .finish()
    }
}

/// Strongly connected groups of more than one task.
///
/// Self-loops never reach here because the builder rejects self-dependencies.
fn find_cycles(graph: &DiGraph<Task, ()>) -> (Vec<Vec<TaskId>>, HashSet<NodeIndex>) {
    let mut in_cycle = HashSet::new();
    let mut cycles: Vec<Vec<TaskId>> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            in_cycle.extend(component.iter().copied());
            let mut ids: Vec<TaskId> = component
                .iter()
                .map(|&n| graph[n].task_id.clone())
                .collect();
            ids.sort();
            ids
        })
        .collect();
    cycles.sort();
    (cycles, in_cycle)
}

/// Kahn's algorithm over the nodes outside every cycle.
///
/// Edges coming out of cycle members are ignored. Ready nodes are taken in
/// index order, which makes the ordering unique for a given task set.
fn acyclic_topological_order(
    graph: &DiGraph<Task, ()>,
    in_cycle: &HashSet<NodeIndex>,
) -> Vec<NodeIndex> {
    let mut indegree: HashMap<NodeIndex, usize> = HashMap::new();
    let mut ready = BTreeSet::new();

    for node in graph.node_indices().filter(|n| !in_cycle.contains(n)) {
        let count = graph
            .neighbors_directed(node, Direction::Incoming)
            .filter(|p| !in_cycle.contains(p))
            .count();
        if count == 0 {
            ready.insert(node);
        }
        indegree.insert(node, count);
    }

    let mut order = Vec::with_capacity(indegree.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            if let Some(count) = indegree.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(next);
                }
            }
        }
    }
    order
}
