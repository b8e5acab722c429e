//! Longest remaining-effort path over the acyclic part of the workflow graph.
//!
//! Node weights are remaining effort in fixed-point units (finished tasks
//! weigh zero). Two passes of dynamic programming over the topological
//! order give, for every node, the heaviest chain ending at it and the
//! heaviest chain starting at it. Their sum identifies every node that lies
//! on some maximum-weight path.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use petgraph::graph::NodeIndex;

use crate::core::graph::WorkflowGraph;
use crate::core::task::EFFORT_UNITS_PER_DAY;

#[derive(Debug, Clone, Default)]
pub struct CriticalPath {
    /// The selected maximum-weight path, source first.
    pub path: Vec<NodeIndex>,
    pub length_units: u64,
    /// Nodes on at least one maximum-weight path.
    pub members: BTreeSet<NodeIndex>,
    earliest_finish: HashMap<NodeIndex, u64>,
}

impl CriticalPath {
    /// Compute the critical path of the graph's acyclic portion.
    pub fn compute(graph: &WorkflowGraph) -> Self {
        let order = graph.acyclic_order();
        if order.is_empty() {
            return Self::default();
        }

        let weight = |n: NodeIndex| graph.task(n).remaining_units();
        let preds = |n: NodeIndex| -> Vec<NodeIndex> {
            graph
                .prerequisites(n)
                .into_iter()
                .filter(|p| !graph.is_in_cycle(*p))
                .collect()
        };
        let succs = |n: NodeIndex| -> Vec<NodeIndex> {
            graph
                .dependents(n)
                .into_iter()
                .filter(|s| !graph.is_in_cycle(*s))
                .collect()
        };

        let mut best_to: HashMap<NodeIndex, u64> = HashMap::with_capacity(order.len());
        for &node in order {
            let upstream = preds(node)
                .iter()
                .map(|p| best_to[p])
                .max()
                .unwrap_or(0);
            best_to.insert(node, upstream.saturating_add(weight(node)));
        }

        let mut best_from: HashMap<NodeIndex, u64> = HashMap::with_capacity(order.len());
        for &node in order.iter().rev() {
            let downstream = succs(node)
                .iter()
                .map(|s| best_from[s])
                .max()
                .unwrap_or(0);
            best_from.insert(node, downstream.saturating_add(weight(node)));
        }

        let sinks: Vec<NodeIndex> = order
            .iter()
            .copied()
            .filter(|&n| succs(n).is_empty())
            .collect();
        let length_units = sinks.iter().map(|s| best_to[s]).max().unwrap_or(0);

        let members: BTreeSet<NodeIndex> = order
            .iter()
            .copied()
            .filter(|n| best_to[n].saturating_add(best_from[n]) - weight(*n) == length_units)
            .collect();

        let mut path = Vec::new();
        let mut current = sinks
            .into_iter()
            .filter(|s| best_to[s] == length_units)
            .min_by(|a, b| tie_break(graph, *a, *b));
        while let Some(node) = current {
            path.push(node);
            let upstream = best_to[&node].saturating_sub(weight(node));
            current = preds(node)
                .into_iter()
                .filter(|p| best_to[p] == upstream)
                .min_by(|a, b| tie_break(graph, *a, *b));
        }
        path.reverse();

        Self {
            path,
            length_units,
            members,
            earliest_finish: best_to,
        }
    }

    pub fn length_days(&self) -> f64 {
        self.length_units as f64 / EFFORT_UNITS_PER_DAY as f64
    }

    pub fn is_member(&self, node: NodeIndex) -> bool {
        self.members.contains(&node)
    }

    /// Remaining effort of the heaviest chain ending at `node`, inclusive.
    ///
    /// `None` for nodes inside a cycle, which have no well-defined chain.
    pub fn earliest_finish_units(&self, node: NodeIndex) -> Option<u64> {
        self.earliest_finish.get(&node).copied()
    }
}

/// Prefer the earlier due date (undated last), then the lower task id.
fn tie_break(graph: &WorkflowGraph, a: NodeIndex, b: NodeIndex) -> Ordering {
    let due_a = graph.task(a).due_date;
    let due_b = graph.task(b).due_date;
    let by_due = match (due_a, due_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    // Node indices follow task id order.
    by_due.then_with(|| a.cmp(&b))
}
