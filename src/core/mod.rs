//! Core domain models for workflow analysis.
//!
//! This module contains the task records, the registry that holds them for
//! one run, and the dependency graph built from that registry.

pub mod graph;
pub mod registry;
pub mod task;

pub use graph::WorkflowGraph;
pub use registry::TaskRegistry;
pub use task::{Effort, EffortLevel, Priority, Task, TaskId, TaskStatus};
