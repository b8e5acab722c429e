//! Task registry: the normalized task set for one analysis run.

use std::collections::HashMap;

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result, ValidationIssue};

/// Container of task records keyed by id.
///
/// Records keep their insertion order; lookups go through an id index.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a batch of records.
    ///
    /// Every empty or duplicate id in the batch is reported in a single
    /// validation error rather than stopping at the first one.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let mut registry = Self::new();
        let mut issues = Vec::new();

        for (position, task) in tasks.into_iter().enumerate() {
            if task.task_id.is_empty() {
                issues.push(ValidationIssue::EmptyTaskId { position });
                continue;
            }
            if registry.contains(&task.task_id) {
                issues.push(ValidationIssue::DuplicateTaskId {
                    task_id: task.task_id.clone(),
                });
                continue;
            }
            registry.push(task);
        }

        if issues.is_empty() {
            Ok(registry)
        } else {
            Err(Error::Validation { issues })
        }
    }

    /// Add a task, rejecting empty or already-registered ids.
    pub fn insert(&mut self, task: Task) -> Result<()> {
        if task.task_id.is_empty() {
            return Err(Error::Validation {
                issues: vec![ValidationIssue::EmptyTaskId {
                    position: self.tasks.len(),
                }],
            });
        }
        if self.contains(&task.task_id) {
            return Err(Error::Validation {
                issues: vec![ValidationIssue::DuplicateTaskId {
                    task_id: task.task_id,
                }],
            });
        }
        self.push(task);
        Ok(())
    }

    fn push(&mut self, task: Task) {
        self.index.insert(task.task_id.clone(), self.tasks.len());
        self.tasks.push(task);
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Record problems that block graph construction: self-dependencies
    /// and malformed effort estimates.
    ///
    /// Issues are sorted so the same registry always reports them identically.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for task in &self.tasks {
            if task.depends_on.contains(&task.task_id) {
                issues.push(ValidationIssue::SelfDependency {
                    task_id: task.task_id.clone(),
                });
            }
            if !task.effort.is_valid() {
                issues.push(ValidationIssue::InvalidEffort {
                    task_id: task.task_id.clone(),
                });
            }
        }
        issues.sort();
        issues
    }
}
