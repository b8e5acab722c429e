//! Task data model for the workflow graph.
//!
//! Tasks arrive already normalized by an ingestion collaborator. Each task
//! carries its owner, lifecycle status, priority, effort estimate, optional
//! calendar dates, and the ids of the tasks it is blocked by.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier for a task within a registry.
///
/// Ordering is lexical, which the detector relies on for tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task status in its lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work has not begun.
    #[default]
    NotStarted,
    /// Work is underway.
    InProgress,
    /// Work is explicitly marked as stuck.
    Blocked,
    /// Work finished.
    Completed,
    /// Work was dropped.
    Cancelled,
}

impl TaskStatus {
    /// Completed and cancelled tasks no longer hold anything up.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::NotStarted => write!(f, "not_started"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Blocked => write!(f, "blocked"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Business priority of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// How many severity levels this priority adds on top of a base severity.
    pub fn severity_bump(&self) -> u8 {
        match self {
            Priority::Low | Priority::Medium => 0,
            Priority::High => 1,
            Priority::Critical => 2,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Coarse effort bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

/// Effort estimate: either a bucket or an explicit number of working days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Effort {
    Level(EffortLevel),
    Days(f64),
}

impl Default for Effort {
    fn default() -> Self {
        Effort::Level(EffortLevel::Medium)
    }
}

/// Effort is measured internally in hundredths of a working day so that
/// path lengths compare exactly.
pub const EFFORT_UNITS_PER_DAY: u64 = 100;

/// Largest numeric estimate accepted, in working days.
pub const MAX_EFFORT_DAYS: f64 = 10_000.0;

impl Effort {
    /// Estimated duration in working days.
    pub fn days(&self) -> f64 {
        match self {
            Effort::Level(EffortLevel::Low) => 1.0,
            Effort::Level(EffortLevel::Medium) => 3.0,
            Effort::Level(EffortLevel::High) => 5.0,
            Effort::Days(d) if d.is_finite() && *d > 0.0 => d.min(MAX_EFFORT_DAYS),
            Effort::Days(_) => 0.0,
        }
    }

    /// Numeric estimates must be finite, non-negative and at most
    /// `MAX_EFFORT_DAYS`.
    pub fn is_valid(&self) -> bool {
        match self {
            Effort::Level(_) => true,
            Effort::Days(d) => d.is_finite() && (0.0..=MAX_EFFORT_DAYS).contains(d),
        }
    }

    /// Duration in fixed-point effort units.
    pub fn units(&self) -> u64 {
        (self.days() * EFFORT_UNITS_PER_DAY as f64).round() as u64
    }
}

/// A single normalized work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    #[serde(default)]
    pub title: String,
    /// Empty means unassigned.
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub effort: Effort,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Ids of prerequisite tasks.
    #[serde(default)]
    pub depends_on: BTreeSet<TaskId>,
}

impl Task {
    /// Create a not-started, unassigned task with medium priority and effort.
    pub fn new(task_id: impl Into<TaskId>, title: &str) -> Self {
        Self {
            task_id: task_id.into(),
            title: title.to_string(),
            owner: String::new(),
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            effort: Effort::default(),
            start_date: None,
            due_date: None,
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_start(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn with_due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn is_assigned(&self) -> bool {
        !self.owner.trim().is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Effort still ahead of this task; finished work counts as zero.
    pub fn remaining_units(&self) -> u64 {
        if self.status.is_terminal() {
            0
        } else {
            self.effort.units()
        }
    }
}
