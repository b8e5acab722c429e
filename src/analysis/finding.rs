//! Bottleneck findings emitted by the detector.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::task::{Priority, TaskId};

/// Category of a finding.
///
/// Declaration order is report precedence: critical path first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    CriticalPath,
    OwnerOverload,
    Blocked,
    Aging,
    DependencyChokepoint,
    CircularDependency,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingKind::CriticalPath => write!(f, "critical_path"),
            FindingKind::OwnerOverload => write!(f, "owner_overload"),
            FindingKind::Blocked => write!(f, "blocked"),
            FindingKind::Aging => write!(f, "aging"),
            FindingKind::DependencyChokepoint => write!(f, "dependency_chokepoint"),
            FindingKind::CircularDependency => write!(f, "circular_dependency"),
        }
    }
}

/// Ordinal severity of a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a level count onto the scale, saturating at `Critical`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Severity::Low,
            1 => Severity::Medium,
            2 => Severity::High,
            _ => Severity::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Structured evidence behind a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingDetail {
    Blocked {
        /// Direct prerequisites not yet completed or cancelled, in id order.
        incomplete_prerequisites: Vec<TaskId>,
        /// The task's own status is `blocked`.
        explicitly_blocked: bool,
        priority: Priority,
    },
    OwnerOverload {
        owner: String,
        active_count: usize,
        threshold: i64,
    },
    Aging {
        start_date: NaiveDate,
        age_days: i64,
        threshold_days: i64,
    },
    CriticalPath {
        /// Remaining effort along the path, in working days.
        length_days: f64,
        /// Every task lying on some maximum-length path, in id order.
        members: Vec<TaskId>,
    },
    /// Many direct prerequisites converge on one unfinished task.
    DependencyChokepoint {
        fan_in: usize,
        fan_out: usize,
        threshold: i64,
    },
    CircularDependency {
        size: usize,
    },
}

/// One detected bottleneck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Affected tasks. For critical paths this is the path in order; for
    /// owner overload it is the owner's active tasks by due date.
    pub task_ids: Vec<TaskId>,
    pub severity: Severity,
    pub detail: FindingDetail,
}

impl Finding {
    /// Tasks this finding counts against. A critical-path finding covers
    /// every member of a maximum path, not just the selected sequence.
    pub fn affected_tasks(&self) -> &[TaskId] {
        match &self.detail {
            FindingDetail::CriticalPath { members, .. } => members,
            _ => &self.task_ids,
        }
    }

    pub fn involves(&self, id: &TaskId) -> bool {
        self.affected_tasks().contains(id)
    }

    /// Report ordering: kind precedence, then severity descending, then ids.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| other.severity.cmp(&self.severity))
            .then_with(|| self.task_ids.cmp(&other.task_ids))
    }
}

/// Sort findings into their canonical report order.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(Finding::report_order);
}
