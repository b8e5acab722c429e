use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::task::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {}", join_issues(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    #[error("Configuration error: {field} {reason}")]
    Configuration { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Issues carried by a validation failure, empty for every other variant.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Error::Validation { issues } => issues.as_slice(),
            _ => &[],
        }
    }

    pub(crate) fn configuration(field: &str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structural problem that makes a registry unusable for graph construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum ValidationIssue {
    /// A record arrived without an identifier.
    EmptyTaskId { position: usize },
    /// Two records share the same identifier.
    DuplicateTaskId { task_id: TaskId },
    /// A task lists itself in `depends_on`.
    SelfDependency { task_id: TaskId },
    /// A numeric effort estimate is negative, not finite, or too large.
    InvalidEffort { task_id: TaskId },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::EmptyTaskId { position } => {
                write!(f, "record at position {} has an empty task_id", position)
            }
            ValidationIssue::DuplicateTaskId { task_id } => {
                write!(f, "duplicate task_id {}", task_id)
            }
            ValidationIssue::SelfDependency { task_id } => {
                write!(f, "task {} depends on itself", task_id)
            }
            ValidationIssue::InvalidEffort { task_id } => {
                write!(f, "task {} has an invalid effort estimate", task_id)
            }
        }
    }
}

/// Non-fatal data problem, returned alongside results.
///
/// The derived ordering groups warnings by kind and then by task id, which
/// is what the analysis result uses to keep its warning list stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "warning")]
pub enum DataQualityWarning {
    /// `depends_on` references an id that is not in the registry.
    DanglingDependency { task_id: TaskId, missing: TaskId },
    /// An in-progress task has no start date, so its age is unknown.
    MissingStartDate { task_id: TaskId },
    /// The due date precedes the start date.
    DueBeforeStart {
        task_id: TaskId,
        start_date: NaiveDate,
        due_date: NaiveDate,
    },
}

impl DataQualityWarning {
    pub fn task_id(&self) -> &TaskId {
        match self {
            DataQualityWarning::DanglingDependency { task_id, .. }
            | DataQualityWarning::MissingStartDate { task_id }
            | DataQualityWarning::DueBeforeStart { task_id, .. } => task_id,
        }
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityWarning::DanglingDependency { task_id, missing } => {
                write!(f, "task {} depends on unknown task {}", task_id, missing)
            }
            DataQualityWarning::MissingStartDate { task_id } => {
                write!(f, "task {} is in progress without a start date", task_id)
            }
            DataQualityWarning::DueBeforeStart {
                task_id,
                start_date,
                due_date,
            } => write!(
                f,
                "task {} is due {} before it starts {}",
                task_id, due_date, start_date
            ),
        }
    }
}
