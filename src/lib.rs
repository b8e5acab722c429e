//! Workflow bottleneck detection and deadline risk forecasting.
//!
//! A normalized [`TaskRegistry`] goes in, an [`AnalysisResult`] comes out:
//!
//! ```
//! use chrono::NaiveDate;
//! use stallwatch::{analyze, AnalysisConfig, Task, TaskRegistry, TaskStatus};
//!
//! let registry = TaskRegistry::from_tasks(vec![
//!     Task::new("T-1", "Design").with_status(TaskStatus::InProgress),
//!     Task::new("T-2", "Build").depends_on("T-1"),
//! ])
//! .unwrap();
//! let as_of = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
//! let result = analyze(&registry, &AnalysisConfig::default(), as_of).unwrap();
//! assert!(!result.findings.is_empty());
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod log;

pub use analysis::{
    analyze, AnalysisResult, Finding, FindingDetail, FindingKind, RiskBand, RiskForecast,
    Severity,
};
pub use config::{AnalysisConfig, RiskWeights};
pub use core::{Effort, EffortLevel, Priority, Task, TaskId, TaskRegistry, TaskStatus, WorkflowGraph};
pub use error::{DataQualityWarning, Error, Result, ValidationIssue};
