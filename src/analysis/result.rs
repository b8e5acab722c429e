//! The analysis result handed to downstream consumers.
//!
//! The result echoes the as-of date and configuration it was computed with,
//! so a stored snapshot can be interpreted without re-reading any config.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::critical_path::CriticalPath;
use crate::analysis::detector::DetectionReport;
use crate::analysis::finding::{Finding, FindingKind};
use crate::analysis::forecast::{Forecast, RiskForecast, RiskSummary};
use crate::config::AnalysisConfig;
use crate::core::graph::WorkflowGraph;
use crate::core::task::{Priority, TaskId, TaskStatus};
use crate::error::{DataQualityWarning, Result};

/// Bumped whenever the serialized shape of `AnalysisResult` changes.
pub const ANALYSIS_SCHEMA_VERSION: u32 = 2;

/// Active workload of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerLoad {
    pub owner: String,
    pub active: usize,
    pub in_progress: usize,
    pub blocked: usize,
    /// Active tasks with high or critical priority.
    pub high_priority: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub task_count: usize,
    pub dependency_count: usize,
    /// Tasks with no prerequisites.
    pub source_count: usize,
    /// Tasks nothing depends on.
    pub sink_count: usize,
    pub max_fan_in: usize,
    pub max_fan_out: usize,
    pub status_counts: BTreeMap<TaskStatus, usize>,
    pub cycles: Vec<Vec<TaskId>>,
    /// Remaining effort on the critical path, in working days.
    pub critical_path_days: f64,
    pub owner_load: Vec<OwnerLoad>,
}

impl GraphSummary {
    pub fn from_graph(graph: &WorkflowGraph, critical: &CriticalPath) -> Self {
        let mut status_counts = BTreeMap::new();
        let mut owners: BTreeMap<&str, OwnerLoad> = BTreeMap::new();
        for task in graph.all_tasks() {
            *status_counts.entry(task.status).or_insert(0) += 1;
            if !task.is_active() || !task.is_assigned() {
                continue;
            }
            let owner = task.owner.trim();
            let load = owners.entry(owner).or_insert_with(|| OwnerLoad {
                owner: owner.to_string(),
                active: 0,
                in_progress: 0,
                blocked: 0,
                high_priority: 0,
            });
            load.active += 1;
            match task.status {
                TaskStatus::InProgress => load.in_progress += 1,
                TaskStatus::Blocked => load.blocked += 1,
                _ => {}
            }
            if task.priority >= Priority::High {
                load.high_priority += 1;
            }
        }

        Self {
            task_count: graph.task_count(),
            dependency_count: graph.dependency_count(),
            source_count: graph
                .node_indices()
                .filter(|&n| graph.prerequisites(n).is_empty())
                .count(),
            sink_count: graph
                .node_indices()
                .filter(|&n| graph.dependents(n).is_empty())
                .count(),
            max_fan_in: graph.max_fan_in(),
            max_fan_out: graph.max_fan_out(),
            status_counts,
            cycles: graph.cycles().to_vec(),
            critical_path_days: critical.length_days(),
            owner_load: owners.into_values().collect(),
        }
    }
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub schema_version: u32,
    pub as_of: NaiveDate,
    pub config: AnalysisConfig,
    pub graph: GraphSummary,
    /// Findings in canonical report order.
    pub findings: Vec<Finding>,
    pub forecasts: BTreeMap<TaskId, RiskForecast>,
    pub risk_summary: RiskSummary,
    /// Every data-quality warning from graph building and detection, sorted.
    pub warnings: Vec<DataQualityWarning>,
}

impl AnalysisResult {
    pub fn assemble(
        graph: &WorkflowGraph,
        critical: &CriticalPath,
        config: &AnalysisConfig,
        as_of: NaiveDate,
        detection: DetectionReport,
        forecast: Forecast,
    ) -> Self {
        let mut warnings: Vec<DataQualityWarning> = graph.warnings().to_vec();
        warnings.extend(detection.warnings);
        warnings.sort();
        warnings.dedup();

        Self {
            schema_version: ANALYSIS_SCHEMA_VERSION,
            as_of,
            config: config.clone(),
            graph: GraphSummary::from_graph(graph, critical),
            findings: detection.findings,
            forecasts: forecast.forecasts,
            risk_summary: forecast.summary,
            warnings,
        }
    }

    pub fn findings_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    pub fn forecast_for(&self, id: &TaskId) -> Option<&RiskForecast> {
        self.forecasts.get(id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
