//! Deadline risk forecasting.
//!
//! Each active task gets an additive, explainable score built from due-date
//! pressure, the findings it appears in, its unfinished prerequisites and the
//! depth of the chain above it.
//! The score is clamped to [0, 1] and mapped onto a three-level band.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::analysis::critical_path::CriticalPath;
use crate::analysis::finding::{Finding, FindingKind};
use crate::config::AnalysisConfig;
use crate::core::graph::WorkflowGraph;
use crate::core::task::{TaskId, TaskStatus, EFFORT_UNITS_PER_DAY};
use crate::{swlog_debug, swlog_trace};

/// Lower bound of the medium band.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.33;
/// Lower bound of the high band.
pub const HIGH_RISK_THRESHOLD: f64 = 0.66;
/// How many task ids the summary lists as top risks.
pub const TOP_RISK_COUNT: usize = 5;
/// Tasks due this many days out or sooner feel the full due-date weight;
/// further out the pressure falls off as `DUE_PRESSURE_FULL_DAYS / (days_left + 1)`.
pub const DUE_PRESSURE_FULL_DAYS: i64 = 3;
/// Upstream chains with this many ancestors count as fully deep.
pub const DEPTH_SATURATION_ANCESTORS: usize = 5;
/// Extra exposure when every ancestor is still waiting to start or blocked.
pub const STALLED_ANCESTOR_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if score >= MEDIUM_RISK_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskBand::Low => write!(f, "low"),
            RiskBand::Medium => write!(f, "medium"),
            RiskBand::High => write!(f, "high"),
        }
    }
}

/// What pushed a task's score up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorTag {
    Overdue,
    DueDateProximity,
    CriticalPath,
    OwnerOverload,
    Blocked,
    Aging,
    CircularDependency,
    DependencyChokepoint,
    UnresolvedDependencies,
    DependencyDepth,
}

impl FactorTag {
    fn for_finding(kind: FindingKind) -> Self {
        match kind {
            FindingKind::CriticalPath => FactorTag::CriticalPath,
            FindingKind::OwnerOverload => FactorTag::OwnerOverload,
            FindingKind::Blocked => FactorTag::Blocked,
            FindingKind::Aging => FactorTag::Aging,
            FindingKind::CircularDependency => FactorTag::CircularDependency,
            FindingKind::DependencyChokepoint => FactorTag::DependencyChokepoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub tag: FactorTag,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskForecast {
    pub task_id: TaskId,
    pub risk_score: f64,
    pub band: RiskBand,
    /// Heaviest factor first.
    pub contributing_factors: Vec<RiskFactor>,
    /// Days the chain-implied finish lands after the due date; zero means on
    /// track. Absent when the task has no due date or sits in a cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_slip_days: Option<i64>,
}

/// Workflow-level roll-up of the per-task forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub assessed: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub mean_score: f64,
    pub max_score: f64,
    /// Band of the riskiest task.
    pub overall: RiskBand,
    pub top_risks: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_projected_slip_days: Option<i64>,
}

impl RiskSummary {
    fn from_forecasts(forecasts: &BTreeMap<TaskId, RiskForecast>) -> Self {
        let count_band = |band: RiskBand| forecasts.values().filter(|f| f.band == band).count();
        let total: f64 = forecasts.values().map(|f| f.risk_score).sum();
        let max_score = forecasts
            .values()
            .map(|f| f.risk_score)
            .fold(0.0_f64, f64::max);
        let mean_score = if forecasts.is_empty() {
            0.0
        } else {
            total / forecasts.len() as f64
        };

        let mut ranked: Vec<&RiskForecast> = forecasts.values().collect();
        ranked.sort_by(|a, b| {
            b.risk_score
                .total_cmp(&a.risk_score)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        Self {
            assessed: forecasts.len(),
            high: count_band(RiskBand::High),
            medium: count_band(RiskBand::Medium),
            low: count_band(RiskBand::Low),
            mean_score,
            max_score,
            overall: RiskBand::from_score(max_score),
            top_risks: ranked
                .into_iter()
                .take(TOP_RISK_COUNT)
                .map(|f| f.task_id.clone())
                .collect(),
            max_projected_slip_days: forecasts
                .values()
                .filter_map(|f| f.projected_slip_days)
                .max(),
        }
    }
}

/// Forecasts keyed by task id plus their summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub forecasts: BTreeMap<TaskId, RiskForecast>,
    pub summary: RiskSummary,
}

pub struct Forecaster<'a> {
    graph: &'a WorkflowGraph,
    critical: &'a CriticalPath,
    findings: &'a [Finding],
    config: &'a AnalysisConfig,
    as_of: NaiveDate,
}

impl<'a> Forecaster<'a> {
    pub fn new(
        graph: &'a WorkflowGraph,
        critical: &'a CriticalPath,
        findings: &'a [Finding],
        config: &'a AnalysisConfig,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            graph,
            critical,
            findings,
            config,
            as_of,
        }
    }

    /// Score every task that is neither completed nor cancelled.
    pub fn forecast(&self) -> Forecast {
        let mut membership: HashMap<&TaskId, BTreeSet<FindingKind>> = HashMap::new();
        for finding in self.findings {
            for id in finding.affected_tasks() {
                membership.entry(id).or_default().insert(finding.kind);
            }
        }

        let forecasts: BTreeMap<TaskId, RiskForecast> = self
            .graph
            .node_indices()
            .filter(|&n| self.graph.task(n).is_active())
            .map(|n| {
                let kinds = membership.get(&self.graph.task(n).task_id);
                let forecast = self.forecast_task(n, kinds);
                (forecast.task_id.clone(), forecast)
            })
            .collect();

        let summary = RiskSummary::from_forecasts(&forecasts);
        swlog_debug!(
            "Forecaster: {} tasks assessed, {} high, overall {}",
            summary.assessed,
            summary.high,
            summary.overall
        );
        Forecast { forecasts, summary }
    }

    fn forecast_task(&self, node: NodeIndex, kinds: Option<&BTreeSet<FindingKind>>) -> RiskForecast {
        let task = self.graph.task(node);
        let weights = &self.config.weights;
        let mut factors = Vec::new();

        if let Some(due) = task.due_date {
            let days_left = (due - self.as_of).num_days();
            let window = self.config.due_soon_window_days;
            if days_left < 0 {
                factors.push(RiskFactor {
                    tag: FactorTag::Overdue,
                    weight: weights.due_proximity,
                });
            } else if days_left <= window {
                let pressure = due_pressure(days_left);
                factors.push(RiskFactor {
                    tag: FactorTag::DueDateProximity,
                    weight: weights.due_proximity * pressure,
                });
            }
        }

        for &kind in kinds.into_iter().flatten() {
            let weight = match kind {
                FindingKind::CriticalPath => weights.critical_path,
                FindingKind::OwnerOverload => weights.owner_overload,
                FindingKind::Blocked => weights.blocked,
                FindingKind::Aging => weights.aging,
                FindingKind::CircularDependency => weights.circular_dependency,
                FindingKind::DependencyChokepoint => weights.dependency_chokepoint,
            };
            factors.push(RiskFactor {
                tag: FactorTag::for_finding(kind),
                weight,
            });
        }

        let unresolved = self
            .graph
            .prerequisites(node)
            .into_iter()
            .filter(|&p| self.graph.task(p).is_active())
            .count();
        if unresolved > 0 {
            factors.push(RiskFactor {
                tag: FactorTag::UnresolvedDependencies,
                weight: weights.unresolved_dependency * unresolved as f64,
            });
        }

        let ancestors = self.graph.ancestors(node);
        if !ancestors.is_empty() {
            let stalled = ancestors
                .iter()
                .filter(|&&a| {
                    matches!(
                        self.graph.task(a).status,
                        TaskStatus::NotStarted | TaskStatus::Blocked
                    )
                })
                .count();
            factors.push(RiskFactor {
                tag: FactorTag::DependencyDepth,
                weight: weights.dependency_depth * depth_exposure(ancestors.len(), stalled),
            });
        }

        factors.retain(|f| f.weight > 0.0);
        let risk_score = factors.iter().map(|f| f.weight).sum::<f64>().clamp(0.0, 1.0);
        factors.sort_by(|a, b| match b.weight.total_cmp(&a.weight) {
            Ordering::Equal => a.tag.cmp(&b.tag),
            other => other,
        });

        let projected_slip_days = task.due_date.and_then(|due| {
            let units = self.critical.earliest_finish_units(node)?;
            let finish_days = i64::try_from(units.div_ceil(EFFORT_UNITS_PER_DAY)).ok()?;
            let finish = self
                .as_of
                .checked_add_signed(Duration::try_days(finish_days)?)?;
            Some((finish - due).num_days().max(0))
        });

        swlog_trace!(
            "risk {} score={:.3} factors={}",
            task.task_id,
            risk_score,
            factors.len()
        );

        RiskForecast {
            task_id: task.task_id.clone(),
            risk_score,
            band: RiskBand::from_score(risk_score),
            contributing_factors: factors,
            projected_slip_days,
        }
    }
}

/// Share of the due-date weight for a task `days_left` days from its deadline.
fn due_pressure(days_left: i64) -> f64 {
    (DUE_PRESSURE_FULL_DAYS as f64 / (days_left + 1) as f64).min(1.0)
}

/// Exposure in [0, 1] from the number of transitive prerequisites and how
/// many of them have not started or are blocked.
fn depth_exposure(depth: usize, stalled: usize) -> f64 {
    let depth_risk = (depth as f64 / DEPTH_SATURATION_ANCESTORS as f64).min(1.0);
    let stalled_share = stalled as f64 / depth.max(1) as f64;
    (depth_risk + STALLED_ANCESTOR_PENALTY * stalled_share).min(1.0)
}
