//! Bottleneck detection passes over a workflow graph.
//!
//! Each pass reads the graph and produces findings plus data-quality
//! warnings without touching anything else. The passes are independent, so
//! they can run on scoped threads; the final sort makes the output identical
//! regardless of completion order.

use std::collections::BTreeMap;
use std::thread;

use chrono::NaiveDate;
use petgraph::graph::NodeIndex;

use crate::analysis::critical_path::CriticalPath;
use crate::analysis::finding::{sort_findings, Finding, FindingDetail, FindingKind, Severity};
use crate::config::AnalysisConfig;
use crate::core::graph::WorkflowGraph;
use crate::core::task::{Task, TaskId, TaskStatus};
use crate::error::DataQualityWarning;
use crate::{swlog_debug, swlog_trace};

/// Owner load ratio (active / threshold) at which overload becomes High.
pub const OVERLOAD_HIGH_RATIO: f64 = 1.5;
/// Owner load ratio at which overload becomes Critical.
pub const OVERLOAD_CRITICAL_RATIO: f64 = 2.0;
/// Each full step of days past the aging threshold raises severity one level.
pub const AGING_STEP_DAYS: i64 = 5;
/// Fan-in ratio (prerequisites / threshold) at which a chokepoint becomes High.
pub const CHOKEPOINT_HIGH_RATIO: f64 = 2.0;

/// Detection passes, in no particular execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Blocked,
    OwnerOverload,
    Aging,
    CriticalPath,
    Cycles,
    Chokepoints,
}

impl Pass {
    pub const ALL: [Pass; 6] = [
        Pass::Blocked,
        Pass::OwnerOverload,
        Pass::Aging,
        Pass::CriticalPath,
        Pass::Cycles,
        Pass::Chokepoints,
    ];
}

/// Output of one pass.
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub findings: Vec<Finding>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Merged output of every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    /// Findings in canonical report order.
    pub findings: Vec<Finding>,
    /// Warnings raised by the passes, sorted.
    pub warnings: Vec<DataQualityWarning>,
}

impl DetectionReport {
    fn merge(outputs: impl IntoIterator<Item = PassOutput>) -> Self {
        let mut report = Self::default();
        for output in outputs {
            report.findings.extend(output.findings);
            report.warnings.extend(output.warnings);
        }
        sort_findings(&mut report.findings);
        report.warnings.sort();
        report.warnings.dedup();
        report
    }

    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }
}

/// Runs detection passes against one graph, config, and as-of date.
pub struct Detector<'a> {
    graph: &'a WorkflowGraph,
    critical: &'a CriticalPath,
    config: &'a AnalysisConfig,
    as_of: NaiveDate,
}

impl<'a> Detector<'a> {
    pub fn new(
        graph: &'a WorkflowGraph,
        critical: &'a CriticalPath,
        config: &'a AnalysisConfig,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            graph,
            critical,
            config,
            as_of,
        }
    }

    /// Run every pass, in parallel when the config asks for it.
    pub fn detect(&self) -> DetectionReport {
        let outputs = if self.config.parallel_passes {
            self.run_parallel()
        } else {
            Pass::ALL.iter().map(|&pass| self.run_pass(pass)).collect()
        };
        let report = DetectionReport::merge(outputs);
        swlog_debug!(
            "Detector: {} findings, {} warnings (as_of={})",
            report.findings.len(),
            report.warnings.len(),
            self.as_of
        );
        report
    }

    fn run_parallel(&self) -> Vec<PassOutput> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::scope(|scope| {
            for pass in Pass::ALL {
                let tx = tx.clone();
                scope.spawn(move || {
                    // The receiver outlives the scope, so send cannot fail.
                    let _ = tx.send(self.run_pass(pass));
                });
            }
        });
        drop(tx);
        rx.iter().collect()
    }

    pub fn run_pass(&self, pass: Pass) -> PassOutput {
        let output = match pass {
            Pass::Blocked => self.blocked_pass(),
            Pass::OwnerOverload => self.owner_overload_pass(),
            Pass::Aging => self.aging_pass(),
            Pass::CriticalPath => self.critical_path_pass(),
            Pass::Cycles => self.cycle_pass(),
            Pass::Chokepoints => self.chokepoint_pass(),
        };
        swlog_trace!("{:?} pass: {} findings", pass, output.findings.len());
        output
    }

    /// Flag unfinished tasks waiting on unfinished prerequisites.
    ///
    /// A task whose own status is `blocked` is flagged even when every
    /// prerequisite is done.
    pub fn blocked_pass(&self) -> PassOutput {
        let mut findings = Vec::new();
        for node in self.graph.node_indices() {
            let task = self.graph.task(node);
            if task.status.is_terminal() {
                continue;
            }
            let incomplete: Vec<TaskId> = self
                .graph
                .prerequisites(node)
                .into_iter()
                .map(|p| self.graph.task(p))
                .filter(|p| p.status.is_active())
                .map(|p| p.task_id.clone())
                .collect();
            let explicitly_blocked = task.status == TaskStatus::Blocked;
            if incomplete.is_empty() && !explicitly_blocked {
                continue;
            }

            let base = incomplete.len().saturating_sub(1).min(2) as u8;
            let severity = Severity::from_level(base + task.priority.severity_bump());
            findings.push(Finding {
                kind: FindingKind::Blocked,
                task_ids: vec![task.task_id.clone()],
                severity,
                detail: FindingDetail::Blocked {
                    incomplete_prerequisites: incomplete,
                    explicitly_blocked,
                    priority: task.priority,
                },
            });
        }
        PassOutput {
            findings,
            warnings: Vec::new(),
        }
    }

    /// Flag owners holding more active tasks than the configured capacity.
    pub fn owner_overload_pass(&self) -> PassOutput {
        let threshold = self.config.owner_load_threshold;
        let mut by_owner: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in self.graph.all_tasks() {
            if task.is_active() && task.is_assigned() {
                by_owner.entry(task.owner.trim()).or_default().push(task);
            }
        }

        let mut findings = Vec::new();
        for (owner, mut tasks) in by_owner {
            let count = tasks.len();
            if (count as i64) <= threshold {
                continue;
            }
            tasks.sort_by(|a, b| due_date_order(a, b));

            let ratio = count as f64 / threshold as f64;
            let severity = if ratio >= OVERLOAD_CRITICAL_RATIO {
                Severity::Critical
            } else if ratio >= OVERLOAD_HIGH_RATIO {
                Severity::High
            } else {
                Severity::Medium
            };
            findings.push(Finding {
                kind: FindingKind::OwnerOverload,
                task_ids: tasks.iter().map(|t| t.task_id.clone()).collect(),
                severity,
                detail: FindingDetail::OwnerOverload {
                    owner: owner.to_string(),
                    active_count: count,
                    threshold,
                },
            });
        }
        PassOutput {
            findings,
            warnings: Vec::new(),
        }
    }

    /// Flag in-progress tasks started longer ago than the aging threshold.
    ///
    /// In-progress tasks without a start date cannot be aged and are
    /// reported as warnings instead.
    pub fn aging_pass(&self) -> PassOutput {
        let threshold = self.config.aging_threshold_days;
        let mut output = PassOutput::default();
        for task in self.graph.all_tasks() {
            if task.status != TaskStatus::InProgress {
                continue;
            }
            let Some(start_date) = task.start_date else {
                output.warnings.push(DataQualityWarning::MissingStartDate {
                    task_id: task.task_id.clone(),
                });
                continue;
            };
            let age_days = (self.as_of - start_date).num_days();
            if age_days <= threshold {
                continue;
            }
            let steps = ((age_days - threshold) / AGING_STEP_DAYS).min(3) as u8;
            output.findings.push(Finding {
                kind: FindingKind::Aging,
                task_ids: vec![task.task_id.clone()],
                severity: Severity::from_level(steps),
                detail: FindingDetail::Aging {
                    start_date,
                    age_days,
                    threshold_days: threshold,
                },
            });
        }
        output
    }

    /// Report the heaviest remaining-effort chain of the acyclic portion.
    pub fn critical_path_pass(&self) -> PassOutput {
        let critical = self.critical;
        let mut output = PassOutput::default();
        if critical.length_units == 0 {
            return output;
        }
        let task_id = |n: &NodeIndex| self.graph.task(*n).task_id.clone();
        output.findings.push(Finding {
            kind: FindingKind::CriticalPath,
            task_ids: critical.path.iter().map(task_id).collect(),
            severity: Severity::Critical,
            detail: FindingDetail::CriticalPath {
                length_days: critical.length_days(),
                members: critical.members.iter().map(task_id).collect(),
            },
        });
        output
    }

    /// One finding per dependency cycle.
    pub fn cycle_pass(&self) -> PassOutput {
        let findings = self
            .graph
            .cycles()
            .iter()
            .map(|cycle| Finding {
                kind: FindingKind::CircularDependency,
                task_ids: cycle.clone(),
                severity: Severity::High,
                detail: FindingDetail::CircularDependency { size: cycle.len() },
            })
            .collect();
        PassOutput {
            findings,
            warnings: Vec::new(),
        }
    }

    /// Flag unfinished tasks that wait on at least the configured number of
    /// direct prerequisites, finished or not.
    pub fn chokepoint_pass(&self) -> PassOutput {
        let threshold = self.config.chokepoint_fan_in_threshold;
        let findings = self
            .graph
            .node_indices()
            .filter(|&n| self.graph.task(n).is_active())
            .filter_map(|n| {
                let fan_in = self.graph.prerequisites(n).len();
                if (fan_in as i64) < threshold {
                    return None;
                }
                let severity = if fan_in as f64 / threshold as f64 >= CHOKEPOINT_HIGH_RATIO {
                    Severity::High
                } else {
                    Severity::Medium
                };
                Some(Finding {
                    kind: FindingKind::DependencyChokepoint,
                    task_ids: vec![self.graph.task(n).task_id.clone()],
                    severity,
                    detail: FindingDetail::DependencyChokepoint {
                        fan_in,
                        fan_out: self.graph.dependents(n).len(),
                        threshold,
                    },
                })
            })
            .collect();
        PassOutput {
            findings,
            warnings: Vec::new(),
        }
    }
}

/// Earliest due date first, undated last, ties by id.
fn due_date_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let by_due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due.then_with(|| a.task_id.cmp(&b.task_id))
}
