//! Analysis pipeline: graph building, bottleneck detection, risk forecasting.
//!
//! The stages are plain functions of their inputs and are composed in order
//! by [`analyze`]. Each stage can also be run on its own, which lets callers
//! re-run detection with different thresholds against the same graph.

pub mod critical_path;
pub mod detector;
pub mod finding;
pub mod forecast;
pub mod result;

use chrono::NaiveDate;

use crate::config::AnalysisConfig;
use crate::core::graph::WorkflowGraph;
use crate::core::registry::TaskRegistry;
use crate::error::Result;
use crate::swlog;

pub use critical_path::CriticalPath;
pub use detector::{DetectionReport, Detector, Pass};
pub use finding::{Finding, FindingDetail, FindingKind, Severity};
pub use forecast::{FactorTag, Forecast, Forecaster, RiskBand, RiskFactor, RiskForecast, RiskSummary};
pub use result::{AnalysisResult, GraphSummary, OwnerLoad, ANALYSIS_SCHEMA_VERSION};

/// Run the full pipeline for one registry.
///
/// # Errors
/// `Error::Configuration` for unusable thresholds and `Error::Validation`
/// for structural registry problems. Cycles and data-quality issues do not
/// fail the run; they are reported in the result.
pub fn analyze(
    registry: &TaskRegistry,
    config: &AnalysisConfig,
    as_of: NaiveDate,
) -> Result<AnalysisResult> {
    config.validate()?;
    let graph = WorkflowGraph::build(registry)?;
    let critical = CriticalPath::compute(&graph);
    let detection = Detector::new(&graph, &critical, config, as_of).detect();
    let forecast =
        Forecaster::new(&graph, &critical, &detection.findings, config, as_of).forecast();
    let result = AnalysisResult::assemble(&graph, &critical, config, as_of, detection, forecast);
    swlog!(
        "Analysis as of {}: {} tasks, {} findings, {} warnings, overall risk {}",
        as_of,
        result.graph.task_count,
        result.findings.len(),
        result.warnings.len(),
        result.risk_summary.overall
    );
    Ok(result)
}
