//! End-to-end scenarios over the fixture task sets.

use tempfile::TempDir;

use stallwatch::analysis::FactorTag;
use stallwatch::core::task::MAX_EFFORT_DAYS;
use stallwatch::{
    analyze, AnalysisConfig, DataQualityWarning, Effort, Error, FindingDetail, FindingKind,
    RiskBand, Severity, Task, TaskId, TaskRegistry, TaskStatus, ValidationIssue,
};

use crate::fixtures::{as_of, cyclic_tasks, day, run, team_tasks};

fn ids(raw: &[&str]) -> Vec<TaskId> {
    raw.iter().map(|&s| TaskId::from(s)).collect()
}

/// Test: Aging
/// Given T-001 in progress for 10 days and an aging threshold of 5
/// When the team is analyzed
/// Then T-001 gets exactly one aging finding
#[test]
fn test_long_running_task_is_aging() {
    let result = run(team_tasks(), &AnalysisConfig::default());

    let aging: Vec<_> = result.findings_of(FindingKind::Aging).collect();
    assert_eq!(aging.len(), 1);
    assert_eq!(aging[0].task_ids, ids(&["T-001"]));
    assert_eq!(aging[0].severity, Severity::Medium);
    match &aging[0].detail {
        FindingDetail::Aging {
            age_days,
            threshold_days,
            ..
        } => {
            assert_eq!(*age_days, 10);
            assert_eq!(*threshold_days, 5);
        }
        other => panic!("Expected aging detail, got {:?}", other),
    }
}

/// Test: Owner overload
/// Given Bob holds four active tasks and the load threshold is 3
/// When the team is analyzed
/// Then one finding lists all four tasks, earliest deadline first
#[test]
fn test_overloaded_owner_lists_tasks_by_due_date() {
    let result = run(team_tasks(), &AnalysisConfig::default());

    let overload: Vec<_> = result.findings_of(FindingKind::OwnerOverload).collect();
    assert_eq!(overload.len(), 1, "Only Bob should be overloaded");
    assert_eq!(overload[0].task_ids, ids(&["T-003", "T-004", "T-002", "T-005"]));
    match &overload[0].detail {
        FindingDetail::OwnerOverload {
            owner,
            active_count,
            threshold,
        } => {
            assert_eq!(owner, "Bob");
            assert_eq!(*active_count, 4);
            assert_eq!(*threshold, 3);
        }
        other => panic!("Expected overload detail, got {:?}", other),
    }
}

/// Test: Due-date pressure
/// Given T-006 is due two days after the as-of date with a 7 day window
/// When risk is forecast
/// Then T-006 lands at least in the medium band
#[test]
fn test_task_due_soon_is_at_least_medium_risk() {
    let result = run(team_tasks(), &AnalysisConfig::default());

    let forecast = result.forecast_for(&TaskId::from("T-006")).unwrap();
    assert!(forecast.band >= RiskBand::Medium, "got {:?}", forecast);
    assert!(forecast.risk_score >= 0.33);
    assert_eq!(forecast.projected_slip_days, Some(0));
}

#[test]
fn test_team_report_order_and_critical_path() {
    let result = run(team_tasks(), &AnalysisConfig::default());

    let kinds: Vec<FindingKind> = result.findings.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FindingKind::CriticalPath,
            FindingKind::OwnerOverload,
            FindingKind::Blocked,
            FindingKind::Aging,
        ]
    );

    let critical = &result.findings[0];
    assert_eq!(critical.task_ids, ids(&["T-001", "T-007"]));
    assert_eq!(result.graph.critical_path_days, 7.0);

    let blocked = &result.findings[2];
    assert_eq!(blocked.task_ids, ids(&["T-007"]));
    assert_eq!(blocked.severity, Severity::Medium);

    assert!(result.warnings.is_empty());
    assert_eq!(result.risk_summary.assessed, 7);
}

/// Test: Cycle handling
/// Given A -> B -> C -> A next to an ordinary chain
/// When the graph is analyzed
/// Then the run completes, reports the cycle, keeps A/B/C off the critical
/// path, and still evaluates them in the other passes
#[test]
fn test_three_task_cycle_is_reported_not_fatal() {
    let config = AnalysisConfig {
        owner_load_threshold: 2,
        ..Default::default()
    };
    let result = run(cyclic_tasks(), &config);

    assert_eq!(result.graph.cycles, vec![ids(&["A", "B", "C"])]);
    let cycle: Vec<_> = result
        .findings_of(FindingKind::CircularDependency)
        .collect();
    assert_eq!(cycle.len(), 1);
    assert_eq!(cycle[0].task_ids, ids(&["A", "B", "C"]));

    let critical = result
        .findings_of(FindingKind::CriticalPath)
        .next()
        .unwrap();
    assert_eq!(critical.task_ids, ids(&["D", "E"]));
    for member in ["A", "B", "C"] {
        assert!(!critical.involves(&TaskId::from(member)));
    }

    let blocked: Vec<Vec<TaskId>> = result
        .findings_of(FindingKind::Blocked)
        .map(|f| f.task_ids.clone())
        .collect();
    for member in ["A", "B", "C"] {
        assert!(blocked.contains(&ids(&[member])), "{} should be blocked", member);
    }

    let aging: Vec<_> = result.findings_of(FindingKind::Aging).collect();
    assert_eq!(aging[0].task_ids, ids(&["A"]));

    let overload: Vec<_> = result.findings_of(FindingKind::OwnerOverload).collect();
    assert_eq!(overload[0].task_ids, ids(&["A", "B", "C"]));

    let forecast = result.forecast_for(&TaskId::from("A")).unwrap();
    assert_eq!(forecast.projected_slip_days, None);
}

#[test]
fn test_task_downstream_of_cycle_starts_a_chain() {
    let result = run(cyclic_tasks(), &AnalysisConfig::default());
    assert_eq!(result.graph.critical_path_days, 4.0);

    let forecast = result.forecast_for(&TaskId::from("F")).unwrap();
    let tags: Vec<FactorTag> = forecast.contributing_factors.iter().map(|f| f.tag).collect();
    assert!(tags.contains(&FactorTag::Blocked));
    assert!(tags.contains(&FactorTag::UnresolvedDependencies));
    assert!(!tags.contains(&FactorTag::CriticalPath));
}

/// Test: Idempotence
/// Given one registry, config, and as-of date
/// When analyzed twice
/// Then the serialized results are byte-identical
#[test]
fn test_repeated_runs_are_identical() {
    let config = AnalysisConfig::default();
    let first = run(team_tasks(), &config).to_json().unwrap();
    let second = run(team_tasks(), &config).to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_passes_match_sequential() {
    let sequential = run(cyclic_tasks(), &AnalysisConfig::default());
    let parallel = run(
        cyclic_tasks(),
        &AnalysisConfig {
            parallel_passes: true,
            ..Default::default()
        },
    );

    assert_eq!(parallel.findings, sequential.findings);
    assert_eq!(parallel.forecasts, sequential.forecasts);
    assert_eq!(parallel.warnings, sequential.warnings);
    assert!(parallel.config.parallel_passes);
}

#[test]
fn test_dangling_dependency_degrades_to_warning() {
    let mut tasks = team_tasks();
    tasks.push(Task::new("T-008", "Follow-up").depends_on("T-404"));
    let result = run(tasks, &AnalysisConfig::default());

    assert!(result
        .warnings
        .contains(&DataQualityWarning::DanglingDependency {
            task_id: TaskId::from("T-008"),
            missing: TaskId::from("T-404"),
        }));
    assert!(result.forecast_for(&TaskId::from("T-008")).is_some());
}

#[test]
fn test_duplicate_ids_fail_registry_construction() {
    let err = TaskRegistry::from_tasks(vec![
        Task::new("T-1", "one"),
        Task::new("T-1", "again"),
    ])
    .unwrap_err();
    assert_eq!(err.issues().len(), 1);
    assert!(err.to_string().contains("T-1"));
}

#[test]
fn test_json_records_analyze_like_cli_input() {
    let json = format!(
        r#"[
            {{"task_id": "T-2", "owner": "Eve", "depends_on": ["T-1"], "effort": "high"}},
            {{"task_id": "T-1", "owner": "Eve", "status": "in_progress",
              "start_date": "{}", "due_date": "{}", "effort": 1.5}}
        ]"#,
        day(-1),
        day(1)
    );
    let tasks: Vec<Task> = serde_json::from_str(&json).unwrap();
    let registry = TaskRegistry::from_tasks(tasks).unwrap();
    let result = analyze(&registry, &AnalysisConfig::default(), as_of()).unwrap();

    assert_eq!(result.graph.task_count, 2);
    assert_eq!(result.graph.dependency_count, 1);
    assert_eq!(result.graph.critical_path_days, 6.5);
    let t1 = result.forecast_for(&TaskId::from("T-1")).unwrap();
    assert_eq!(t1.projected_slip_days, Some(1));
}

#[test]
fn test_thresholds_loaded_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "owner_load_threshold = 5\naging_threshold_days = 20\n",
    )
    .unwrap();
    let config = AnalysisConfig::load_from(&path).unwrap();
    assert_eq!(config.due_soon_window_days, 7);

    let result = run(team_tasks(), &config);
    assert_eq!(result.findings_of(FindingKind::OwnerOverload).count(), 0);
    assert_eq!(result.findings_of(FindingKind::Aging).count(), 0);
    assert_eq!(result.config.owner_load_threshold, 5);
}

/// Test: Malformed effort
/// Given estimates that are negative, NaN, or absurdly large
/// When the registry is analyzed
/// Then the run fails with one validation issue per task instead of panicking
#[test]
fn test_malformed_effort_fails_validation() {
    let mut tasks = team_tasks();
    tasks.push(
        Task::new("T-100", "Huge")
            .with_effort(Effort::Days(1e8))
            .with_due(as_of()),
    );
    tasks.push(
        Task::new("T-101", "Huger")
            .with_effort(Effort::Days(1e30))
            .depends_on("T-100"),
    );
    tasks.push(Task::new("T-102", "Negative").with_effort(Effort::Days(-2.0)));
    tasks.push(Task::new("T-103", "Unknown").with_effort(Effort::Days(f64::NAN)));
    let registry = TaskRegistry::from_tasks(tasks).unwrap();

    let err = analyze(&registry, &AnalysisConfig::default(), as_of()).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(
        err.issues(),
        &["T-100", "T-101", "T-102", "T-103"]
            .map(|id| ValidationIssue::InvalidEffort {
                task_id: TaskId::from(id)
            })
    );
}

#[test]
fn test_largest_estimates_still_project_slip() {
    let tasks = vec![
        Task::new("S-1", "first").with_effort(Effort::Days(MAX_EFFORT_DAYS)),
        Task::new("S-2", "second")
            .depends_on("S-1")
            .with_effort(Effort::Days(MAX_EFFORT_DAYS))
            .with_due(day(10)),
    ];
    let result = run(tasks, &AnalysisConfig::default());

    assert_eq!(result.graph.critical_path_days, 2.0 * MAX_EFFORT_DAYS);
    let forecast = result.forecast_for(&TaskId::from("S-2")).unwrap();
    assert_eq!(forecast.projected_slip_days, Some(19_990));
    assert_eq!(forecast.band, RiskBand::High);
}

/// Test: Dependency chokepoint
/// Given a launch task waiting on four prerequisites
/// When the workflow is analyzed
/// Then it is reported as a chokepoint and the fan-in maximum is summarized
#[test]
fn test_converging_prerequisites_form_chokepoint() {
    let mut tasks = team_tasks();
    tasks.push(
        Task::new("T-008", "Go-live")
            .with_owner("Dana")
            .depends_on("T-002")
            .depends_on("T-003")
            .depends_on("T-004")
            .depends_on("T-007"),
    );
    let result = run(tasks, &AnalysisConfig::default());

    let chokepoints: Vec<_> = result
        .findings_of(FindingKind::DependencyChokepoint)
        .collect();
    assert_eq!(chokepoints.len(), 1);
    assert_eq!(chokepoints[0].task_ids, ids(&["T-008"]));
    assert_eq!(chokepoints[0].severity, Severity::Medium);
    assert_eq!(result.graph.max_fan_in, 4);
    assert_eq!(result.graph.max_fan_out, 1);

    let kinds: Vec<FindingKind> = result.findings.iter().map(|f| f.kind).collect();
    let aging = kinds.iter().position(|k| *k == FindingKind::Aging).unwrap();
    let chokepoint = kinds
        .iter()
        .position(|k| *k == FindingKind::DependencyChokepoint)
        .unwrap();
    assert!(aging < chokepoint);

    let forecast = result.forecast_for(&TaskId::from("T-008")).unwrap();
    let tags: Vec<FactorTag> = forecast.contributing_factors.iter().map(|f| f.tag).collect();
    assert!(tags.contains(&FactorTag::DependencyChokepoint));
    assert!(tags.contains(&FactorTag::DependencyDepth));
}

#[test]
fn test_deep_stalled_chain_outweighs_shallow_one() {
    let chain = |prefix: &str, len: usize, status: TaskStatus| -> Vec<Task> {
        (0..len)
            .map(|i| {
                let task = Task::new(format!("{}{}", prefix, i), "link")
                    .with_effort(Effort::Days(0.0))
                    .with_status(status);
                if i == 0 {
                    task
                } else {
                    task.depends_on(format!("{}{}", prefix, i - 1))
                }
            })
            .collect()
    };
    let mut tasks = chain("D", 6, TaskStatus::NotStarted);
    tasks.extend(chain("S", 2, TaskStatus::NotStarted));
    let result = run(tasks, &AnalysisConfig::default());

    let depth = |id: &str| {
        result
            .forecast_for(&TaskId::from(id))
            .unwrap()
            .contributing_factors
            .iter()
            .find(|f| f.tag == FactorTag::DependencyDepth)
            .map(|f| f.weight)
            .unwrap_or(0.0)
    };
    assert_eq!(depth("D0"), 0.0);
    assert_eq!(depth("D5"), result.config.weights.dependency_depth);
    assert!(depth("D5") > depth("S1"));
}
