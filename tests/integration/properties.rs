//! Property-based checks over generated task sets.

use std::collections::BTreeMap;

use proptest::prelude::*;

use stallwatch::analysis::{CriticalPath, Detector, FindingDetail};
use stallwatch::{AnalysisConfig, Effort, FindingKind, Task, TaskStatus};

use crate::fixtures::{as_of, day, graph, run};

const OWNERS: [&str; 4] = ["", "ann", "bob", "cy"];

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::NotStarted),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Blocked),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Cancelled),
    ]
}

/// One task per index; `deps` picks prerequisites among all indices, so
/// cycles are possible. Self-references are dropped.
fn task_strategy(n: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            0..OWNERS.len(),
            status_strategy(),
            1u8..=5,
            prop::option::of(-20i64..0),
            prop::option::of(-5i64..20),
            prop::collection::vec(0..n, 0..3),
        ),
        n,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (owner, status, effort, start, due, deps))| {
                let mut task = Task::new(format!("T-{:02}", i), "generated")
                    .with_owner(OWNERS[owner])
                    .with_status(status)
                    .with_effort(Effort::Days(effort as f64));
                task.start_date = start.map(day);
                task.due_date = due.map(day);
                for dep in deps.into_iter().filter(|&d| d != i) {
                    task = task.depends_on(format!("T-{:02}", dep));
                }
                task
            })
            .collect()
    })
}

fn tasks_strategy() -> impl Strategy<Value = Vec<Task>> {
    (1usize..10).prop_flat_map(task_strategy)
}

/// Acyclic task sets: prerequisites always have a lower index.
fn dag_strategy() -> impl Strategy<Value = Vec<Task>> {
    (1usize..8)
        .prop_flat_map(|n| {
            (
                prop::collection::vec((1u8..=5, status_strategy()), n),
                prop::collection::vec(any::<bool>(), n * n),
            )
        })
        .prop_map(|(nodes, edges)| {
            let n = nodes.len();
            nodes
                .into_iter()
                .enumerate()
                .map(|(i, (effort, status))| {
                    let mut task = Task::new(format!("N{}", i), "node")
                        .with_status(status)
                        .with_effort(Effort::Days(effort as f64));
                    for j in 0..i {
                        if edges[i * n + j] {
                            task = task.depends_on(format!("N{}", j));
                        }
                    }
                    task
                })
                .collect()
        })
}

/// Heaviest path by exhaustive walk from every task.
fn brute_force_longest(tasks: &[Task]) -> u64 {
    fn walk(tasks: &[Task], index: usize, acc: u64, best: &mut u64) {
        let total = acc + tasks[index].remaining_units();
        *best = (*best).max(total);
        for (next, task) in tasks.iter().enumerate() {
            if task.depends_on.contains(&tasks[index].task_id) {
                walk(tasks, next, total, best);
            }
        }
    }

    let mut best = 0;
    for start in 0..tasks.len() {
        walk(tasks, start, 0, &mut best);
    }
    best
}

proptest! {
    /// Property: the DP critical path matches exhaustive search on DAGs
    #[test]
    fn critical_path_matches_brute_force(tasks in dag_strategy()) {
        let expected = brute_force_longest(&tasks);
        let critical = CriticalPath::compute(&graph(tasks.clone()));
        prop_assert_eq!(critical.length_units, expected);

        // The selected path is itself a maximum-weight path.
        let g = graph(tasks);
        let walked: u64 = CriticalPath::compute(&g)
            .path
            .iter()
            .map(|&n| g.task(n).remaining_units())
            .sum();
        prop_assert_eq!(walked, expected);
    }

    /// Property: an owner is flagged iff their active count exceeds the threshold
    #[test]
    fn overload_flags_owner_iff_over_threshold(
        tasks in tasks_strategy(),
        threshold in 1i64..5,
    ) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for task in &tasks {
            if task.is_active() && task.is_assigned() {
                *counts.entry(task.owner.clone()).or_default() += 1;
            }
        }

        let config = AnalysisConfig {
            owner_load_threshold: threshold,
            ..Default::default()
        };
        let g = graph(tasks);
        let critical = CriticalPath::compute(&g);
        let report = Detector::new(&g, &critical, &config, as_of()).owner_overload_pass();

        let flagged: BTreeMap<String, usize> = report
            .findings
            .iter()
            .map(|f| match &f.detail {
                FindingDetail::OwnerOverload { owner, active_count, .. } => {
                    (owner.clone(), *active_count)
                }
                other => panic!("unexpected detail {:?}", other),
            })
            .collect();
        let expected: BTreeMap<String, usize> = counts
            .into_iter()
            .filter(|(_, count)| *count as i64 > threshold)
            .collect();
        prop_assert_eq!(flagged, expected);
    }

    /// Property: input order never changes findings or scores
    #[test]
    fn permuting_input_does_not_change_result(
        (tasks, shuffled) in tasks_strategy()
            .prop_flat_map(|t| (Just(t.clone()), Just(t).prop_shuffle()))
    ) {
        let config = AnalysisConfig::default();
        let original = run(tasks, &config);
        let permuted = run(shuffled, &config);

        prop_assert_eq!(&original.findings, &permuted.findings);
        prop_assert_eq!(&original.forecasts, &permuted.forecasts);
        prop_assert_eq!(&original.warnings, &permuted.warnings);
        prop_assert_eq!(&original.graph, &permuted.graph);
    }

    /// Property: two runs over the same input serialize identically
    #[test]
    fn analysis_is_idempotent(tasks in tasks_strategy(), parallel in any::<bool>()) {
        let config = AnalysisConfig {
            parallel_passes: parallel,
            ..Default::default()
        };
        let first = run(tasks.clone(), &config).to_json().unwrap();
        let second = run(tasks, &config).to_json().unwrap();
        prop_assert_eq!(first, second);
    }

    /// Property: cycle members never appear on the critical path
    #[test]
    fn cycle_members_stay_off_critical_path(tasks in tasks_strategy()) {
        let result = run(tasks, &AnalysisConfig::default());
        let cyclic: Vec<_> = result.graph.cycles.iter().flatten().collect();
        for finding in result.findings_of(FindingKind::CriticalPath) {
            for id in &cyclic {
                prop_assert!(!finding.involves(id));
            }
        }
    }
}
