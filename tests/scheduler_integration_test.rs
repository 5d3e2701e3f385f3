//! Integration tests for level-by-level scheduling.
//!
//! Covers the level barrier, failure isolation, the concurrency bound,
//! dependency failure policies, escalation collection and report persistence.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{PanickingWorker, TimelineWorker};
use shepherd::adapters::{InMemoryReportStore, RecordingNotifier, SimulatedResponse, SimulatedWorker};
use shepherd::domain::models::{
    DependencyFailurePolicy, Escalation, EscalationTarget, ExecutionPlan, SchedulerConfig,
    Severity, Task, TaskStatus, WorkItem, WorkerMetrics, WorkerOutcome, WorkerType,
};
use shepherd::services::{DependencyGraphBuilder, OrchestrationScheduler, WorkerRegistry};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn plan_for(scheduler: &OrchestrationScheduler, tasks: Vec<Task>) -> ExecutionPlan {
    let graph = DependencyGraphBuilder::new()
        .build_graph(&tasks)
        .expect("graph should build");
    scheduler.create_execution_plan(tasks, graph)
}

fn config(max_concurrency: usize, policy: DependencyFailurePolicy) -> SchedulerConfig {
    SchedulerConfig {
        max_concurrency,
        dependency_failure_policy: policy,
        ..SchedulerConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Barrier and concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_level_barrier_holds() {
    common::setup_test_logging();
    let worker = TimelineWorker::new(WorkerType::CodeGeneration, Duration::from_millis(25));
    let registry = WorkerRegistry::new().register_worker(worker.clone());
    let scheduler = OrchestrationScheduler::new(SchedulerConfig::default(), &registry);

    let tasks = vec![
        Task::new("a", "A"),
        Task::new("b", "B").with_duration(90),
        Task::new("c", "C").with_dependency("a"),
        Task::new("d", "D").with_dependencies(["b", "c"]),
    ];
    let mut plan = plan_for(&scheduler, tasks);
    assert_eq!(plan.graph.levels, vec![vec!["a", "b"], vec!["c"], vec!["d"]]);

    let report = scheduler.execute_parallel(&mut plan).await.unwrap();
    assert_eq!(report.summary.completed, 4);

    let spans = worker.spans().await;
    for (earlier, later) in [(&["a", "b"][..], "c"), (&["a", "b", "c"][..], "d")] {
        let later_start = spans.iter().find(|s| s.task_id == later).unwrap().start;
        for id in earlier {
            let end = spans.iter().find(|s| s.task_id == *id).unwrap().end;
            assert!(end <= later_start, "{later} started before {id} finished");
        }
    }

    // Tasks of the first level overlap.
    let a = worker.span("a").await.unwrap();
    let b = worker.span("b").await.unwrap();
    assert!(a.start < b.end && b.start < a.end, "a and b should run concurrently");
}

#[tokio::test]
async fn test_concurrency_bound_respected() {
    let worker = SimulatedWorker::new(WorkerType::CodeGeneration)
        .with_delay(Duration::from_millis(20))
        .shared();
    let registry = WorkerRegistry::new().register_worker(worker.clone());
    let scheduler = OrchestrationScheduler::new(
        config(2, DependencyFailurePolicy::BestEffort),
        &registry,
    );

    let tasks: Vec<Task> = (0..6).map(|i| Task::new(format!("t{i}"), "parallel")).collect();
    let mut plan = plan_for(&scheduler, tasks);
    assert_eq!(plan.concurrency_limit, 2);

    let report = scheduler.execute_parallel(&mut plan).await.unwrap();

    assert_eq!(report.summary.completed, 6);
    assert!(worker.peak_concurrency() <= 2, "peak was {}", worker.peak_concurrency());
    assert_eq!(worker.executed().await.len(), 6);
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failures_are_isolated() {
    let codegen = SimulatedWorker::new(WorkerType::CodeGeneration).shared();
    codegen
        .set_response_for_task("broken", SimulatedResponse::error("compiler exploded"))
        .await;
    codegen
        .set_response_for_task("rejected", SimulatedResponse::failure("tests red"))
        .await;

    let registry = WorkerRegistry::new()
        .register_worker(codegen.clone())
        .register_worker(Arc::new(PanickingWorker));
    let scheduler = OrchestrationScheduler::new(SchedulerConfig::default(), &registry);

    let tasks = vec![
        Task::new("ok", "fine"),
        Task::new("broken", "errors"),
        Task::new("rejected", "fails"),
        Task::new("review", "panics").with_worker(WorkerType::Review),
    ];
    let mut plan = plan_for(&scheduler, tasks);

    let report = scheduler.execute_parallel(&mut plan).await.unwrap();

    assert_eq!(report.tasks.len(), 4);
    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.summary.failed, 3);
    assert!((report.summary.success_rate - 25.0).abs() < f64::EPSILON);

    let by_id = |id: &str| report.tasks.iter().find(|r| r.task_id == id).unwrap();
    assert!(by_id("broken").error.as_deref().unwrap().contains("compiler exploded"));
    assert_eq!(by_id("rejected").error.as_deref(), Some("tests red"));
    assert!(by_id("review").error.as_deref().unwrap().starts_with("Worker aborted"));

    assert_eq!(plan.task("ok").unwrap().status, TaskStatus::Completed);
    assert_eq!(plan.task("review").unwrap().status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_propagate_skip_cascades() {
    let worker = SimulatedWorker::new(WorkerType::CodeGeneration).shared();
    worker
        .set_response_for_task("schema", SimulatedResponse::failure("migration failed"))
        .await;
    let registry = WorkerRegistry::new().register_worker(worker.clone());
    let scheduler = OrchestrationScheduler::new(
        config(5, DependencyFailurePolicy::PropagateSkip),
        &registry,
    );

    let tasks = vec![
        Task::new("schema", "Schema"),
        Task::new("api", "API").with_dependency("schema"),
        Task::new("ui", "UI").with_dependency("api"),
        Task::new("docs", "Docs"),
    ];
    let mut plan = plan_for(&scheduler, tasks);

    let report = scheduler.execute_parallel(&mut plan).await.unwrap();

    let executed = worker.executed().await;
    assert!(executed.contains(&"schema".to_string()));
    assert!(executed.contains(&"docs".to_string()));
    assert!(!executed.contains(&"api".to_string()));
    assert!(!executed.contains(&"ui".to_string()));

    let ui = report.tasks.iter().find(|r| r.task_id == "ui").unwrap();
    assert_eq!(ui.status, TaskStatus::Failed);
    assert_eq!(ui.error.as_deref(), Some("Blocked by failed dependency api"));
    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.summary.failed, 3);
}

// ---------------------------------------------------------------------------
// Escalations and persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_escalations_collected_and_notified() {
    let worker = SimulatedWorker::new(WorkerType::CodeGeneration).shared();
    worker
        .set_response_for_task(
            "auth",
            SimulatedResponse::Outcome(WorkerOutcome::success(json!({})).with_metrics(
                WorkerMetrics {
                    quality_score: Some(85.0),
                    critical_issues: 1,
                    critical_security_issues: 1,
                    ..WorkerMetrics::default()
                },
            )),
        )
        .await;
    worker
        .set_response_for_task(
            "deploy",
            SimulatedResponse::Outcome(WorkerOutcome::escalated(Escalation::new(
                "Needs production credentials",
                EscalationTarget::DevOps,
                Severity::Medium,
                json!({ "env": "prod" }),
            ))),
        )
        .await;

    let notifier = Arc::new(RecordingNotifier::new());
    let registry = WorkerRegistry::new().register_worker(worker.clone());
    let scheduler = OrchestrationScheduler::new(SchedulerConfig::default(), &registry)
        .with_notifier(notifier.clone());

    let mut plan = plan_for(
        &scheduler,
        vec![Task::new("auth", "Auth"), Task::new("deploy", "Deploy")],
    );
    let report = scheduler.execute_parallel(&mut plan).await.unwrap();

    assert_eq!(report.summary.completed, 1);
    assert_eq!(report.summary.escalated, 1);
    assert_eq!(report.escalations.len(), 2);

    let ciso = report
        .escalations
        .iter()
        .find(|e| e.target == EscalationTarget::Ciso)
        .expect("security finding should go to the CISO");
    assert_eq!(ciso.severity, Severity::Critical);
    assert!(report.escalations.iter().any(|e| e.target == EscalationTarget::DevOps));

    assert_eq!(notifier.escalations().await.len(), 2);
    assert_eq!(plan.task("deploy").unwrap().status, TaskStatus::Escalated);
}

#[tokio::test]
async fn test_cyclic_plan_runs_and_reports_persist() {
    let worker = SimulatedWorker::new(WorkerType::CodeGeneration).shared();
    let store = Arc::new(InMemoryReportStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let registry = WorkerRegistry::new().register_worker(worker);
    let scheduler = OrchestrationScheduler::new(SchedulerConfig::default(), &registry)
        .with_report_store(store.clone())
        .with_notifier(notifier.clone());

    let tasks = vec![
        Task::new("x", "X").with_dependency("y"),
        Task::new("y", "Y").with_dependency("x"),
        Task::new("z", "Z"),
    ];
    let graph = DependencyGraphBuilder::new().build_graph(&tasks).unwrap();
    assert_eq!(graph.levels.first().unwrap(), &vec!["z".to_string()]);
    assert_eq!(graph.unresolved.len(), 2);
    assert_eq!(graph.levels.last().unwrap().len(), 2);

    let mut plan = scheduler.create_execution_plan(tasks, graph);
    let report = scheduler.execute_parallel(&mut plan).await.unwrap();
    assert_eq!(report.tasks.len(), 3, "cyclic tasks still run in the trailing level");

    let key = format!("execution-report-{}", report.session_id);
    let stored = store.get(&key).await.expect("report should be stored");
    assert_eq!(stored["summary"]["total"], 3);

    // End-to-end: a work item with a single heading yields one task.
    let item = WorkItem::new(9, "Tidy", "## Rename module");
    let report = scheduler.coordinate(&item).await.unwrap();
    assert_eq!(report.summary.total, 1);
    assert_eq!(store.len().await, 2);
    assert!(notifier.escalations().await.is_empty());
}
