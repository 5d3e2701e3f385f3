//! Orchestration scheduler for level-by-level parallel task execution.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    DependencyFailurePolicy, DependencyGraph, Escalation, ExecutionPlan, ExecutionReport,
    ExecutionSummary, OutcomeStatus, ProgressSnapshot, SchedulerConfig, Task, TaskResult,
    TaskStatus, WorkItem, WorkerType, total_duration,
};
use crate::domain::ports::{EscalationNotifier, ReportStore, SpecialistWorker};
use crate::services::decomposer::Decomposer;
use crate::services::dependency_graph::DependencyGraphBuilder;
use crate::services::escalation_policy;
use crate::services::worker_registry::{WorkerRegistry, WorkerSet};

/// Event emitted during execution.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum ExecutionEvent {
    /// Execution started.
    Started {
        /// Plan session
        session_id: Uuid,
        /// Tasks in the plan
        total_tasks: usize,
        /// Levels to run, including an unresolved one
        level_count: usize,
    },
    /// A level started.
    LevelStarted {
        /// Level index
        level: usize,
        /// Tasks in the level
        task_count: usize,
    },
    /// A task was dispatched to its worker.
    TaskStarted {
        /// Dispatched task
        task_id: String,
        /// Worker kind it went to
        worker_type: WorkerType,
    },
    /// A task settled, including tasks skipped for a failed dependency.
    TaskFinished {
        /// Settled result
        result: TaskResult,
    },
    /// Every task of a level settled.
    LevelCompleted {
        /// Level index
        level: usize,
        /// Progress across the whole plan
        progress: ProgressSnapshot,
    },
    /// Execution completed.
    Completed {
        /// Final report
        report: ExecutionReport,
    },
}

async fn emit(events: Option<&mpsc::Sender<ExecutionEvent>>, event: ExecutionEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

/// Schedules decomposed tasks onto specialist workers.
pub struct OrchestrationScheduler {
    config: SchedulerConfig,
    decomposer: Decomposer,
    graph_builder: DependencyGraphBuilder,
    workers: WorkerSet,
    report_store: Option<Arc<dyn ReportStore>>,
    notifier: Option<Arc<dyn EscalationNotifier>>,
}

impl OrchestrationScheduler {
    /// Build a scheduler, instantiating every registered worker once.
    pub fn new(config: SchedulerConfig, registry: &WorkerRegistry) -> Self {
        let graph_builder = DependencyGraphBuilder::from_config(&config);
        Self {
            decomposer: Decomposer::new(graph_builder.clone()),
            graph_builder,
            workers: registry.instantiate(),
            config,
            report_store: None,
            notifier: None,
        }
    }

    /// Persist execution reports to `store`.
    pub fn with_report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.report_store = Some(store);
        self
    }

    /// Deliver escalations through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn EscalationNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Decomposer used by `coordinate`.
    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// Create an execution plan for a task set and its graph.
    pub fn create_execution_plan(&self, tasks: Vec<Task>, graph: DependencyGraph) -> ExecutionPlan {
        let concurrency_limit = tasks.len().min(self.config.max_concurrency);
        let estimated_duration = total_duration(&tasks);

        let plan = ExecutionPlan {
            session_id: Uuid::new_v4(),
            concurrency_limit,
            tasks,
            graph,
            estimated_duration,
            start_time: Utc::now(),
        };

        info!(
            session_id = %plan.session_id,
            tasks = plan.tasks.len(),
            levels = plan.graph.levels.len(),
            concurrency = concurrency_limit,
            "execution plan created"
        );
        plan
    }

    /// Execute a plan level by level.
    ///
    /// Individual task failures are captured in the report and never abort
    /// the run.
    pub async fn execute_parallel(&self, plan: &mut ExecutionPlan) -> DomainResult<ExecutionReport> {
        self.run(plan, Vec::new(), None).await
    }

    /// Execute a plan, streaming events to `events`.
    pub async fn execute_with_events(
        &self,
        plan: &mut ExecutionPlan,
        events: mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<ExecutionReport> {
        self.run(plan, Vec::new(), Some(&events)).await
    }

    /// Decompose a work item and run the resulting plan end to end.
    ///
    /// A dependency cycle is escalated and the run proceeds; cyclic tasks run
    /// in the trailing unresolved level.
    #[instrument(skip(self, work_item), fields(work_item = work_item.number))]
    pub async fn coordinate(&self, work_item: &WorkItem) -> DomainResult<ExecutionReport> {
        self.coordinate_inner(work_item, None).await
    }

    /// [`coordinate`](Self::coordinate), streaming events to `events`.
    #[instrument(skip(self, work_item, events), fields(work_item = work_item.number))]
    pub async fn coordinate_with_events(
        &self,
        work_item: &WorkItem,
        events: mpsc::Sender<ExecutionEvent>,
    ) -> DomainResult<ExecutionReport> {
        self.coordinate_inner(work_item, Some(&events)).await
    }

    async fn coordinate_inner(
        &self,
        work_item: &WorkItem,
        events: Option<&mpsc::Sender<ExecutionEvent>>,
    ) -> DomainResult<ExecutionReport> {
        let decomposition = self.decomposer.decompose(work_item)?;

        let mut escalations = Vec::new();
        if let Some(cycle) = self.graph_builder.detect_cycles(&decomposition.graph) {
            warn!(cycle = ?cycle, "dependency cycle detected");
            let escalation = escalation_policy::for_cycle(&cycle);
            self.notify(&escalation).await;
            escalations.push(escalation);
        }

        for recommendation in &decomposition.recommendations {
            info!(%recommendation, "plan recommendation");
        }

        let mut plan = self.create_execution_plan(decomposition.tasks, decomposition.graph);
        self.run(&mut plan, escalations, events).await
    }

    #[instrument(skip_all, fields(session_id = %plan.session_id, tasks = plan.tasks.len()))]
    async fn run(
        &self,
        plan: &mut ExecutionPlan,
        mut escalations: Vec<Escalation>,
        events: Option<&mpsc::Sender<ExecutionEvent>>,
    ) -> DomainResult<ExecutionReport> {
        let started = Instant::now();
        let start_time = Utc::now();
        let total = plan.tasks.len();
        let levels = plan.graph.levels.clone();

        emit(
            events,
            ExecutionEvent::Started {
                session_id: plan.session_id,
                total_tasks: total,
                level_count: levels.len(),
            },
        )
        .await;

        let mut results: Vec<TaskResult> = Vec::with_capacity(total);
        let mut unsuccessful: HashSet<String> = HashSet::new();

        for (level_idx, level) in levels.iter().enumerate() {
            emit(
                events,
                ExecutionEvent::LevelStarted {
                    level: level_idx,
                    task_count: level.len(),
                },
            )
            .await;

            let mut level_results = Vec::with_capacity(level.len());
            let mut dispatch = Vec::with_capacity(level.len());

            for id in level {
                let Some(task) = plan.task(id).cloned() else {
                    continue;
                };
                if let Some(blocker) = self.failed_dependency(&plan.graph, id, &unsuccessful) {
                    debug!(task_id = %id, blocker = %blocker, "skipping task with failed dependency");
                    let result = TaskResult::failed(
                        id.clone(),
                        task.assigned_worker,
                        0,
                        format!("Blocked by failed dependency {blocker}"),
                    );
                    emit(events, ExecutionEvent::TaskFinished { result: result.clone() }).await;
                    level_results.push(result);
                    continue;
                }
                dispatch.push(task);
            }

            level_results.extend(self.execute_level(plan, dispatch, events).await?);
            level_results.sort_by_key(|r| level.iter().position(|id| *id == r.task_id));

            for result in level_results {
                plan.set_status(&result.task_id, result.status);
                if result.status != TaskStatus::Completed {
                    unsuccessful.insert(result.task_id.clone());
                }
                if let Some(task) = plan.task(&result.task_id) {
                    for escalation in Self::escalations_for(task, &result) {
                        self.notify(&escalation).await;
                        escalations.push(escalation);
                    }
                }
                results.push(result);
            }

            let progress = ProgressSnapshot::from_results(total, &results);
            log_progress(level_idx, &progress);
            emit(
                events,
                ExecutionEvent::LevelCompleted {
                    level: level_idx,
                    progress,
                },
            )
            .await;
        }

        let report = ExecutionReport {
            session_id: plan.session_id,
            start_time,
            end_time: Utc::now(),
            total_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            summary: ExecutionSummary::from_results(total, &results),
            tasks: results,
            escalations,
        };

        info!(
            completed = report.summary.completed,
            failed = report.summary.failed,
            escalated = report.summary.escalated,
            success_rate = report.summary.success_rate,
            duration_ms = report.total_duration_ms,
            "execution finished"
        );

        self.persist_report(&report).await;
        emit(events, ExecutionEvent::Completed { report: report.clone() }).await;

        Ok(report)
    }

    /// Run one level's tasks concurrently, bounded by the plan's limit.
    ///
    /// Returns once every spawned task settled.
    async fn execute_level(
        &self,
        plan: &mut ExecutionPlan,
        tasks: Vec<Task>,
        events: Option<&mpsc::Sender<ExecutionEvent>>,
    ) -> DomainResult<Vec<TaskResult>> {
        let semaphore = Arc::new(Semaphore::new(plan.concurrency_limit.max(1)));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| DomainError::WorkerFailed("Semaphore closed".to_string()))?;

            plan.set_status(&task.id, TaskStatus::Running);
            emit(
                events,
                ExecutionEvent::TaskStarted {
                    task_id: task.id.clone(),
                    worker_type: task.assigned_worker,
                },
            )
            .await;

            let task_id = task.id.clone();
            let worker_type = task.assigned_worker;
            let worker = self.workers.resolve(worker_type);
            let events = events.cloned();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = execute_single_task(worker, task).await;
                emit(events.as_ref(), ExecutionEvent::TaskFinished { result: result.clone() }).await;
                result
            });

            handles.push((task_id, worker_type, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (task_id, worker_type, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "worker task aborted");
                    let result =
                        TaskResult::failed(task_id, worker_type, 0, format!("Worker aborted: {e}"));
                    emit(events, ExecutionEvent::TaskFinished { result: result.clone() }).await;
                    result
                }
            };
            results.push(result);
        }

        Ok(results)
    }

    fn failed_dependency(
        &self,
        graph: &DependencyGraph,
        task_id: &str,
        unsuccessful: &HashSet<String>,
    ) -> Option<String> {
        match self.config.dependency_failure_policy {
            DependencyFailurePolicy::BestEffort => None,
            DependencyFailurePolicy::PropagateSkip => graph
                .dependencies_of(task_id)
                .into_iter()
                .find(|dep| unsuccessful.contains(*dep))
                .map(str::to_string),
        }
    }

    fn escalations_for(task: &Task, result: &TaskResult) -> Vec<Escalation> {
        let Some(outcome) = &result.outcome else {
            return Vec::new();
        };

        let mut escalations = Vec::new();
        if outcome.status == OutcomeStatus::Escalated {
            if let Some(escalation) = &outcome.escalation {
                escalations.push(escalation.clone());
            }
        }
        if let Some(metrics) = &outcome.metrics {
            escalations.extend(escalation_policy::for_quality(task, metrics));
        }
        escalations
    }

    async fn notify(&self, escalation: &Escalation) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.notify(escalation).await {
            warn!(target_role = %escalation.target, error = %e, "escalation delivery failed");
        }
    }

    async fn persist_report(&self, report: &ExecutionReport) {
        let Some(store) = &self.report_store else {
            return;
        };
        let key = format!("execution-report-{}", report.session_id);
        let stored = match serde_json::to_value(report) {
            Ok(value) => store.put(&key, &value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            warn!(key = %key, error = %e, "failed to persist execution report");
        }
    }
}

async fn execute_single_task(worker: Option<Arc<dyn SpecialistWorker>>, task: Task) -> TaskResult {
    let start = Instant::now();
    let elapsed_ms = || u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let Some(worker) = worker else {
        return TaskResult::failed(
            task.id,
            task.assigned_worker,
            0,
            format!("No worker registered for {}", task.assigned_worker),
        );
    };

    match worker.execute(&task).await {
        Ok(outcome) => TaskResult {
            task_id: task.id,
            status: outcome.task_status(),
            worker_type: worker.worker_type(),
            duration_ms: elapsed_ms(),
            error: outcome.error.clone(),
            outcome: Some(outcome),
        },
        Err(e) => {
            debug!(task_id = %task.id, error = %e, "worker returned an error");
            TaskResult::failed(task.id, worker.worker_type(), elapsed_ms(), e.to_string())
        }
    }
}

fn log_progress(level: usize, progress: &ProgressSnapshot) {
    info!(
        level,
        completed = progress.completed,
        failed = progress.failed,
        escalated = progress.escalated,
        waiting = progress.waiting,
        total = progress.total,
        percentage = progress.percentage,
        "progress"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::WorkerOutcome;
    use async_trait::async_trait;

    struct StaticWorker;

    #[async_trait]
    impl SpecialistWorker for StaticWorker {
        fn worker_type(&self) -> WorkerType {
            WorkerType::CodeGeneration
        }

        async fn execute(&self, task: &Task) -> DomainResult<WorkerOutcome> {
            if task.title.contains("boom") {
                return Err(DomainError::WorkerFailed("boom".to_string()));
            }
            Ok(WorkerOutcome::success(serde_json::json!({ "task": task.id })))
        }
    }

    fn scheduler(config: SchedulerConfig) -> OrchestrationScheduler {
        let registry = WorkerRegistry::new().register_worker(Arc::new(StaticWorker));
        OrchestrationScheduler::new(config, &registry)
    }

    fn plan_for(scheduler: &OrchestrationScheduler, tasks: Vec<Task>) -> ExecutionPlan {
        let graph = DependencyGraphBuilder::new().build_graph(&tasks).unwrap();
        scheduler.create_execution_plan(tasks, graph)
    }

    #[test]
    fn test_concurrency_limit_capped_by_task_count() {
        let s = scheduler(SchedulerConfig::default());
        let plan = plan_for(&s, vec![Task::new("a", "a"), Task::new("b", "b")]);
        assert_eq!(plan.concurrency_limit, 2);

        let tasks: Vec<Task> = (0..8).map(|i| Task::new(format!("t{i}"), "t").with_duration(5)).collect();
        let plan = plan_for(&s, tasks);
        assert_eq!(plan.concurrency_limit, 5);
        assert_eq!(plan.estimated_duration, 40);
    }

    #[test]
    fn test_estimated_duration_saturates() {
        let s = scheduler(SchedulerConfig::default());
        let tasks = vec![
            Task::new("a", "a").with_duration(u32::MAX),
            Task::new("b", "b").with_duration(u32::MAX),
        ];
        assert_eq!(plan_for(&s, tasks).estimated_duration, u32::MAX);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let s = scheduler(SchedulerConfig::default());
        let mut plan = plan_for(&s, Vec::new());

        let report = s.execute_parallel(&mut plan).await.unwrap();

        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_worker_error_captured_as_failed_result() {
        let s = scheduler(SchedulerConfig::default());
        let mut plan = plan_for(&s, vec![Task::new("a", "boom"), Task::new("b", "fine")]);

        let report = s.execute_parallel(&mut plan).await.unwrap();

        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(plan.task("a").unwrap().status, TaskStatus::Failed);
        assert_eq!(plan.task("b").unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_worker_fails_task() {
        let s = OrchestrationScheduler::new(SchedulerConfig::default(), &WorkerRegistry::new());
        let mut plan = plan_for(&s, vec![Task::new("a", "a")]);

        let report = s.execute_parallel(&mut plan).await.unwrap();

        assert_eq!(report.tasks[0].status, TaskStatus::Failed);
        assert!(report.tasks[0].error.as_deref().unwrap().contains("No worker registered"));
    }

    #[tokio::test]
    async fn test_propagate_skip_blocks_dependents() {
        let s = scheduler(SchedulerConfig {
            dependency_failure_policy: DependencyFailurePolicy::PropagateSkip,
            ..SchedulerConfig::default()
        });
        let mut plan = plan_for(
            &s,
            vec![
                Task::new("a", "boom"),
                Task::new("b", "fine").with_dependency("a"),
                Task::new("c", "fine").with_dependency("b"),
            ],
        );

        let report = s.execute_parallel(&mut plan).await.unwrap();

        assert_eq!(report.summary.failed, 3);
        assert!(report.tasks[1].error.as_deref().unwrap().contains("Blocked by failed dependency a"));
        assert!(report.tasks[2].error.as_deref().unwrap().contains("dependency b"));
    }

    #[tokio::test]
    async fn test_best_effort_runs_dependents() {
        let s = scheduler(SchedulerConfig::default());
        let mut plan = plan_for(
            &s,
            vec![Task::new("a", "boom"), Task::new("b", "fine").with_dependency("a")],
        );

        let report = s.execute_parallel(&mut plan).await.unwrap();

        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.tasks[1].task_id, "b");
        assert_eq!(report.tasks[1].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_events_stream_in_order() {
        let s = scheduler(SchedulerConfig::default());
        let mut plan = plan_for(
            &s,
            vec![Task::new("a", "a"), Task::new("b", "b").with_dependency("a")],
        );
        let (tx, mut rx) = mpsc::channel(64);

        s.execute_with_events(&mut plan, tx).await.unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(match event {
                ExecutionEvent::Started { .. } => "started",
                ExecutionEvent::LevelStarted { .. } => "level_started",
                ExecutionEvent::TaskStarted { .. } => "task_started",
                ExecutionEvent::TaskFinished { .. } => "task_finished",
                ExecutionEvent::LevelCompleted { .. } => "level_completed",
                ExecutionEvent::Completed { .. } => "completed",
            });
        }
        assert_eq!(
            kinds,
            vec![
                "started",
                "level_started",
                "task_started",
                "task_finished",
                "level_completed",
                "level_started",
                "task_started",
                "task_finished",
                "level_completed",
                "completed",
            ]
        );
    }
}
