use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taskgraph::{labels, ExecutionContext, TaskDescriptor, TaskExecutor, TaskSet};
use typedmap::TypedLabelMap;

use super::*;
use crate::types::{InspectionType, InspectionTypeRegistry};

struct CountingExecutor(Arc<AtomicUsize>);

impl TaskExecutor for CountingExecutor {
    fn execute(&self, _ctx: &ExecutionContext) -> Result<(), String> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingExecutor;

impl TaskExecutor for FailingExecutor {
    fn execute(&self, _ctx: &ExecutionContext) -> Result<(), String> {
        Err("boom".to_string())
    }
}

fn feature(id: &str, deps: &[&str], inspection_type: &str) -> TaskDescriptor {
    let map = TypedLabelMap::new();
    map.set(&labels::feature_flag(), true);
    map.set(&labels::inspection_types(), vec![inspection_type.to_string()]);
    TaskDescriptor::new(id, map, deps.iter().map(|d| d.to_string()), Arc::new(taskgraph::NoopExecutor))
}

fn counting_task(id: &str, counter: Arc<AtomicUsize>) -> TaskDescriptor {
    TaskDescriptor::new(id, TypedLabelMap::new(), [], Arc::new(CountingExecutor(counter)))
}

fn failing_task(id: &str) -> TaskDescriptor {
    TaskDescriptor::new(id, TypedLabelMap::new(), [], Arc::new(FailingExecutor))
}

fn context_with(universe: TaskSet) -> Arc<RunnerContext> {
    let mut registry = InspectionTypeRegistry::new();
    registry.add(InspectionType::new("k8s", "Kubernetes", "", "", 10, "").unwrap()).unwrap();
    Arc::new(RunnerContext::new(universe, registry))
}

#[test]
fn set_inspection_type_rejects_unknown_id() {
    let context = context_with(TaskSet::default());
    let runner = InspectionRunner::new("r1".to_string(), context);
    let err = runner.set_inspection_type("ghost").unwrap_err();
    assert_eq!(err, Error::UnknownInspectionType("ghost".to_string()));
}

#[test]
fn out_of_order_transitions_are_rejected() {
    let context = context_with(TaskSet::default());
    let runner = InspectionRunner::new("r1".to_string(), context);
    let err = runner.resolve().unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition { attempted: "resolve", state: "created" }
    ));
}

#[test]
fn select_features_rejects_non_feature_task() {
    let universe = TaskSet::new([TaskDescriptor::new(
        "plain",
        TypedLabelMap::new(),
        [],
        Arc::new(taskgraph::NoopExecutor),
    )])
    .unwrap();
    let context = context_with(universe);
    let runner = InspectionRunner::new("r1".to_string(), context);
    runner.set_inspection_type("k8s").unwrap();

    let err = runner.select_features(&["plain".to_string()]).unwrap_err();
    assert_eq!(err, Error::InvalidFeatureSelection("plain".to_string()));
}

#[tokio::test]
async fn s1_empty_run_completes_immediately() {
    let context = context_with(TaskSet::default());
    let runner = InspectionRunner::new("r1".to_string(), context);
    runner.set_inspection_type("k8s").unwrap();
    runner.select_features(&[]).unwrap();
    runner.resolve().unwrap();

    let executor = task_executor::Executor::new();
    let result = runner.run(&executor).await.unwrap();
    assert_eq!(result.metadata, serde_json::json!([]));
    assert_eq!(runner.state_name(), "complete");
}

#[tokio::test]
async fn run_executes_dependency_before_dependent_exactly_once() {
    let counter_b = Arc::new(AtomicUsize::new(0));
    let universe = TaskSet::new([
        feature("A", &["B"], "k8s"),
        counting_task("B", counter_b.clone()),
    ])
    .unwrap();
    let context = context_with(universe);
    let runner = InspectionRunner::new("r1".to_string(), context);
    runner.set_inspection_type("k8s").unwrap();
    runner.select_features(&["A".to_string()]).unwrap();
    runner.resolve().unwrap();

    let executor = task_executor::Executor::new();
    runner.run(&executor).await.unwrap();
    assert_eq!(counter_b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_reports_task_executor_failure() {
    let universe = TaskSet::new([feature("A", &["B"], "k8s"), failing_task("B")]).unwrap();
    let context = context_with(universe);
    let runner = InspectionRunner::new("r1".to_string(), context);
    runner.set_inspection_type("k8s").unwrap();
    runner.select_features(&["A".to_string()]).unwrap();
    runner.resolve().unwrap();

    let executor = task_executor::Executor::new();
    let err = runner.run(&executor).await.unwrap_err();
    assert_eq!(
        err,
        Error::TaskExecutorFailed { task_id: "B".to_string(), cause: "boom".to_string() }
    );
    assert_eq!(runner.state_name(), "failed");
}

#[tokio::test]
async fn cancelling_before_run_reports_cancelled() {
    let counter = Arc::new(AtomicUsize::new(0));
    let universe = TaskSet::new([counting_task("B", counter.clone())]).unwrap();
    let context = context_with(universe);
    let runner = InspectionRunner::new("r1".to_string(), context);
    runner.set_inspection_type("k8s").unwrap();
    runner.select_features(&[]).unwrap();
    runner.resolve().unwrap();
    runner.cancel();

    // The resolved set is empty (no features selected), so cancellation has
    // nothing to preempt; run still reports cancelled because it was
    // requested before any task observed completion.
    let executor = task_executor::Executor::new();
    let err = runner.run(&executor).await.unwrap_err();
    assert_eq!(err, Error::Cancelled);
}
