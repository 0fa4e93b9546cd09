use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_latch::AsyncLatch;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use taskgraph::{labels, ExecutionContext, TaskSet};
use tokio::sync::watch;

use crate::error::Error;
use crate::types::InspectionTypeRegistry;

/// Read-only lookup surface a runner is given at construction: the universe
/// task set and inspection-type registry, both owned by the server. A runner
/// never mutates either -- per the ownership rule, it only ever reads
/// through this handle.
pub struct RunnerContext {
    universe: TaskSet,
    inspection_types: InspectionTypeRegistry,
}

impl RunnerContext {
    pub fn new(universe: TaskSet, inspection_types: InspectionTypeRegistry) -> RunnerContext {
        RunnerContext { universe, inspection_types }
    }

    pub fn universe(&self) -> &TaskSet {
        &self.universe
    }

    pub fn inspection_types(&self) -> &InspectionTypeRegistry {
        &self.inspection_types
    }
}

enum RunnerState {
    Created,
    TypeSelected { inspection_type_id: String },
    FeaturesSelected { inspection_type_id: String, selected_features: Vec<String> },
    Resolved { inspection_type_id: String, selected_features: Vec<String>, resolved: TaskSet },
    Running { resolved: TaskSet },
    Complete { metadata: Value },
    Failed { error: Error },
}

impl RunnerState {
    fn name(&self) -> &'static str {
        match self {
            RunnerState::Created => "created",
            RunnerState::TypeSelected { .. } => "type-selected",
            RunnerState::FeaturesSelected { .. } => "features-selected",
            RunnerState::Resolved { .. } => "resolved",
            RunnerState::Running { .. } => "running",
            RunnerState::Complete { .. } => "complete",
            RunnerState::Failed { .. } => "failed",
        }
    }
}

/// Per-runner JSON-serialized view of a feature task, offered once an
/// inspection type has been selected.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureListItem {
    pub id: String,
    pub label: String,
    pub description: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DryRunResult {
    pub metadata: Value,
}

/// Stand-in for the out-of-scope result store: the core only needs a handle
/// it can hang off a completed run, not what that handle does.
pub type ResultStoreHandle = ();

/// Deliberately not `Serialize`: the spec marks this internal-only.
pub struct RunResult {
    pub metadata: Value,
    pub result_store: ResultStoreHandle,
}

/// A session: one inspection type, a chosen feature subset, and the
/// dry-run/run lifecycle over the resulting resolved DAG. See the crate
/// docs for the state machine diagram.
#[derive(Clone)]
pub struct InspectionRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    id: String,
    context: Arc<RunnerContext>,
    state: Mutex<RunnerState>,
    cancellation: AsyncLatch,
}

impl InspectionRunner {
    pub(crate) fn new(id: String, context: Arc<RunnerContext>) -> InspectionRunner {
        InspectionRunner {
            inner: Arc::new(RunnerInner {
                id,
                context,
                state: Mutex::new(RunnerState::Created),
                cancellation: AsyncLatch::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn state_name(&self) -> &'static str {
        self.inner.state.lock().name()
    }

    /// Signals cancellation to a run in progress. A noop if no run is
    /// in-flight or one has already completed.
    pub fn cancel(&self) {
        self.inner.cancellation.trigger();
    }

    pub fn set_inspection_type(&self, inspection_type_id: &str) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        match &*state {
            RunnerState::Created => {
                if self.inner.context.inspection_types().get(inspection_type_id).is_none() {
                    return Err(Error::UnknownInspectionType(inspection_type_id.to_string()));
                }
                *state = RunnerState::TypeSelected {
                    inspection_type_id: inspection_type_id.to_string(),
                };
                Ok(())
            }
            other => Err(Error::InvalidTransition {
                attempted: "set_inspection_type",
                state: other.name(),
            }),
        }
    }

    pub fn select_features(&self, ids: &[String]) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        let inspection_type_id = match &*state {
            RunnerState::TypeSelected { inspection_type_id } => inspection_type_id.clone(),
            other => {
                return Err(Error::InvalidTransition {
                    attempted: "select_features",
                    state: other.name(),
                })
            }
        };

        for id in ids {
            let task = self
                .inner
                .context
                .universe()
                .get(id)
                .ok_or_else(|| Error::InvalidFeatureSelection(id.clone()))?;
            let is_feature = task.labels().get(&labels::feature_flag()).unwrap_or(false);
            let applies_to_type = task
                .labels()
                .get(&labels::inspection_types())
                .unwrap_or_default()
                .iter()
                .any(|t| t == &inspection_type_id);
            if !is_feature || !applies_to_type {
                return Err(Error::InvalidFeatureSelection(id.clone()));
            }
        }

        *state = RunnerState::FeaturesSelected {
            inspection_type_id,
            selected_features: ids.to_vec(),
        };
        Ok(())
    }

    pub fn resolve(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        let (inspection_type_id, selected_features) = match &*state {
            RunnerState::FeaturesSelected { inspection_type_id, selected_features } => {
                (inspection_type_id.clone(), selected_features.clone())
            }
            other => return Err(Error::InvalidTransition { attempted: "resolve", state: other.name() }),
        };

        let mut seeds = TaskSet::default();
        for id in &selected_features {
            let task = self
                .inner
                .context
                .universe()
                .get(id)
                .ok_or_else(|| Error::InvalidFeatureSelection(id.clone()))?;
            seeds.add(task.clone())?;
        }
        let resolved = seeds.resolve(self.inner.context.universe())?;

        *state = RunnerState::Resolved { inspection_type_id, selected_features, resolved };
        Ok(())
    }

    pub fn feature_list(&self) -> Result<Vec<FeatureListItem>, Error> {
        let state = self.inner.state.lock();
        let (inspection_type_id, selected): (String, HashSet<&str>) = match &*state {
            RunnerState::TypeSelected { inspection_type_id } => (inspection_type_id.clone(), HashSet::new()),
            RunnerState::FeaturesSelected { inspection_type_id, selected_features }
            | RunnerState::Resolved { inspection_type_id, selected_features, .. } => (
                inspection_type_id.clone(),
                selected_features.iter().map(|s| s.as_str()).collect(),
            ),
            other => return Err(Error::InvalidTransition { attempted: "feature_list", state: other.name() }),
        };
        drop(state);

        let mut items: Vec<FeatureListItem> = self
            .inner
            .context
            .universe()
            .get_all()
            .iter()
            .filter(|t| t.labels().get(&labels::feature_flag()).unwrap_or(false))
            .filter(|t| {
                t.labels()
                    .get(&labels::inspection_types())
                    .unwrap_or_default()
                    .iter()
                    .any(|id| id == &inspection_type_id)
            })
            .map(|t| FeatureListItem {
                id: t.id().to_string(),
                label: t.labels().get(&labels::feature_title()).unwrap_or_default(),
                description: t.labels().get(&labels::feature_description()).unwrap_or_default(),
                enabled: selected.contains(t.id()),
            })
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Gathers declared metadata from the form-task subset of the resolved
    /// set, without executing query or feature tasks. Leaves the runner in
    /// `resolved` (dry-run does not advance the state machine).
    pub fn dry_run(&self) -> Result<DryRunResult, Error> {
        let resolved = {
            let state = self.inner.state.lock();
            match &*state {
                RunnerState::Resolved { resolved, .. } => resolved.clone(),
                other => return Err(Error::InvalidTransition { attempted: "dry_run", state: other.name() }),
            }
        };

        let forms = resolved.subset(|t| t.labels().get(&labels::task_is_form()).unwrap_or(false));
        let metadata: Vec<Value> = forms
            .get_all()
            .iter()
            .map(|form| {
                serde_json::json!({
                    "id": form.id(),
                    "label": form.labels().get(&labels::task_form_field_label()).unwrap_or_default(),
                    "description": form.labels().get(&labels::task_form_field_description()).unwrap_or_default(),
                })
            })
            .collect();
        Ok(DryRunResult { metadata: Value::Array(metadata) })
    }

    /// Executes the full resolved set in dependency order: a task begins
    /// only once every direct dependency has completed successfully, and
    /// independent tasks run concurrently on `executor`. Cancellation
    /// (`cancel()`) propagates to every still-running task; the run fails
    /// with `Error::Cancelled` if no task itself failed first.
    pub async fn run(&self, executor: &task_executor::Executor) -> Result<RunResult, Error> {
        let resolved = {
            let mut state = self.inner.state.lock();
            match &*state {
                RunnerState::Resolved { resolved, .. } => {
                    let resolved = resolved.clone();
                    *state = RunnerState::Running { resolved: resolved.clone() };
                    resolved
                }
                other => return Err(Error::InvalidTransition { attempted: "run", state: other.name() }),
            }
        };

        let outcome = execute_resolved(executor, &resolved, self.inner.cancellation.clone()).await;

        let mut state = self.inner.state.lock();
        match outcome {
            Ok(metadata) => {
                *state = RunnerState::Complete { metadata: metadata.clone() };
                Ok(RunResult { metadata, result_store: () })
            }
            Err(error) => {
                *state = RunnerState::Failed { error: error.clone() };
                Err(error)
            }
        }
    }
}

async fn execute_resolved(
    executor: &task_executor::Executor,
    resolved: &TaskSet,
    cancellation: AsyncLatch,
) -> Result<Value, Error> {
    let mut senders = HashMap::new();
    let mut receivers = HashMap::new();
    for task in resolved.get_all() {
        let (tx, rx) = watch::channel::<Option<bool>>(None);
        senders.insert(task.id().to_string(), tx);
        receivers.insert(task.id().to_string(), rx);
    }

    let mut handles = Vec::with_capacity(resolved.len());
    for task in resolved.get_all() {
        let tx = senders[task.id()].clone();
        let dep_rxs: Vec<_> = task
            .dependencies()
            .iter()
            .filter_map(|dep| receivers.get(dep).cloned())
            .collect();
        let cancellation = cancellation.clone();
        let task = task.clone();

        handles.push(executor.spawn(async move {
            let mut upstream_failed = false;
            for mut rx in dep_rxs {
                loop {
                    if let Some(ok) = *rx.borrow() {
                        if !ok {
                            upstream_failed = true;
                        }
                        break;
                    }
                    if rx.changed().await.is_err() {
                        upstream_failed = true;
                        break;
                    }
                }
                if upstream_failed {
                    break;
                }
            }

            if upstream_failed || cancellation.poll_triggered() {
                let _ = tx.send(Some(false));
                return None;
            }

            let ctx = ExecutionContext { labels: task.labels(), cancellation: cancellation.clone() };
            match task.executor().execute(&ctx) {
                Ok(()) => {
                    let _ = tx.send(Some(true));
                    None
                }
                Err(cause) => {
                    // The first failure cancels every sibling/downstream task.
                    cancellation.trigger();
                    let _ = tx.send(Some(false));
                    Some((task.id().to_string(), cause))
                }
            }
        }));
    }

    let mut first_failure = None;
    for (task, handle) in resolved.get_all().iter().zip(handles) {
        match handle.await {
            Ok(Some((task_id, cause))) if first_failure.is_none() => {
                first_failure = Some((task_id, cause));
            }
            Ok(_) => {}
            Err(join_error) if first_failure.is_none() => {
                first_failure = Some((task.id().to_string(), join_error.to_string()));
            }
            Err(_) => {}
        }
    }

    if let Some((task_id, cause)) = first_failure {
        return Err(Error::TaskExecutorFailed { task_id, cause });
    }
    if cancellation.poll_triggered() {
        return Err(Error::Cancelled);
    }
    Ok(Value::Array(Vec::new()))
}

#[cfg(test)]
mod tests;
