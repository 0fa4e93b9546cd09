use async_latch::AsyncLatch;

use typedmap::TypedLabelMapView;

/// The context a runner hands to a task's executor when invoking it.
pub struct ExecutionContext {
    pub labels: TypedLabelMapView,
    pub cancellation: AsyncLatch,
}

/// The opaque handle a [`crate::TaskDescriptor`] carries. The task set and
/// resolver never call this -- only a runner, once it has a resolved set in
/// hand, does. Domain-specific task behavior (the concrete query/form/
/// feature implementations) is an external collaborator and lives entirely
/// behind this trait.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, ctx: &ExecutionContext) -> Result<(), String>;
}

/// Always succeeds without doing anything. Useful for tasks that exist only
/// to carry labels, and as a default in tests.
#[derive(Debug, Default)]
pub struct NoopExecutor;

impl TaskExecutor for NoopExecutor {
    fn execute(&self, _ctx: &ExecutionContext) -> Result<(), String> {
        Ok(())
    }
}
