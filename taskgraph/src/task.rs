use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use typedmap::{TypedLabelMap, TypedLabelMapView};

use crate::executor::TaskExecutor;

/// An immutable, uniquely-identified unit of work: a label bag, a set of
/// dependency ids, and an opaque executor handle.
///
/// Cheap to clone: internally an `Arc`, matching the "conceptually immutable
/// after construction" ownership rule.
#[derive(Clone)]
pub struct TaskDescriptor {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    labels: TypedLabelMap,
    dependencies: HashSet<String>,
    executor: Arc<dyn TaskExecutor>,
}

impl TaskDescriptor {
    pub fn new(
        id: impl Into<String>,
        labels: TypedLabelMap,
        dependencies: impl IntoIterator<Item = String>,
        executor: Arc<dyn TaskExecutor>,
    ) -> TaskDescriptor {
        TaskDescriptor {
            inner: Arc::new(Inner {
                id: id.into(),
                labels,
                dependencies: dependencies.into_iter().collect(),
                executor,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn labels(&self) -> TypedLabelMapView {
        self.inner.labels.as_readonly()
    }

    pub fn dependencies(&self) -> &HashSet<String> {
        &self.inner.dependencies
    }

    pub fn executor(&self) -> &Arc<dyn TaskExecutor> {
        &self.inner.executor
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.inner.id)
            .field("dependencies", &self.inner.dependencies)
            .finish()
    }
}
