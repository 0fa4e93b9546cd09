// Copyright 2020 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A thin, cloneable wrapper around a `tokio` runtime handle, plus a small
//! collection type for tracking "tail" tasks that a session wants to await
//! before it considers itself finished without blocking individual work items
//! on them.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A cloneable handle to a tokio runtime, used to spawn work from contexts
/// (sync or async) that don't otherwise have access to one.
#[derive(Clone)]
pub struct Executor {
    handle: tokio::runtime::Handle,
}

impl Executor {
    /// Creates an `Executor` wrapping the handle of the currently running tokio
    /// runtime. Panics if called outside of a tokio runtime context.
    pub fn new() -> Executor {
        Executor {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Wraps an explicit runtime handle.
    pub fn new_with_handle(handle: tokio::runtime::Handle) -> Executor {
        Executor { handle }
    }

    /// Spawns a future onto this executor's runtime, returning a `JoinHandle`
    /// that can be awaited for its result.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Spawns a future whose result the caller does not intend to await,
    /// logging a warning if it panics or is cancelled.
    pub fn native_spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(async move {
            let result = future.await;
            result
        })
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Tasks to await at the "tail" of a session: asynchronous work that should
/// not block individual tasks in a run's dependency graph, but which the
/// owning session wants to have finished before it is torn down (e.g.
/// flushing a result store).
#[derive(Clone)]
pub struct TailTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl TailTasks {
    pub fn new() -> TailTasks {
        TailTasks {
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Registers a spawned task to be awaited by a later call to `wait`.
    pub fn push(&self, handle: JoinHandle<()>) {
        self.handles.lock().push(handle);
    }

    /// Awaits all tasks registered so far. Tasks that panicked are logged and
    /// otherwise ignored: a tail task's failure should not fail the session
    /// that spawned it.
    pub async fn wait(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for result in join_all(handles).await {
            if let Err(e) = result {
                log::warn!("A tail task failed to join: {e}");
            }
        }
    }
}

impl Default for TailTasks {
    fn default() -> Self {
        Self::new()
    }
}
