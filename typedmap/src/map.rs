use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::key::TypedKey;

type StoredValue = Arc<dyn Any + Send + Sync>;

struct Inner {
    values: DashMap<Arc<str>, StoredValue>,
    // Per-key mutexes, populated lazily via DashMap's own entry-level locking.
    // Never grows unbounded in practice: bounded by the universe of label keys
    // ever touched, which is small and fixed at startup (see DESIGN NOTES).
    locks: DashMap<Arc<str>, Arc<Mutex<()>>>,
}

impl Inner {
    fn new() -> Inner {
        Inner {
            values: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: &Arc<str>) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// A thread-safe, heterogeneous string-keyed container with per-key-typed
/// retrieval. See the crate docs for the invariants this upholds.
#[derive(Clone)]
pub struct TypedLabelMap {
    inner: Arc<Inner>,
}

/// A read-only façade over a [`TypedLabelMap`]. Shares underlying storage
/// with the map it was created from -- it has no independent lifecycle, and
/// writes made through the original map are immediately visible here.
#[derive(Clone)]
pub struct TypedLabelMapView {
    inner: Arc<Inner>,
}

fn type_mismatch_panic<T>(id: &str) -> ! {
    panic!(
        "programmer error: type mismatch for label key {id:?}: expected {}, but the stored \
         value is not of that type. This indicates two TypedKeys with the same identifier \
         were used at different types -- a key-collision bug, not recoverable.",
        std::any::type_name::<T>(),
    );
}

impl TypedLabelMap {
    pub fn new() -> TypedLabelMap {
        TypedLabelMap {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Stores `value` under `key`, serialized against other writers of the
    /// same key identifier.
    pub fn set<T: Send + Sync + 'static>(&self, key: &TypedKey<T>, value: T) {
        let id = key.arc_id();
        let lock = self.inner.lock_for(&id);
        let _guard = lock.lock();
        self.inner.values.insert(id, Arc::new(value));
    }

    /// Lock-free read. Returns `None` if absent. Panics (fatal to the
    /// process) if a value is present under this identifier but was not
    /// stored at type `T`.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &TypedKey<T>) -> Option<T> {
        let entry = self.inner.values.get(key.id())?;
        match entry.value().downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => type_mismatch_panic::<T>(key.id()),
        }
    }

    pub fn get_or_default<T: Clone + Send + Sync + 'static>(
        &self,
        key: &TypedKey<T>,
        default: T,
    ) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Invokes `generator` exactly once per key, even under concurrent
    /// callers: the first caller to observe an absent value computes and
    /// stores it while holding this key's lock; every other concurrent
    /// caller blocks on that same lock and then observes the now-present
    /// value instead of recomputing it.
    ///
    /// `generator` MUST NOT call `get_or_compute` again for the same key
    /// identifier: the per-key lock is not reentrant and doing so deadlocks.
    pub fn get_or_compute<T, F>(&self, key: &TypedKey<T>, generator: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let id = key.arc_id();
        let lock = self.inner.lock_for(&id);
        let _guard = lock.lock();
        if let Some(existing) = self.get(key) {
            return existing;
        }
        let value = generator();
        self.inner.values.insert(id, Arc::new(value.clone()));
        value
    }

    pub fn delete<T>(&self, key: &TypedKey<T>) {
        let id = key.arc_id();
        let lock = self.inner.lock_for(&id);
        let _guard = lock.lock();
        self.inner.values.remove(id.as_ref());
    }

    /// Snapshot of the keys present at the time of the call; may be stale
    /// relative to concurrent mutations.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .values
            .iter()
            .map(|entry| entry.key().to_string())
            .collect()
    }

    /// A new, independent container holding the same values. The values
    /// themselves are not deep-copied (pointer semantics for reference
    /// types), only the mapping from key to value.
    pub fn clone_map(&self) -> TypedLabelMap {
        let cloned = Inner::new();
        for entry in self.inner.values.iter() {
            cloned.values.insert(entry.key().clone(), entry.value().clone());
        }
        TypedLabelMap {
            inner: Arc::new(cloned),
        }
    }

    pub fn as_readonly(&self) -> TypedLabelMapView {
        TypedLabelMapView {
            inner: self.inner.clone(),
        }
    }
}

impl Default for TypedLabelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypedLabelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedLabelMap")
            .field("keys", &self.keys())
            .finish()
    }
}

impl TypedLabelMapView {
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &TypedKey<T>) -> Option<T> {
        let entry = self.inner.values.get(key.id())?;
        match entry.value().downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => type_mismatch_panic::<T>(key.id()),
        }
    }

    pub fn get_or_default<T: Clone + Send + Sync + 'static>(
        &self,
        key: &TypedKey<T>,
        default: T,
    ) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner
            .values
            .iter()
            .map(|entry| entry.key().to_string())
            .collect()
    }

    pub fn clone_map(&self) -> TypedLabelMap {
        let cloned = Inner::new();
        for entry in self.inner.values.iter() {
            cloned.values.insert(entry.key().clone(), entry.value().clone());
        }
        TypedLabelMap {
            inner: Arc::new(cloned),
        }
    }
}

impl fmt::Debug for TypedLabelMapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedLabelMapView")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests;
