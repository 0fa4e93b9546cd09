use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use taskgraph::{TaskDescriptor, TaskSet};

use crate::config::IoConfig;
use crate::doc::{self, FeatureDocumentation, LogTypeCatalog, ParentRelationshipCatalog};
use crate::error::Error;
use crate::idgen::{IdGenerator, PrefixIdGenerator, UuidIdGenerator};
use crate::runner::{InspectionRunner, RunnerContext};
use crate::types::{InspectionType, InspectionTypeRegistry};

/// Owns the universe task set, the inspection-type registry, the live set
/// of runners, and an id source. Populated once in a startup phase; callers
/// that want a hard stop on further registration can call [`freeze`], after
/// which `add_task`/`add_inspection_type` return [`Error::ServerFrozen`].
#[derive(Clone)]
pub struct InspectionServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    root_task_set: Mutex<TaskSet>,
    inspection_types: Mutex<InspectionTypeRegistry>,
    inspections: Mutex<HashMap<String, InspectionRunner>>,
    id_generator: Arc<dyn IdGenerator>,
    io_config: Arc<IoConfig>,
    frozen: AtomicBool,
}

impl InspectionServer {
    pub fn new(io_config: IoConfig) -> InspectionServer {
        InspectionServer::with_id_generator(
            Arc::new(PrefixIdGenerator::new("inspection-", UuidIdGenerator)),
            io_config,
        )
    }

    pub fn with_id_generator(id_generator: Arc<dyn IdGenerator>, io_config: IoConfig) -> InspectionServer {
        InspectionServer {
            inner: Arc::new(ServerInner {
                root_task_set: Mutex::new(TaskSet::default()),
                inspection_types: Mutex::new(InspectionTypeRegistry::new()),
                inspections: Mutex::new(HashMap::new()),
                id_generator,
                io_config: Arc::new(io_config),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    pub fn io_config(&self) -> &IoConfig {
        &self.inner.io_config
    }

    /// Rejects any further `add_task`/`add_inspection_type` calls. Optional
    /// per the ownership rules; without it, callers are responsible for
    /// serializing registration against concurrent use externally.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::Acquire)
    }

    pub fn add_task(&self, task: TaskDescriptor) -> Result<(), Error> {
        if self.is_frozen() {
            return Err(Error::ServerFrozen);
        }
        self.inner.root_task_set.lock().add(task)?;
        Ok(())
    }

    pub fn add_inspection_type(&self, inspection_type: InspectionType) -> Result<(), Error> {
        if self.is_frozen() {
            return Err(Error::ServerFrozen);
        }
        self.inner.inspection_types.lock().add(inspection_type)
    }

    pub fn get_all_inspection_types(&self) -> Vec<InspectionType> {
        self.inner.inspection_types.lock().get_all()
    }

    pub fn get_inspection_type(&self, id: &str) -> Option<InspectionType> {
        self.inner.inspection_types.lock().get(id)
    }

    /// Defensive copy of every task registered with the server.
    pub fn get_all_registered_tasks(&self) -> Vec<TaskDescriptor> {
        self.inner.root_task_set.lock().get_all().to_vec()
    }

    /// Mints a new runner id, binds it to `inspection_type_id`, and tracks
    /// it in the live runner set.
    pub fn create_inspection(&self, inspection_type_id: &str) -> Result<String, Error> {
        let inspection_types = self.inner.inspection_types.lock();
        if inspection_types.get(inspection_type_id).is_none() {
            return Err(Error::UnknownInspectionType(inspection_type_id.to_string()));
        }
        let context = Arc::new(RunnerContext::new(
            self.inner.root_task_set.lock().clone(),
            inspection_types.clone(),
        ));
        drop(inspection_types);

        let id = self.inner.id_generator.generate();
        let runner = InspectionRunner::new(id.clone(), context);
        runner.set_inspection_type(inspection_type_id)?;
        self.inner.inspections.lock().insert(id.clone(), runner);
        Ok(id)
    }

    pub fn get_inspection(&self, id: &str) -> Option<InspectionRunner> {
        self.inner.inspections.lock().get(id).cloned()
    }

    /// Defensive copy of the live runner set.
    pub fn get_all_runners(&self) -> Vec<InspectionRunner> {
        self.inner.inspections.lock().values().cloned().collect()
    }

    /// Walks the universe's feature tasks and produces the documentation
    /// projection described in the external interfaces. See [`doc::project`].
    pub fn feature_documentation(
        &self,
        log_types: &dyn LogTypeCatalog,
        relationships: &dyn ParentRelationshipCatalog,
    ) -> Result<FeatureDocumentation, Error> {
        let universe = self.inner.root_task_set.lock().clone();
        let inspection_types = self.get_all_inspection_types();
        doc::project(&universe, &inspection_types, log_types, relationships)
    }
}

#[cfg(test)]
mod tests;
