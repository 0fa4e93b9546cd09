use std::sync::Arc;

use taskgraph::{labels, NoopExecutor, TaskDescriptor};
use typedmap::TypedLabelMap;

use super::*;
use crate::doc::{StaticLogTypeCatalog, StaticParentRelationshipCatalog};

fn server() -> InspectionServer {
    InspectionServer::new(IoConfig::default())
}

fn feature_task(id: &str, inspection_type: &str) -> TaskDescriptor {
    let map = TypedLabelMap::new();
    map.set(&labels::feature_flag(), true);
    map.set(&labels::inspection_types(), vec![inspection_type.to_string()]);
    TaskDescriptor::new(id, map, [], Arc::new(NoopExecutor))
}

fn inspection_type(id: &str) -> InspectionType {
    InspectionType::new(id, id, "", "", 0, "").unwrap()
}

#[test]
fn add_task_rejects_duplicate_id() {
    let server = server();
    server.add_task(feature_task("A", "k8s")).unwrap();
    let err = server.add_task(feature_task("A", "k8s")).unwrap_err();
    assert_eq!(err, Error::TaskGraph(taskgraph::Error::DuplicateId("A".to_string())));
}

#[test]
fn get_all_registered_tasks_is_a_defensive_copy() {
    let server = server();
    server.add_task(feature_task("A", "k8s")).unwrap();

    let mut tasks = server.get_all_registered_tasks();
    assert_eq!(tasks.len(), 1);
    tasks.push(feature_task("B", "k8s"));

    assert_eq!(server.get_all_registered_tasks().len(), 1);
}

#[test]
fn freeze_rejects_further_registration() {
    let server = server();
    server.add_inspection_type(inspection_type("k8s")).unwrap();
    server.freeze();

    assert!(server.is_frozen());
    assert_eq!(server.add_task(feature_task("A", "k8s")).unwrap_err(), Error::ServerFrozen);
    assert_eq!(
        server.add_inspection_type(inspection_type("aws")).unwrap_err(),
        Error::ServerFrozen
    );
}

#[test]
fn create_inspection_rejects_unknown_type() {
    let server = server();
    let err = server.create_inspection("ghost").unwrap_err();
    assert_eq!(err, Error::UnknownInspectionType("ghost".to_string()));
}

#[test]
fn create_inspection_round_trip() {
    let server = server();
    server.add_inspection_type(inspection_type("k8s")).unwrap();
    server.add_task(feature_task("A", "k8s")).unwrap();

    let id = server.create_inspection("k8s").unwrap();
    let runner = server.get_inspection(&id).unwrap();
    assert_eq!(runner.id(), id);
    assert_eq!(runner.state_name(), "type-selected");
}

#[test]
fn get_all_runners_reflects_every_created_inspection() {
    let server = server();
    server.add_inspection_type(inspection_type("k8s")).unwrap();

    server.create_inspection("k8s").unwrap();
    server.create_inspection("k8s").unwrap();

    assert_eq!(server.get_all_runners().len(), 2);
}

#[test]
fn runners_created_before_a_task_is_added_do_not_see_it() {
    // A runner snapshots the universe at creation time (`RunnerContext`), so
    // registering more tasks after `create_inspection` has no effect on an
    // already-running inspection.
    let server = server();
    server.add_inspection_type(inspection_type("k8s")).unwrap();
    let id = server.create_inspection("k8s").unwrap();
    server.add_task(feature_task("A", "k8s")).unwrap();

    let runner = server.get_inspection(&id).unwrap();
    assert!(runner.select_features(&["A".to_string()]).is_err());
}

#[test]
fn feature_documentation_delegates_to_doc_projection() {
    let server = server();
    server.add_inspection_type(inspection_type("k8s")).unwrap();
    server.add_task(feature_task("A", "k8s")).unwrap();

    let log_types = StaticLogTypeCatalog::new();
    let relationships = StaticParentRelationshipCatalog::new(Vec::new());
    let documentation = server.feature_documentation(&log_types, &relationships).unwrap();

    assert_eq!(documentation.features.len(), 1);
    assert_eq!(documentation.features[0].id, "A");
    assert_eq!(documentation.features[0].available_inspection_types.len(), 1);
    assert_eq!(documentation.features[0].available_inspection_types[0].id, "k8s");
}
