//! Inspection server and runner lifecycle: the layer that turns a registered
//! universe of [`taskgraph::TaskDescriptor`]s into runnable inspection
//! sessions, plus the feature-documentation projection over that universe.

mod config;
mod doc;
mod error;
mod idgen;
mod runner;
mod server;
mod types;

pub use config::IoConfig;
pub use doc::{
    AvailableInspectionTypeElement, FeatureDocumentation, FeatureDocumentationEntry,
    FormElement, GeneratableSource, IndirectQueryElement, LogTypeCatalog, LogTypeDescriptor,
    OutputTimelineElement, ParentRelationship, ParentRelationshipCatalog,
    StaticLogTypeCatalog, StaticParentRelationshipCatalog, TargetQueryElement,
};
pub use error::Error;
pub use idgen::{IdGenerator, PrefixIdGenerator, UuidIdGenerator};
pub use runner::{DryRunResult, FeatureListItem, InspectionRunner, ResultStoreHandle, RunResult};
pub use server::InspectionServer;
pub use types::{InspectionType, InspectionTypeRecord, InspectionTypeRegistry};
