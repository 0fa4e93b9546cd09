use std::collections::HashMap;

use serde::Serialize;
use taskgraph::labels;
use taskgraph::{TaskDescriptor, TaskSet};

use crate::error::Error;
use crate::types::InspectionType;

/// Human-readable display metadata for a log type string. The log type
/// schema itself (what log types exist, their labels and colors) is an
/// external collaborator out of scope for this core; this trait is the seam
/// a caller plugs a real schema into.
pub trait LogTypeCatalog: Send + Sync {
    fn describe(&self, log_type: &str) -> LogTypeDescriptor;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogTypeDescriptor {
    pub label: String,
    pub color_code: String,
}

/// A fixed, in-memory [`LogTypeCatalog`]. Unknown log types fall back to
/// using the log type string itself as the label and an empty color code.
#[derive(Clone, Debug, Default)]
pub struct StaticLogTypeCatalog {
    entries: HashMap<String, LogTypeDescriptor>,
}

impl StaticLogTypeCatalog {
    pub fn new() -> StaticLogTypeCatalog {
        StaticLogTypeCatalog::default()
    }

    pub fn with(mut self, log_type: impl Into<String>, descriptor: LogTypeDescriptor) -> Self {
        self.entries.insert(log_type.into(), descriptor);
        self
    }
}

impl LogTypeCatalog for StaticLogTypeCatalog {
    fn describe(&self, log_type: &str) -> LogTypeDescriptor {
        self.entries.get(log_type).cloned().unwrap_or_else(|| LogTypeDescriptor {
            label: log_type.to_string(),
            color_code: String::new(),
        })
    }
}

/// One source that can contribute a generated timeline element, tagged with
/// the log type it is generated from.
#[derive(Clone, Debug)]
pub struct GeneratableSource {
    pub source_log_type: String,
}

/// A relationship type that can relate timelines generated from different log
/// types -- the external schema §4.7 calls `ParentRelationships`.
#[derive(Clone, Debug)]
pub struct ParentRelationship {
    pub id: String,
    pub color_code: String,
    pub long_name: String,
    pub label: String,
    pub description: String,
    pub generatable_events: Vec<GeneratableSource>,
    pub generatable_revisions: Vec<GeneratableSource>,
    pub generatable_alias_timeline_info: Vec<GeneratableSource>,
}

impl ParentRelationship {
    fn relates_to(&self, log_type: &str) -> bool {
        self.generatable_events.iter().any(|s| s.source_log_type == log_type)
            || self.generatable_revisions.iter().any(|s| s.source_log_type == log_type)
            || self
                .generatable_alias_timeline_info
                .iter()
                .any(|s| s.source_log_type == log_type)
    }
}

pub trait ParentRelationshipCatalog: Send + Sync {
    fn relationships(&self) -> &[ParentRelationship];
}

#[derive(Clone, Debug, Default)]
pub struct StaticParentRelationshipCatalog {
    relationships: Vec<ParentRelationship>,
}

impl StaticParentRelationshipCatalog {
    pub fn new(relationships: Vec<ParentRelationship>) -> StaticParentRelationshipCatalog {
        StaticParentRelationshipCatalog { relationships }
    }
}

impl ParentRelationshipCatalog for StaticParentRelationshipCatalog {
    fn relationships(&self) -> &[ParentRelationship] {
        &self.relationships
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FormElement {
    pub id: String,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TargetQueryElement {
    pub id: String,
    pub log_type_label: String,
    pub log_type_color_code: String,
    pub sample_query: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct IndirectQueryElement {
    pub id: String,
    pub log_type_label: String,
    pub log_type_color_code: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct OutputTimelineElement {
    pub relationship_id: String,
    pub relationship_color_code: String,
    pub long_name: String,
    pub label: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AvailableInspectionTypeElement {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeatureDocumentationEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub forms: Vec<FormElement>,
    pub target_query_dependency: TargetQueryElement,
    pub indirect_query_dependency: Vec<IndirectQueryElement>,
    pub output_timelines: Vec<OutputTimelineElement>,
    pub available_inspection_types: Vec<AvailableInspectionTypeElement>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeatureDocumentation {
    pub features: Vec<FeatureDocumentationEntry>,
    /// Non-fatal notes surfaced during projection, e.g. ambiguous target
    /// query selection (§9 open question). Never part of the external JSON
    /// contract in spec form; kept for callers that want to surface them.
    #[serde(skip)]
    pub diagnostics: Vec<String>,
}

const UNKNOWN_LOG_TYPE: &str = "unknown";

/// Walks the universe's feature tasks and produces the documentation
/// projection described in the external-interfaces section. Pure: never
/// mutates `universe` or any of its members.
pub fn project(
    universe: &TaskSet,
    inspection_types: &[InspectionType],
    log_types: &dyn LogTypeCatalog,
    relationships: &dyn ParentRelationshipCatalog,
) -> Result<FeatureDocumentation, Error> {
    let features = universe.subset(|t| t.labels().get(&labels::feature_flag()).unwrap_or(false));
    let mut diagnostics = Vec::new();
    let mut entries = Vec::with_capacity(features.len());

    for feature in features.get_all() {
        let target_log_type = feature
            .labels()
            .get(&labels::feature_target_log_type())
            .unwrap_or_else(|| UNKNOWN_LOG_TYPE.to_string());

        let resolved = TaskSet::new([feature.clone()])?.resolve(universe)?;
        let mut query_tasks: Vec<&TaskDescriptor> = resolved
            .get_all()
            .iter()
            .filter(|t| t.labels().get(&labels::task_is_query()).unwrap_or(false))
            .collect();
        query_tasks.sort_by(|a, b| a.id().cmp(b.id()));

        let mut target_query_dependency = TargetQueryElement::default();
        let mut target_query_found = false;
        let mut indirect_query_dependency = Vec::new();
        for query in query_tasks {
            let log_type = query
                .labels()
                .get(&labels::task_query_target_log_type())
                .unwrap_or_else(|| UNKNOWN_LOG_TYPE.to_string());
            if log_type == target_log_type {
                if target_query_found {
                    let message = format!(
                        "feature {:?} has multiple query tasks targeting log type {:?}; using {:?}",
                        feature.id(),
                        target_log_type,
                        target_query_dependency.id,
                    );
                    log::warn!("{message}");
                    diagnostics.push(message);
                    continue;
                }
                let descriptor = log_types.describe(&log_type);
                target_query_dependency = TargetQueryElement {
                    id: query.id().to_string(),
                    log_type_label: descriptor.label,
                    log_type_color_code: descriptor.color_code,
                    sample_query: query
                        .labels()
                        .get(&labels::task_query_sample_query())
                        .unwrap_or_default(),
                };
                target_query_found = true;
            } else {
                let descriptor = log_types.describe(&log_type);
                indirect_query_dependency.push(IndirectQueryElement {
                    id: query.id().to_string(),
                    log_type_label: descriptor.label,
                    log_type_color_code: descriptor.color_code,
                });
            }
        }

        let mut form_tasks: Vec<&TaskDescriptor> = resolved
            .get_all()
            .iter()
            .filter(|t| t.labels().get(&labels::task_is_form()).unwrap_or(false))
            .collect();
        form_tasks.sort_by(|a, b| a.id().cmp(b.id()));
        let forms = form_tasks
            .into_iter()
            .map(|form| FormElement {
                id: form.id().to_string(),
                label: form.labels().get(&labels::task_form_field_label()).unwrap_or_default(),
                description: form
                    .labels()
                    .get(&labels::task_form_field_description())
                    .unwrap_or_default(),
            })
            .collect();

        let output_timelines = relationships
            .relationships()
            .iter()
            .filter(|r| r.relates_to(&target_log_type))
            .map(|r| OutputTimelineElement {
                relationship_id: r.id.clone(),
                relationship_color_code: r.color_code.clone(),
                long_name: r.long_name.clone(),
                label: r.label.clone(),
                description: r.description.clone(),
            })
            .collect();

        let feature_inspection_types = feature.labels().get(&labels::inspection_types()).unwrap_or_default();
        let available_inspection_types = inspection_types
            .iter()
            .filter(|t| feature_inspection_types.contains(&t.id))
            .map(|t| AvailableInspectionTypeElement {
                id: t.id.clone(),
                name: t.name.clone(),
            })
            .collect();

        entries.push(FeatureDocumentationEntry {
            id: feature.id().to_string(),
            name: feature.labels().get(&labels::feature_title()).unwrap_or_default(),
            description: feature
                .labels()
                .get(&labels::feature_description())
                .unwrap_or_default(),
            forms,
            target_query_dependency,
            indirect_query_dependency,
            output_timelines,
            available_inspection_types,
        });
    }

    Ok(FeatureDocumentation { features: entries, diagnostics })
}
