use serde::Serialize;

use crate::error::Error;

/// A named category of investigation that gates which feature tasks a user
/// may enable. The registry that holds these (on [`crate::server::InspectionServer`])
/// maintains descending-priority order.
#[derive(Clone, Debug, PartialEq)]
pub struct InspectionType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub priority: i64,
    pub document_description: String,
}

impl InspectionType {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        priority: i64,
        document_description: impl Into<String>,
    ) -> Result<InspectionType, Error> {
        let id = id.into();
        if id.contains('/') {
            return Err(Error::InspectionTypeIdContainsSlash(id));
        }
        Ok(InspectionType {
            id,
            name: name.into(),
            description: description.into(),
            icon: icon.into(),
            priority,
            document_description: document_description.into(),
        })
    }

    pub fn to_record(&self) -> InspectionTypeRecord {
        InspectionTypeRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// The JSON-serialized external view of an [`InspectionType`]: `priority` and
/// `document_description` are internal-only and never leave the process.
#[derive(Clone, Debug, Serialize)]
pub struct InspectionTypeRecord {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Ordered catalog of registered inspection types, kept sorted by descending
/// priority.
#[derive(Clone, Debug, Default)]
pub struct InspectionTypeRegistry {
    entries: Vec<InspectionType>,
}

impl InspectionTypeRegistry {
    pub fn new() -> InspectionTypeRegistry {
        InspectionTypeRegistry::default()
    }

    pub fn add(&mut self, inspection_type: InspectionType) -> Result<(), Error> {
        if self.entries.iter().any(|e| e.id == inspection_type.id) {
            return Err(Error::TaskGraph(taskgraph::Error::DuplicateId(
                inspection_type.id,
            )));
        }
        self.entries.push(inspection_type);
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    /// Defensive copy: callers cannot mutate the registry through the
    /// returned vec.
    pub fn get_all(&self) -> Vec<InspectionType> {
        self.entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<InspectionType> {
        self.entries.iter().find(|e| e.id == id).cloned()
    }
}
