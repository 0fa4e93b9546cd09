use std::fmt;

use taskgraph::Error as TaskGraphError;

/// The inspection server/runner's slice of the error taxonomy. `TaskSet`'s
/// own errors (`duplicate-id`, `missing-dependency`, `cycle`) are
/// re-exported through [`Error::TaskGraph`] rather than duplicated here.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    TaskGraph(TaskGraphError),
    UnknownInspectionType(String),
    InvalidFeatureSelection(String),
    TaskExecutorFailed { task_id: String, cause: String },
    Cancelled,
    InspectionTypeIdContainsSlash(String),
    /// A transition was attempted from a state that does not allow it
    /// (e.g. `resolve()` before `select_features()`).
    InvalidTransition { attempted: &'static str, state: &'static str },
    /// `add_task`/`add_inspection_type` called after `freeze()`.
    ServerFrozen,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TaskGraph(inner) => write!(f, "{inner}"),
            Error::UnknownInspectionType(id) => write!(f, "unknown inspection type: {id:?}"),
            Error::InvalidFeatureSelection(id) => {
                write!(f, "invalid feature selection: {id:?} is not a selectable feature task")
            }
            Error::TaskExecutorFailed { task_id, cause } => {
                write!(f, "task {task_id:?} failed: {cause}")
            }
            Error::Cancelled => write!(f, "run was cancelled"),
            Error::InspectionTypeIdContainsSlash(id) => {
                write!(f, "inspection type id {id:?} must not contain '/'")
            }
            Error::InvalidTransition { attempted, state } => {
                write!(f, "cannot {attempted} while runner is in state {state}")
            }
            Error::ServerFrozen => write!(f, "server is frozen; no further registration allowed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TaskGraphError> for Error {
    fn from(inner: TaskGraphError) -> Error {
        Error::TaskGraph(inner)
    }
}
