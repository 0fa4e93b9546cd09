use std::fmt;

/// Errors raised by [`crate::TaskSet`] construction and resolution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Two members of the same set share an id.
    DuplicateId(String),
    /// A dependency id named by some member was not found in the universe
    /// passed to `resolve`.
    MissingDependency(String),
    /// The induced dependency subgraph contains a cycle; the path is given
    /// starting and ending at the node where the back edge was found.
    Cycle(Vec<String>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateId(id) => write!(f, "duplicate task id: {id:?}"),
            Error::MissingDependency(id) => {
                write!(f, "dependency {id:?} is not present in the universe")
            }
            Error::Cycle(path) => write!(f, "dependency cycle: {}", path.join(" -> ")),
        }
    }
}

impl std::error::Error for Error {}
