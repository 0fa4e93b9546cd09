//! Task catalog and dependency resolver: the `TaskDescriptor`/`TaskSet` layer
//! that the inspection server and runner build on to turn a registered
//! universe of tasks into a resolved, topologically-ordered DAG.

pub mod labels;
mod task;
mod error;
mod executor;
mod set;

pub use error::Error;
pub use executor::{ExecutionContext, NoopExecutor, TaskExecutor};
pub use set::TaskSet;
pub use task::TaskDescriptor;
