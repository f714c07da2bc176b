//! Domain model: tasks, store key layout and invocation outcomes.

pub mod namespace;
pub mod outcome;
pub mod task;

pub use namespace::Namespace;
pub use outcome::{HandlerError, Outcome};
pub use task::Task;
