//! App layer: combines the ports into the dispatch pipeline.
//!
//! # Components
//! - **Dispatcher**: facade that owns the registry and runs everything below
//! - **Producer**: enqueues tasks
//! - **Poller**: drains queues into the dispatch channel
//! - **WorkerPool** / **Runtime**: execute tasks against the registry
//! - **ErrorReporter**: appends failures to the error log
//! - **NamespaceStatus**: operator snapshot of queues and errors

pub mod contain;
pub mod dispatcher;
pub mod poller;
pub mod producer;
pub mod registry;
pub mod reporter;
pub mod runtime;
pub mod status;
pub mod worker_pool;

pub use self::contain::invoke_contained;
pub use self::dispatcher::{Dispatcher, DispatcherHandle};
pub use self::poller::Poller;
pub use self::producer::Producer;
pub use self::registry::{FnHandler, TaskHandler, TaskRegistry};
pub use self::reporter::ErrorReporter;
pub use self::runtime::Runtime;
pub use self::status::{NamespaceStatus, QueueDepth};
pub use self::worker_pool::WorkerPool;
