//! spool-core
//!
//! A Redis-backed background task queue: producers push JSON-encoded tasks
//! onto named lists, a dispatcher polls them and runs registered handlers on
//! a bounded pool of workers, and failures land in a timestamped error log.
//!
//! # Modules
//! - **domain**: Task, Namespace (key layout), Outcome / HandlerError
//! - **ports**: QueueStore and Clock abstractions
//! - **impls**: RedisStore (bb8 pool) and InMemoryStore (tests, demos)
//! - **app**: Dispatcher, Producer, Poller, WorkerPool, ErrorReporter
//! - **config**: DispatchOptions and environment loading
//! - **error**: StoreError / SpoolError

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{Dispatcher, DispatcherHandle, NamespaceStatus, Producer, TaskHandler, TaskRegistry};
pub use config::{DispatchOptions, PollOptions, ReportRetryPolicy, StoreOptions};
pub use domain::{HandlerError, Namespace, Outcome, Task};
pub use error::{Result, SpoolError, StoreError};
pub use impls::{InMemoryStore, RedisStore};
pub use ports::{Clock, QueueStore};
