//! Dispatcher: wires the store, registry, poller and worker pool together.
//!
//! # Usage
//! ```ignore
//! let mut dispatcher = Dispatcher::connect(DispatchOptions::from_env()?).await?;
//! dispatcher.register_fn("send_mail", |args| async move { /* ... */ Ok(()) });
//! dispatcher.worker().await;
//! ```
//!
//! Registration happens before the dispatcher runs; `worker`, `run_until` and
//! `spawn` consume it, so the handler set is frozen from then on.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::app::poller::Poller;
use crate::app::producer::Producer;
use crate::app::registry::{TaskHandler, TaskRegistry};
use crate::app::reporter::ErrorReporter;
use crate::app::runtime::Runtime;
use crate::app::status::NamespaceStatus;
use crate::app::worker_pool::WorkerPool;
use crate::config::DispatchOptions;
use crate::domain::{HandlerError, Namespace, Task};
use crate::error::Result;
use crate::impls::RedisStore;
use crate::ports::{Clock, QueueStore, SystemClock};

pub struct Dispatcher {
    options: DispatchOptions,
    store: Arc<dyn QueueStore>,
    namespace: Namespace,
    registry: TaskRegistry,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    /// Fails fast on invalid options; nothing touches the store yet.
    pub fn new(options: DispatchOptions, store: Arc<dyn QueueStore>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            namespace: Namespace::new(options.namespace.clone()),
            options,
            store,
            registry: TaskRegistry::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Build a Redis connection pool from `options.store` and a dispatcher on
    /// top of it.
    pub async fn connect(options: DispatchOptions) -> Result<Self> {
        options.validate()?;
        let store = RedisStore::connect(&options.store).await?;
        Self::new(options, Arc::new(store))
    }

    /// Replace the clock used to timestamp error-log entries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Bind `handler` to `name`; the last registration for a name wins.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.registry.register(name, handler);
    }

    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        self.registry.register_fn(name, f);
    }

    /// A producer sharing this dispatcher's store and namespace.
    pub fn producer(&self) -> Producer {
        Producer::new(Arc::clone(&self.store), self.namespace.clone())
    }

    pub async fn add_task(&self, task: &Task) -> Result<()> {
        self.producer().add_task(task).await
    }

    /// Append an entry to the error log, retrying per `options.report_retry`.
    pub async fn log_error(&self, message: &str) -> Result<()> {
        self.reporter().log_error(message).await
    }

    pub async fn status(&self, errors: usize) -> Result<NamespaceStatus> {
        NamespaceStatus::collect(self.store.as_ref(), &self.namespace, errors).await
    }

    /// Run until Ctrl-C, then stop polling and wait for in-flight handlers.
    pub async fn worker(self) {
        self.run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("interrupt received, shutting down"),
                Err(err) => {
                    tracing::error!(error = %err, "cannot listen for ctrl-c, running until killed");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Run until `shutdown` completes, then stop polling and wait for
    /// in-flight handlers.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let run = self.run(stop_rx);
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => return,
            _ = shutdown => {}
        }
        let _ = stop_tx.send(true);
        run.await;
    }

    /// Run on a background task.
    pub fn spawn(self) -> DispatcherHandle {
        let producer = self.producer();
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(stop_rx));
        DispatcherHandle {
            stop_tx,
            join,
            producer,
        }
    }

    fn reporter(&self) -> ErrorReporter {
        ErrorReporter::new(
            Arc::clone(&self.store),
            self.namespace.clone(),
            Arc::clone(&self.clock),
            self.options.report_retry.clone(),
        )
    }

    async fn run(self, shutdown: watch::Receiver<bool>) {
        tracing::info!(
            namespace = %self.namespace,
            queues = ?self.options.queues,
            concurrency = self.options.concurrency,
            handlers = ?self.registry.names(),
            "dispatcher starting"
        );

        let reporter = Arc::new(self.reporter());
        let Self {
            options,
            store,
            namespace,
            registry,
            ..
        } = self;

        let runtime = Arc::new(Runtime::new(Arc::new(registry), reporter));
        // Capacity 1: the poller holds at most one decoded task that no
        // worker has taken yet.
        let (tx, rx) = mpsc::channel(1);
        let pool = WorkerPool::spawn(options.concurrency, rx, runtime);

        Poller::new(store, namespace.clone(), options.queues, options.poll)
            .run(tx, shutdown)
            .await;
        pool.join().await;

        tracing::info!(namespace = %namespace, "dispatcher stopped");
    }
}

/// Handle to a dispatcher running on a background task.
pub struct DispatcherHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    producer: Producer,
}

impl DispatcherHandle {
    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// Ask the poller to stop. Returns immediately.
    pub fn request_shutdown(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop polling, then wait until every in-flight handler has returned.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "dispatcher task ended abnormally");
        }
    }
}
