use std::sync::Arc;

use crate::app::contain::invoke_contained;
use crate::app::registry::TaskRegistry;
use crate::app::reporter::ErrorReporter;
use crate::domain::{Outcome, Task};

/// Runtime executes one `Task` by dispatching to its registered handler and
/// routing any failure to the error log.
pub struct Runtime {
    registry: Arc<TaskRegistry>,
    reporter: Arc<ErrorReporter>,
}

impl Runtime {
    pub fn new(registry: Arc<TaskRegistry>, reporter: Arc<ErrorReporter>) -> Self {
        Self { registry, reporter }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Execute one task. Never fails: whatever the handler does, the outcome
    /// is logged and, when it is not a success, reported to the error log.
    pub async fn execute(&self, task: Task) -> Outcome {
        let outcome = match self.registry.get(&task.func_name) {
            Some(handler) => {
                let outcome = invoke_contained(handler.handle(task.args)).await;
                match &outcome {
                    Outcome::Success => tracing::debug!(func = %task.func_name, "task succeeded"),
                    Outcome::Failure(reason) => {
                        tracing::warn!(func = %task.func_name, reason = %reason, "task failed")
                    }
                    Outcome::Panicked(reason) => {
                        tracing::error!(func = %task.func_name, reason = %reason, "task panicked")
                    }
                }
                outcome
            }
            None => {
                let message = format!("No registered {} function", task.func_name);
                tracing::error!(func = %task.func_name, queue = %task.queue_name, "{message}");
                Outcome::Failure(message)
            }
        };

        if let Some(message) = outcome.error_message()
            && let Err(err) = self.reporter.log_error(message).await
        {
            tracing::error!(error = %err, "failed to record task error");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportRetryPolicy;
    use crate::domain::{HandlerError, Namespace};
    use crate::impls::InMemoryStore;
    use crate::ports::SystemClock;
    use serde_json::json;
    use std::time::Duration;

    fn runtime(store: &Arc<InMemoryStore>, registry: TaskRegistry) -> Runtime {
        let reporter = ErrorReporter::new(
            store.clone(),
            Namespace::new("ns"),
            Arc::new(SystemClock),
            ReportRetryPolicy::bounded(Duration::ZERO, 1),
        );
        Runtime::new(Arc::new(registry), Arc::new(reporter))
    }

    async fn error_log(store: &InMemoryStore) -> Vec<String> {
        store
            .list("ns:errors")
            .await
            .into_iter()
            .map(|raw| String::from_utf8(raw).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn success_leaves_no_error_entry() {
        let store = Arc::new(InMemoryStore::new());
        let mut reg = TaskRegistry::new();
        reg.register_fn("ok", |_args| async { Ok(()) });

        let outcome = runtime(&store, reg)
            .execute(Task::new("ok", "q", vec![]))
            .await;

        assert!(outcome.is_success());
        assert!(error_log(&store).await.is_empty());
    }

    #[tokio::test]
    async fn missing_handler_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let outcome = runtime(&store, TaskRegistry::new())
            .execute(Task::new("g", "q", vec![json!(3)]))
            .await;

        assert_eq!(outcome, Outcome::Failure("No registered g function".into()));
        let log = error_log(&store).await;
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("] No registered g function"));
    }

    /// Collects formatted log lines written while it is installed.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[tokio::test]
    async fn missing_handler_is_logged_once() {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(InMemoryStore::new());
        runtime(&store, TaskRegistry::new())
            .execute(Task::new("g", "q", vec![]))
            .await;

        let lines = capture.lines();
        assert_eq!(lines.len(), 1, "{lines:#?}");
        assert!(lines[0].contains("No registered g function"));
    }

    #[tokio::test]
    async fn handler_failure_message_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        let mut reg = TaskRegistry::new();
        reg.register_fn("bad", |args| async move {
            Err(HandlerError::new(format!("rejected {}", args.len())))
        });

        runtime(&store, reg)
            .execute(Task::new("bad", "q", vec![json!(1), json!(2)]))
            .await;

        let log = error_log(&store).await;
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("] rejected 2"));
    }

    #[tokio::test]
    async fn handler_panic_is_contained_and_reported() {
        let store = Arc::new(InMemoryStore::new());
        let mut reg = TaskRegistry::new();
        reg.register_fn("explode", |_args| async {
            if true {
                panic!("kaboom");
            }
            Ok(())
        });
        let rt = runtime(&store, reg);

        let outcome = rt.execute(Task::new("explode", "q", vec![])).await;
        assert_eq!(outcome, Outcome::Panicked("kaboom".into()));

        // the runtime is still usable afterwards
        let outcome = rt.execute(Task::new("explode", "q", vec![])).await;
        assert!(!outcome.is_success());
        assert_eq!(error_log(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn unreported_failure_does_not_propagate() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_connections(1);

        let outcome = runtime(&store, TaskRegistry::new())
            .execute(Task::new("g", "q", vec![]))
            .await;

        assert!(!outcome.is_success());
        assert!(error_log(&store).await.is_empty());
    }
}
