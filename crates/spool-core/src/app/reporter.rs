//! ErrorReporter: appends task failures to the namespace's error log.

use std::sync::Arc;

use crate::config::ReportRetryPolicy;
use crate::domain::Namespace;
use crate::error::{Result, SpoolError};
use crate::ports::{Clock, QueueStore};

/// Unix `date` layout, e.g. `Tue Mar  5 07:04:09 UTC 2024`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

pub struct ErrorReporter {
    store: Arc<dyn QueueStore>,
    namespace: Namespace,
    clock: Arc<dyn Clock>,
    policy: ReportRetryPolicy,
}

impl ErrorReporter {
    pub fn new(
        store: Arc<dyn QueueStore>,
        namespace: Namespace,
        clock: Arc<dyn Clock>,
        policy: ReportRetryPolicy,
    ) -> Self {
        Self {
            store,
            namespace,
            clock,
            policy,
        }
    }

    /// Append `[<UTC timestamp>] <message>` to `{ns}:errors`.
    ///
    /// Store failures are retried after `policy.backoff` until the append
    /// lands or `policy.max_attempts` is used up. With the default unbounded
    /// policy this does not return while the store is down, which stalls the
    /// calling worker for as long as the outage lasts.
    pub async fn log_error(&self, message: &str) -> Result<()> {
        let key = self.namespace.errors_key();
        let mut attempts = 0u32;
        loop {
            let entry = self.format_entry(message);
            let err = match self.store.push_back(&key, entry.into_bytes()).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            attempts += 1;
            if !self.policy.allows_retry(attempts) {
                tracing::error!(
                    error = %err,
                    attempts,
                    entry = message,
                    "giving up on error report"
                );
                return Err(SpoolError::ReportAbandoned {
                    attempts,
                    source: err,
                });
            }
            tracing::warn!(
                error = %err,
                attempts,
                retry_in_ms = self.policy.backoff.as_millis() as u64,
                "error report failed, retrying"
            );
            tokio::time::sleep(self.policy.backoff).await;
        }
    }

    fn format_entry(&self, message: &str) -> String {
        format!("[{}] {}", self.clock.now().format(TIMESTAMP_FORMAT), message)
    }
}
