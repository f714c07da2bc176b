//! Poller: drains the configured queues into the dispatch channel.
//!
//! # Flow (one pass)
//! 1. For each queue, in configuration order, pop the head of `{ns}:queue:{name}`.
//! 2. Empty queue or rejected command: move on to the next queue at once.
//! 3. Store unreachable: wait `connect_backoff`, then restart from the first queue.
//! 4. Payload: decode (undecodable payloads are dropped) and send it to the
//!    workers, waiting for room in the channel.
//! 5. A pass that popped nothing ends with `idle_interval` (zero = just yield).
//!
//! A popped task is never pushed back. Ordering across queues carries no
//! fairness guarantee: a queue that always has work is drained one task per
//! pass, the same as every other queue, but a long backlog on one queue still
//! delays the rest by the time it takes to dispatch each of its tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::PollOptions;
use crate::domain::{Namespace, Task};
use crate::ports::QueueStore;

pub struct Poller {
    store: Arc<dyn QueueStore>,
    namespace: Namespace,
    queues: Vec<String>,
    options: PollOptions,
}

impl Poller {
    pub fn new(
        store: Arc<dyn QueueStore>,
        namespace: Namespace,
        queues: Vec<String>,
        options: PollOptions,
    ) -> Self {
        Self {
            store,
            namespace,
            queues,
            options,
        }
    }

    /// Poll until `shutdown` flips to `true` (or its sender goes away) or
    /// every receiver of `tasks` is gone. Dropping `tasks` on return is what
    /// tells the workers to stop.
    pub async fn run(self, tasks: mpsc::Sender<Task>, mut shutdown: watch::Receiver<bool>) {
        let keys: Vec<(&str, String)> = self
            .queues
            .iter()
            .map(|queue| (queue.as_str(), self.namespace.queue_key(queue)))
            .collect();
        tracing::info!(namespace = %self.namespace, queues = ?self.queues, "poller started");

        'pass: loop {
            let mut popped = false;

            for (queue, key) in &keys {
                if *shutdown.borrow() {
                    break 'pass;
                }

                let payload = match self.store.pop_front(key).await {
                    Ok(Some(payload)) => payload,
                    Ok(None) => continue,
                    Err(err) if err.is_connection() => {
                        tracing::warn!(
                            error = %err,
                            retry_in_ms = self.options.connect_backoff.as_millis() as u64,
                            "store unreachable, backing off"
                        );
                        if !pause(&mut shutdown, self.options.connect_backoff).await {
                            break 'pass;
                        }
                        continue 'pass;
                    }
                    Err(err) => {
                        tracing::error!(queue, error = %err, "pop failed");
                        continue;
                    }
                };
                popped = true;

                let task = match Task::decode(&payload) {
                    Ok(task) => task,
                    Err(err) => {
                        tracing::error!(
                            queue,
                            error = %err,
                            payload = %String::from_utf8_lossy(&payload),
                            "discarding undecodable payload"
                        );
                        continue;
                    }
                };

                tracing::debug!(queue, func = %task.func_name, "task popped");
                // Waits for a worker to make room; this is the backpressure
                // that keeps the poller from outrunning the pool.
                if tasks.send(task).await.is_err() {
                    tracing::warn!("dispatch channel closed");
                    break 'pass;
                }
            }

            if !popped {
                if self.options.idle_interval.is_zero() {
                    tokio::task::yield_now().await;
                } else if !pause(&mut shutdown, self.options.idle_interval).await {
                    break;
                }
            }
        }

        tracing::info!(namespace = %self.namespace, "poller stopped");
    }
}

/// Sleep for `duration`; `false` if shutdown was requested first.
async fn pause(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.wait_for(|stop| *stop) => false,
    }
}
