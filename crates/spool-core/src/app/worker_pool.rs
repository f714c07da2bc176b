use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::app::runtime::Runtime;
use crate::domain::Task;

/// Fixed set of workers sharing one dispatch channel.
/// - At most `n` handlers run at once, one per worker.
/// - Workers exit once the channel is closed and drained; `join()` waits for that.
pub struct WorkerPool {
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, tasks: mpsc::Receiver<Task>, runtime: Arc<Runtime>) -> Self {
        let tasks = Arc::new(Mutex::new(tasks));

        let joins = (0..n)
            .map(|worker_id| {
                let tasks = Arc::clone(&tasks);
                let rt = Arc::clone(&runtime);
                tokio::spawn(worker_loop(worker_id, tasks, rt))
            })
            .collect();

        Self { joins }
    }

    pub fn size(&self) -> usize {
        self.joins.len()
    }

    /// Wait for every worker to finish. In-flight handlers are not cancelled.
    pub async fn join(self) {
        for join in self.joins {
            if let Err(err) = join.await {
                tracing::error!(error = %err, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    tasks: Arc<Mutex<mpsc::Receiver<Task>>>,
    runtime: Arc<Runtime>,
) {
    tracing::debug!(worker_id, "worker started");
    loop {
        // The lock is only held while waiting for the next task, never while
        // a handler runs.
        let next = tasks.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        let span = tracing::info_span!(
            "task",
            worker_id,
            func = %task.func_name,
            queue = %task.queue_name
        );
        runtime.execute(task).instrument(span).await;
    }
    tracing::debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::TaskRegistry;
    use crate::app::reporter::ErrorReporter;
    use crate::config::ReportRetryPolicy;
    use crate::domain::Namespace;
    use crate::impls::InMemoryStore;
    use crate::ports::SystemClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn runtime(registry: TaskRegistry) -> Arc<Runtime> {
        let reporter = ErrorReporter::new(
            Arc::new(InMemoryStore::new()),
            Namespace::new("ns"),
            Arc::new(SystemClock),
            ReportRetryPolicy::default(),
        );
        Arc::new(Runtime::new(Arc::new(registry), Arc::new(reporter)))
    }

    #[tokio::test]
    async fn workers_drain_channel_then_exit() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut reg = TaskRegistry::new();
        let counter = Arc::clone(&done);
        reg.register_fn("count", move |_args| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let (tx, rx) = mpsc::channel(1);
        let pool = WorkerPool::spawn(3, rx, runtime(reg));
        assert_eq!(pool.size(), 3);

        for _ in 0..10 {
            tx.send(Task::new("count", "q", vec![])).await.unwrap();
        }
        drop(tx);
        pool.join().await;

        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_capped_by_pool_size() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut reg = TaskRegistry::new();
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        reg.register_fn("slow", move |_args| {
            let (running, peak) = (Arc::clone(&r), Arc::clone(&p));
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let (tx, rx) = mpsc::channel(1);
        let pool = WorkerPool::spawn(2, rx, runtime(reg));
        for _ in 0..12 {
            tx.send(Task::new("slow", "q", vec![])).await.unwrap();
        }
        drop(tx);
        pool.join().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }
}
