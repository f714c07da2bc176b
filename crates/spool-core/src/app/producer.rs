use std::sync::Arc;

use crate::domain::{Namespace, Task};
use crate::error::Result;
use crate::ports::QueueStore;

/// Enqueues tasks. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct Producer {
    store: Arc<dyn QueueStore>,
    namespace: Namespace,
}

impl Producer {
    pub fn new(store: Arc<dyn QueueStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Push `task` onto its queue and record the queue name in the namespace's
    /// queue set.
    ///
    /// No retry: any failure is returned to the caller. The push and the set
    /// update are not atomic together; if the second step fails the task is
    /// still queued and will be drained, only the discovery set misses it.
    #[tracing::instrument(
        skip(self, task),
        fields(namespace = %self.namespace, func = %task.func_name, queue = %task.queue_name)
    )]
    pub async fn add_task(&self, task: &Task) -> Result<()> {
        let payload = task.encode().inspect_err(|e| {
            tracing::error!(error = %e, "failed to encode task");
        })?;

        self.store
            .push_back(&self.namespace.queue_key(&task.queue_name), payload)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to push task"))?;

        self.store
            .add_to_set(&self.namespace.queues_key(), &task.queue_name)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to register queue name"))?;

        tracing::debug!("task enqueued");
        Ok(())
    }
}
