//! Status: read-only snapshot of a namespace for operators.

use serde::Serialize;

use crate::domain::Namespace;
use crate::error::Result;
use crate::ports::QueueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub name: String,
    pub pending: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NamespaceStatus {
    pub namespace: String,
    /// Every queue ever enqueued to, sorted by name.
    pub queues: Vec<QueueDepth>,
    /// Newest error-log entries, oldest first.
    pub recent_errors: Vec<String>,
}

impl NamespaceStatus {
    /// Read the queue set, each queue's length and the last `errors` entries
    /// of the error log.
    ///
    /// The reads are independent, so a busy namespace may change between
    /// them.
    pub async fn collect(
        store: &dyn QueueStore,
        namespace: &Namespace,
        errors: usize,
    ) -> Result<Self> {
        let mut queues = Vec::new();
        for name in store.set_members(&namespace.queues_key()).await? {
            let pending = store.list_len(&namespace.queue_key(&name)).await?;
            queues.push(QueueDepth { name, pending });
        }

        let recent_errors = if errors == 0 {
            Vec::new()
        } else {
            store
                .list_tail(&namespace.errors_key(), errors)
                .await?
                .into_iter()
                .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                .collect()
        };

        Ok(Self {
            namespace: namespace.to_string(),
            queues,
            recent_errors,
        })
    }

    pub fn total_pending(&self) -> usize {
        self.queues.iter().map(|q| q.pending).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::producer::Producer;
    use crate::domain::Task;
    use crate::impls::InMemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_queue_depths_and_recent_errors() {
        let store = Arc::new(InMemoryStore::new());
        let ns = Namespace::new("ns");
        let producer = Producer::new(store.clone(), ns.clone());
        producer.add_task(&Task::new("f", "b", vec![])).await.unwrap();
        producer.add_task(&Task::new("f", "a", vec![])).await.unwrap();
        producer.add_task(&Task::new("f", "a", vec![])).await.unwrap();
        for entry in ["one", "two", "three"] {
            store
                .push_back("ns:errors", entry.as_bytes().to_vec())
                .await
                .unwrap();
        }

        let status = NamespaceStatus::collect(store.as_ref(), &ns, 2).await.unwrap();

        assert_eq!(
            status.queues,
            vec![
                QueueDepth { name: "a".into(), pending: 2 },
                QueueDepth { name: "b".into(), pending: 1 },
            ]
        );
        assert_eq!(status.total_pending(), 3);
        assert_eq!(status.recent_errors, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn drained_queue_is_still_listed() {
        let store = Arc::new(InMemoryStore::new());
        let ns = Namespace::new("ns");
        Producer::new(store.clone(), ns.clone())
            .add_task(&Task::new("f", "q", vec![]))
            .await
            .unwrap();
        store.pop_front("ns:queue:q").await.unwrap();

        let status = NamespaceStatus::collect(store.as_ref(), &ns, 0).await.unwrap();
        assert_eq!(status.queues, vec![QueueDepth { name: "q".into(), pending: 0 }]);
        assert!(status.recent_errors.is_empty());
    }
}
