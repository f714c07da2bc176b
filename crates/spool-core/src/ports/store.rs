//! QueueStore port: the shared list store that holds queues and the error log.
//!
//! Implementations: `RedisStore` for production, `InMemoryStore` for tests and
//! demos. Keys are opaque here; the layout lives in `domain::Namespace`.

use async_trait::async_trait;

use crate::error::StoreError;

/// Atomic list and set operations keyed by string.
///
/// Every call checks a connection out and returns it before completing, so no
/// connection is ever held across a caller's await point.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Atomically remove and return the head of the list, `None` when empty.
    async fn pop_front(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Append to the tail of the list, creating it if needed.
    async fn push_back(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Add a member to a set. Adding an existing member is a no-op.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Members of a set, sorted.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn list_len(&self, key: &str) -> Result<usize, StoreError>;

    /// The last `count` elements of a list, oldest first.
    async fn list_tail(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, StoreError>;
}
