//! InMemoryStore: process-local QueueStore for tests and demos.
//!
//! Lists and sets live behind one `tokio::sync::Mutex`; every operation
//! finishes inside the lock, so nothing is held across an await in callers.
//! Faults can be injected to exercise the backoff paths.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::ports::QueueStore;

#[derive(Default)]
struct Collections {
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    sets: HashMap<String, BTreeSet<String>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<Collections>,
    /// Next N operations fail with `StoreError::Connection`.
    connection_faults: AtomicU32,
    /// Next N operations fail with `StoreError::Command`.
    command_faults: AtomicU32,
    /// Operations that still succeed before pending faults kick in.
    fault_grace: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail as if the store were unreachable.
    pub fn fail_connections(&self, n: u32) {
        self.connection_faults.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` operations fail as if the store rejected them.
    pub fn fail_commands(&self, n: u32) {
        self.command_faults.store(n, Ordering::SeqCst);
    }

    /// Let the next `n` operations through before injected faults apply.
    pub fn skip_faults(&self, n: u32) {
        self.fault_grace.store(n, Ordering::SeqCst);
    }

    /// Snapshot of a list, head first.
    pub async fn list(&self, key: &str) -> Vec<Vec<u8>> {
        let state = self.state.lock().await;
        state
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn take_fault(&self) -> Result<(), StoreError> {
        if take_one(&self.fault_grace) {
            return Ok(());
        }
        if take_one(&self.connection_faults) {
            return Err(StoreError::Connection("injected connection fault".into()));
        }
        if take_one(&self.command_faults) {
            return Err(StoreError::Command("injected command fault".into()));
        }
        Ok(())
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn pop_front(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.take_fault()?;
        let mut state = self.state.lock().await;
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(None);
        };
        let head = list.pop_front();
        if list.is_empty() {
            state.lists.remove(key);
        }
        Ok(head)
    }

    async fn push_back(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.take_fault()?;
        let mut state = self.state.lock().await;
        state.lists.entry(key.to_string()).or_default().push_back(value);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.take_fault()?;
        let mut state = self.state.lock().await;
        state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.take_fault()?;
        let state = self.state.lock().await;
        Ok(state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        self.take_fault()?;
        let state = self.state.lock().await;
        Ok(state.lists.get(key).map_or(0, VecDeque::len))
    }

    async fn list_tail(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        self.take_fault()?;
        let state = self.state.lock().await;
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        let skip = list.len().saturating_sub(count);
        Ok(list.iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_pop_is_fifo() {
        let store = InMemoryStore::new();
        store.push_back("q", b"a".to_vec()).await.unwrap();
        store.push_back("q", b"b".to_vec()).await.unwrap();

        assert_eq!(store.pop_front("q").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.pop_front("q").await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.pop_front("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = InMemoryStore::new();
        store.push_back("q1", b"1".to_vec()).await.unwrap();
        store.push_back("q2", b"2".to_vec()).await.unwrap();

        assert_eq!(store.pop_front("q2").await.unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.list_len("q1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_add_is_idempotent() {
        let store = InMemoryStore::new();
        store.add_to_set("s", "b").await.unwrap();
        store.add_to_set("s", "a").await.unwrap();
        store.add_to_set("s", "b").await.unwrap();

        assert_eq!(store.set_members("s").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn tail_returns_newest_in_order() {
        let store = InMemoryStore::new();
        for v in ["1", "2", "3"] {
            store.push_back("l", v.as_bytes().to_vec()).await.unwrap();
        }

        let tail = store.list_tail("l", 2).await.unwrap();
        assert_eq!(tail, vec![b"2".to_vec(), b"3".to_vec()]);
        assert_eq!(store.list_tail("l", 10).await.unwrap().len(), 3);
        assert!(store.list_tail("missing", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_faults_are_consumed() {
        let store = InMemoryStore::new();
        store.fail_connections(1);
        store.fail_commands(1);

        let first = store.pop_front("q").await.unwrap_err();
        assert!(first.is_connection());
        let second = store.pop_front("q").await.unwrap_err();
        assert!(!second.is_connection());
        assert_eq!(store.pop_front("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn grace_delays_faults() {
        let store = InMemoryStore::new();
        store.fail_connections(1);
        store.skip_faults(2);

        store.push_back("q", b"a".to_vec()).await.unwrap();
        store.push_back("q", b"b".to_vec()).await.unwrap();
        assert!(store.pop_front("q").await.unwrap_err().is_connection());
        assert_eq!(store.pop_front("q").await.unwrap(), Some(b"a".to_vec()));
    }
}
