//! Store key layout.
//!
//! Every key this crate touches is derived from a [`Namespace`], so several
//! independent deployments can share one store.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{ns}:queue:{queue}`, the FIFO list holding encoded tasks.
    pub fn queue_key(&self, queue: &str) -> String {
        format!("{}:queue:{}", self.0, queue)
    }

    /// `{ns}:queues`, the set of queue names ever pushed to.
    pub fn queues_key(&self) -> String {
        format!("{}:queues", self.0)
    }

    /// `{ns}:errors`, the append-only error log.
    pub fn errors_key(&self) -> String {
        format!("{}:errors", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
