//! Dispatcher configuration.
//!
//! Built in code or loaded once from environment variables; invalid values
//! fail fast. The store password is wrapped in `secrecy::SecretString` so it
//! never shows up in `Debug` output or logs.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Result, SpoolError};

/// Connection and pool settings for the queue store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// `host:port`, or a `redis://` / `rediss://` URL.
    pub addr: String,
    pub password: Option<SecretString>,
    /// Logical database index.
    pub db: i64,
    /// Connections kept warm in the pool.
    pub max_idle: u32,
    /// Upper bound on open connections.
    pub max_active: u32,
    /// Idle connections older than this are closed.
    pub idle_timeout: Duration,
    /// How long a checkout may wait before it counts as a connection failure.
    pub connect_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
            max_idle: 4,
            max_active: 16,
            idle_timeout: Duration::from_secs(180),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Poller pacing.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pause after a full pass over the queues that popped nothing.
    ///
    /// Zero (the default) means busy polling: the poller only yields to the
    /// scheduler between passes. That keeps dispatch latency minimal at the
    /// cost of a spinning core on an idle system; raise it to trade latency
    /// for CPU.
    pub idle_interval: Duration,
    /// Pause after the store could not be reached.
    pub connect_backoff: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            idle_interval: Duration::ZERO,
            connect_backoff: Duration::from_secs(3),
        }
    }
}

/// How hard the error reporter tries before giving up on one entry.
#[derive(Debug, Clone)]
pub struct ReportRetryPolicy {
    pub backoff: Duration,
    /// `None` retries until the append succeeds.
    pub max_attempts: Option<u32>,
}

impl ReportRetryPolicy {
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts),
        }
    }

    /// Whether another attempt is allowed after `attempts` failed ones.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

impl Default for ReportRetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(3))
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub store: StoreOptions,
    pub namespace: String,
    /// Visited in this order on every pass.
    pub queues: Vec<String>,
    /// Number of workers, and so the cap on concurrently running handlers.
    pub concurrency: usize,
    pub poll: PollOptions,
    pub report_retry: ReportRetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            store: StoreOptions::default(),
            namespace: "spool".to_string(),
            queues: vec!["default".to_string()],
            concurrency: 4,
            poll: PollOptions::default(),
            report_retry: ReportRetryPolicy::default(),
        }
    }
}

impl DispatchOptions {
    /// Defaults with the given namespace and comma-separated queue list.
    pub fn new(namespace: impl Into<String>, queues: &str) -> Self {
        Self {
            namespace: namespace.into(),
            queues: parse_queue_names(queues),
            ..Self::default()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Load from `SPOOL_*` environment variables, falling back to defaults.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let store_defaults = defaults.store;

        let store = StoreOptions {
            addr: var_or("SPOOL_REDIS_ADDR", store_defaults.addr),
            password: std::env::var("SPOOL_REDIS_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty())
                .map(SecretString::from),
            db: parsed_var("SPOOL_REDIS_DB", store_defaults.db)?,
            max_idle: parsed_var("SPOOL_REDIS_MAX_IDLE", store_defaults.max_idle)?,
            max_active: parsed_var("SPOOL_REDIS_MAX_ACTIVE", store_defaults.max_active)?,
            idle_timeout: Duration::from_secs(parsed_var(
                "SPOOL_REDIS_IDLE_TIMEOUT_SECS",
                store_defaults.idle_timeout.as_secs(),
            )?),
            connect_timeout: store_defaults.connect_timeout,
        };

        let options = Self {
            store,
            namespace: var_or("SPOOL_NAMESPACE", defaults.namespace),
            queues: match std::env::var("SPOOL_QUEUES") {
                Ok(raw) => parse_queue_names(&raw),
                Err(_) => defaults.queues,
            },
            concurrency: parsed_var("SPOOL_CONCURRENCY", defaults.concurrency)?,
            poll: PollOptions {
                idle_interval: Duration::from_millis(parsed_var(
                    "SPOOL_IDLE_INTERVAL_MS",
                    defaults.poll.idle_interval.as_millis() as u64,
                )?),
                connect_backoff: Duration::from_millis(parsed_var(
                    "SPOOL_CONNECT_BACKOFF_MS",
                    defaults.poll.connect_backoff.as_millis() as u64,
                )?),
            },
            report_retry: defaults.report_retry,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(SpoolError::Config("concurrency must be at least 1".into()));
        }
        if self.queues.is_empty() {
            return Err(SpoolError::Config("at least one queue name is required".into()));
        }
        if self.namespace.is_empty() {
            return Err(SpoolError::Config("namespace must not be empty".into()));
        }
        if self.store.max_active == 0 {
            return Err(SpoolError::Config("max_active must be at least 1".into()));
        }
        Ok(())
    }
}

/// Split a comma-separated queue list, trimming blanks and dropping empty
/// segments. Order is preserved; it is the poller's visiting order.
pub fn parse_queue_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn var_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SpoolError::Config(format!("{name}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}
