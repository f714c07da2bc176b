//! RedisStore: QueueStore over a pooled set of Redis connections.
//!
//! Connections are checked out of a `bb8` pool per call and go back to the
//! pool when the guard drops. A failed checkout and a broken transport are
//! both reported as `StoreError::Connection`; anything Redis itself rejects
//! is a `StoreError::Command`.

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis::{self, RedisError};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use secrecy::ExposeSecret;

use crate::config::StoreOptions;
use crate::error::{SpoolError, StoreError};
use crate::ports::QueueStore;

pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisStore {
    /// Build the pool and check one connection out of it.
    ///
    /// An address that does not parse is a `SpoolError::Config`; a store that
    /// cannot be reached is a `StoreError::Connection`. Either way the failure
    /// surfaces at startup rather than in the poll loop, whatever `max_idle` is.
    pub async fn connect(options: &StoreOptions) -> crate::error::Result<Self> {
        let manager = RedisConnectionManager::new(connection_url(options))
            .map_err(|e| SpoolError::Config(format!("invalid store address: {e}")))?;

        let max_size = options.max_active.max(1);
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(options.max_idle.min(max_size)))
            .idle_timeout(Some(options.idle_timeout))
            .connection_timeout(options.connect_timeout)
            .build(manager)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self { pool };
        drop(store.conn().await?);

        tracing::info!(
            addr = %options.addr,
            db = options.db,
            max_active = max_size,
            "store pool ready"
        );
        Ok(store)
    }

    async fn conn(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// `redis://[:password@]host:port/db`, keeping an explicit scheme if given.
fn connection_url(options: &StoreOptions) -> String {
    let (scheme, host) = match options.addr.split_once("://") {
        Some((scheme, rest)) => (scheme, rest.trim_end_matches('/')),
        None => ("redis", options.addr.as_str()),
    };
    let auth = match &options.password {
        Some(password) => format!(
            ":{}@",
            utf8_percent_encode(password.expose_secret(), NON_ALPHANUMERIC)
        ),
        None => String::new(),
    };
    format!("{scheme}://{auth}{host}/{}", options.db)
}

fn classify(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
    {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn pop_front(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn().await?;
        let reply: Option<Vec<u8>> = redis::cmd("LPOP")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        Ok(reply)
    }

    async fn push_back(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _len: i64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _added: i64 = redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn().await?;
        let mut members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        members.sort();
        Ok(members)
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn().await?;
        let len: usize = redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        Ok(len)
    }

    async fn list_tail(&self, key: &str, count: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let start = -(count.min(i64::MAX as usize) as i64);
        let items: Vec<Vec<u8>> = redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(-1)
            .query_async(&mut *conn)
            .await
            .map_err(classify)?;
        Ok(items)
    }
}
