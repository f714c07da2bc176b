use thiserror::Error;

/// Failure talking to the queue store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No usable connection: the store is unreachable, the pool is exhausted,
    /// or the transport broke mid-command. Transient.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store answered but rejected the command.
    #[error("store command failed: {0}")]
    Command(String),
}

impl StoreError {
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("task encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("task decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("error report abandoned after {attempts} attempts: {source}")]
    ReportAbandoned {
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

pub type Result<T> = std::result::Result<T, SpoolError>;
