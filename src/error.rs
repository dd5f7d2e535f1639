//! Error types for pqueue-rs.

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backing store could not complete a command. Never retried here;
    /// callers own the retry policy.
    #[error("store unavailable during {operation} on queue {queue_id}")]
    StoreUnavailable {
        operation: &'static str,
        queue_id: String,
        #[source]
        source: StoreError,
    },

    /// Store-wide setup or health check failed; not tied to any queue.
    #[error("store {operation} failed")]
    StoreSetup {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("queue is empty: {0}")]
    QueueEmpty(String),

    #[error("member {member_id} not found in queue {queue_id}")]
    MemberNotFound { queue_id: String, member_id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a store failure with the operation and queue it happened on.
    pub(crate) fn store(operation: &'static str, queue_id: &str, source: StoreError) -> Self {
        Error::StoreUnavailable {
            operation,
            queue_id: queue_id.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
