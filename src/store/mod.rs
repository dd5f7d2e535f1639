//! The score-ordered set store behind every queue.
//!
//! [`QueueStore`] is the only seam between the queue service and the process
//! that actually holds the data. Backends:
//!
//! - [`memory::MemoryStore`]: in-process, for tests and local runs.
//! - [`redis::RedisStore`]: Redis sorted sets, Lua scripts for atomic pops.
//! - [`crate::db::Db`]: Postgres tables, transactions for atomic pops.
//!
//! All backends order equal scores by member identifier, byte-wise ascending.

pub mod memory;
pub mod redis;

use crate::model::QueueEntry;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Primitives a store must offer to host priority queues.
///
/// `pop_by_rank` and `release_all` must each execute as one atomic unit with
/// respect to every other call on the same queue.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// One-time idempotent setup (schema, indexes). Safe to call repeatedly.
    async fn prepare(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Round-trip to the store.
    async fn ping(&self) -> StoreResult<()>;

    /// Insert the member, or move it to the new score if present.
    async fn add(&self, queue_id: &str, entry: &QueueEntry) -> StoreResult<()>;

    /// Remove a member. Returns whether it was present.
    async fn remove(&self, queue_id: &str, member_id: &str) -> StoreResult<bool>;

    /// Members ranked `start..=stop` in ascending order. A negative `stop`
    /// counts from the end, `-1` being the last member.
    async fn range_by_rank(&self, queue_id: &str, start: u64, stop: i64)
    -> StoreResult<Vec<String>>;

    /// Zero-based rank of a member, `None` if it is not in the queue.
    async fn rank(&self, queue_id: &str, member_id: &str) -> StoreResult<Option<u64>>;

    /// Number of members currently in the queue.
    async fn cardinality(&self, queue_id: &str) -> StoreResult<u64>;

    /// Atomically take the first `count` members and record each as dequeued.
    async fn pop_by_rank(&self, queue_id: &str, count: usize) -> StoreResult<Vec<String>>;

    /// Atomically take every member and set the queue's release flag.
    async fn release_all(&self, queue_id: &str) -> StoreResult<Vec<String>>;

    /// Whether the queue has ever been fully released.
    async fn is_released(&self, queue_id: &str) -> StoreResult<bool>;

    /// Whether the member was taken by a ranked dequeue.
    async fn is_member_dequeued(&self, queue_id: &str, member_id: &str) -> StoreResult<bool>;
}

/// Key naming for stores addressed by string keys.
///
/// Keys are namespaced first by concern, then by queue. The queue id sits in
/// a cluster hash tag so one queue's keys always share a slot.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Sorted set holding the live ordering.
    pub fn live(&self, queue_id: &str) -> String {
        format!("{}:live:{{{queue_id}}}", self.prefix)
    }

    /// Flag set once the queue is fully released.
    pub fn released(&self, queue_id: &str) -> String {
        format!("{}:released:{{{queue_id}}}", self.prefix)
    }

    /// Set of members removed by ranked dequeues.
    pub fn dequeued(&self, queue_id: &str) -> String {
        format!("{}:dequeued:{{{queue_id}}}", self.prefix)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("pq")
    }
}
