//! Redis backend: one sorted set per queue, a string flag for full release,
//! and a plain set of members taken by ranked dequeues.
//!
//! The read-then-remove dequeues run as Lua scripts so no other command on
//! the queue can interleave between the read and the remove.

use super::{KeySpace, QueueStore, StoreResult};
use crate::model::QueueEntry;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use tracing::{error, info};

/// KEYS[1] live ordering, KEYS[2] dequeued set, ARGV[1] last rank to take.
/// SADD is batched because `unpack` is bounded by the Lua stack size.
const POP_BY_RANK: &str = r#"
local members = redis.call('ZRANGE', KEYS[1], 0, ARGV[1])
if #members == 0 then
    return members
end
redis.call('ZREMRANGEBYRANK', KEYS[1], 0, ARGV[1])
for i = 1, #members, 1000 do
    redis.call('SADD', KEYS[2], unpack(members, i, math.min(i + 999, #members)))
end
return members
"#;

/// KEYS[1] live ordering, KEYS[2] release flag.
const RELEASE_ALL: &str = r#"
local members = redis.call('ZRANGE', KEYS[1], 0, -1)
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', '+inf')
redis.call('SET', KEYS[2], '1')
return members
"#;

/// Redis sorted-set store.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: ConnectionManager,
    keys: KeySpace,
    pop_by_rank: Script,
    release_all: Script,
}

impl RedisStore {
    /// Connect to Redis and build a managed, auto-reconnecting connection.
    pub async fn connect(url: &str, keys: KeySpace) -> StoreResult<Self> {
        info!("connecting to redis");

        let client = Client::open(url).inspect_err(|e| {
            error!(error = %e, "failed to create redis client");
        })?;

        let connection_manager = ConnectionManager::new(client).await.inspect_err(|e| {
            error!(error = %e, "failed to create redis connection manager");
        })?;

        Ok(Self::with_connection_manager(connection_manager, keys))
    }

    /// Build a store over an existing connection manager.
    pub fn with_connection_manager(connection_manager: ConnectionManager, keys: KeySpace) -> Self {
        Self {
            connection_manager,
            keys,
            pop_by_rank: Script::new(POP_BY_RANK),
            release_all: Script::new(RELEASE_ALL),
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection_manager.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn add(&self, queue_id: &str, entry: &QueueEntry) -> StoreResult<()> {
        let mut conn = self.connection_manager.clone();
        let _: i64 = conn
            .zadd(self.keys.live(queue_id), &entry.member_id, entry.score)
            .await?;
        Ok(())
    }

    async fn remove(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection_manager.clone();
        let removed: i64 = conn.zrem(self.keys.live(queue_id), member_id).await?;
        Ok(removed > 0)
    }

    async fn range_by_rank(
        &self,
        queue_id: &str,
        start: u64,
        stop: i64,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let members: Vec<String> = conn
            .zrange(self.keys.live(queue_id), start as isize, stop as isize)
            .await?;
        Ok(members)
    }

    async fn rank(&self, queue_id: &str, member_id: &str) -> StoreResult<Option<u64>> {
        let mut conn = self.connection_manager.clone();
        let rank: Option<u64> = conn.zrank(self.keys.live(queue_id), member_id).await?;
        Ok(rank)
    }

    async fn cardinality(&self, queue_id: &str) -> StoreResult<u64> {
        let mut conn = self.connection_manager.clone();
        let count: u64 = conn.zcard(self.keys.live(queue_id)).await?;
        Ok(count)
    }

    async fn pop_by_rank(&self, queue_id: &str, count: usize) -> StoreResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection_manager.clone();
        let members: Vec<String> = self
            .pop_by_rank
            .key(self.keys.live(queue_id))
            .key(self.keys.dequeued(queue_id))
            .arg(count - 1)
            .invoke_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn release_all(&self, queue_id: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection_manager.clone();
        let members: Vec<String> = self
            .release_all
            .key(self.keys.live(queue_id))
            .key(self.keys.released(queue_id))
            .invoke_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn is_released(&self, queue_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection_manager.clone();
        let released: bool = conn.exists(self.keys.released(queue_id)).await?;
        Ok(released)
    }

    async fn is_member_dequeued(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let mut conn = self.connection_manager.clone();
        let dequeued: bool = conn
            .sismember(self.keys.dequeued(queue_id), member_id)
            .await?;
        Ok(dequeued)
    }
}
