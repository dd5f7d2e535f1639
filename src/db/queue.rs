//! Queue store primitives over the `pq_*` tables.
//!
//! Dequeues run in one transaction that first takes a per-queue advisory
//! lock, so concurrent dequeues on a queue serialize while enqueues and
//! reads proceed. A ranked dequeue then row-locks the head and re-reads it;
//! if a concurrent delete or re-score moved the head in between, the
//! transaction is rolled back and retried.

use super::Db;
use crate::model::QueueEntry;
use crate::store::{QueueStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

const LOCK_QUEUE: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";
const MAX_POP_ATTEMPTS: u32 = 16;

#[async_trait]
impl QueueStore for Db {
    async fn prepare(&self) -> StoreResult<()> {
        self.migrate().await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.health_check().await
    }

    async fn add(&self, queue_id: &str, entry: &QueueEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO pq_entries (queue_id, member_id, score) VALUES ($1, $2, $3)
             ON CONFLICT (queue_id, member_id) DO UPDATE SET score = EXCLUDED.score",
        )
        .bind(queue_id)
        .bind(&entry.member_id)
        .bind(entry.score)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn remove(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM pq_entries WHERE queue_id = $1 AND member_id = $2")
            .bind(queue_id)
            .bind(member_id)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }

    async fn range_by_rank(
        &self,
        queue_id: &str,
        start: u64,
        stop: i64,
    ) -> StoreResult<Vec<String>> {
        // Negative stops count from the end; -1 needs no count at all.
        let stop = match stop {
            -1 => None,
            s if s < 0 => Some(self.cardinality(queue_id).await? as i64 + s),
            s => Some(s),
        };
        let limit = match stop {
            Some(stop) if stop < start as i64 => return Ok(Vec::new()),
            Some(stop) => Some(stop - start as i64 + 1),
            None => None,
        };

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT member_id FROM pq_entries WHERE queue_id = $1
             ORDER BY score, member_id
             OFFSET $2 LIMIT $3",
        )
        .bind(queue_id)
        .bind(start as i64)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(|(member,)| member).collect())
    }

    async fn rank(&self, queue_id: &str, member_id: &str) -> StoreResult<Option<u64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM pq_entries o
                     WHERE o.queue_id = e.queue_id
                     AND (o.score, o.member_id) < (e.score, e.member_id))
             FROM pq_entries e WHERE e.queue_id = $1 AND e.member_id = $2",
        )
        .bind(queue_id)
        .bind(member_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(rank,)| rank as u64))
    }

    async fn cardinality(&self, queue_id: &str) -> StoreResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pq_entries WHERE queue_id = $1")
            .bind(queue_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0 as u64)
    }

    async fn pop_by_rank(&self, queue_id: &str, count: usize) -> StoreResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        let (mut tx, members) = loop {
            attempt += 1;
            let mut tx = self.pool().begin().await?;
            sqlx::query(LOCK_QUEUE)
                .bind(queue_id)
                .execute(&mut *tx)
                .await?;

            // Row locks pin the candidates; the second read sees any write
            // that committed while we waited for them.
            let locked: Vec<(String,)> = sqlx::query_as(
                "SELECT member_id FROM pq_entries WHERE queue_id = $1
                 ORDER BY score, member_id LIMIT $2
                 FOR UPDATE",
            )
            .bind(queue_id)
            .bind(count as i64)
            .fetch_all(&mut *tx)
            .await?;
            let head: Vec<(String,)> = sqlx::query_as(
                "SELECT member_id FROM pq_entries WHERE queue_id = $1
                 ORDER BY score, member_id LIMIT $2",
            )
            .bind(queue_id)
            .bind(count as i64)
            .fetch_all(&mut *tx)
            .await?;

            let locked: HashSet<String> = locked.into_iter().map(|(member,)| member).collect();
            let head: Vec<String> = head.into_iter().map(|(member,)| member).collect();
            if head.len() == locked.len() && head.iter().all(|m| locked.contains(m)) {
                break (tx, head);
            }

            tx.rollback().await?;
            if attempt >= MAX_POP_ATTEMPTS {
                return Err(StoreError::Unavailable(format!(
                    "head of queue {queue_id} kept moving during dequeue"
                )));
            }
            debug!(queue_id, attempt, "queue head changed while locking, retrying");
        };

        if !members.is_empty() {
            sqlx::query("DELETE FROM pq_entries WHERE queue_id = $1 AND member_id = ANY($2)")
                .bind(queue_id)
                .bind(&members)
                .execute(&mut *tx)
                .await?;

            let event_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO pq_dequeued (queue_id, member_id, event_id, dequeued_at)
                 SELECT $1, m, $3, $4 FROM UNNEST($2::text[]) AS m
                 ON CONFLICT (queue_id, member_id)
                 DO UPDATE SET event_id = EXCLUDED.event_id, dequeued_at = EXCLUDED.dequeued_at",
            )
            .bind(queue_id)
            .bind(&members)
            .bind(event_id)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;
            debug!(queue_id, %event_id, count = members.len(), "recorded dequeue event");
        }

        tx.commit().await?;
        Ok(members)
    }

    async fn release_all(&self, queue_id: &str) -> StoreResult<Vec<String>> {
        let mut tx = self.pool().begin().await?;
        sqlx::query(LOCK_QUEUE)
            .bind(queue_id)
            .execute(&mut *tx)
            .await?;

        let rows: Vec<(String,)> = sqlx::query_as(
            "WITH popped AS (
                 DELETE FROM pq_entries WHERE queue_id = $1
                 RETURNING member_id, score
             )
             SELECT member_id FROM popped ORDER BY score, member_id",
        )
        .bind(queue_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO pq_releases (queue_id, released_at) VALUES ($1, $2)
             ON CONFLICT (queue_id) DO UPDATE SET released_at = EXCLUDED.released_at",
        )
        .bind(queue_id)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rows.into_iter().map(|(member,)| member).collect())
    }

    async fn is_released(&self, queue_id: &str) -> StoreResult<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM pq_releases WHERE queue_id = $1)")
                .bind(queue_id)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }

    async fn is_member_dequeued(&self, queue_id: &str, member_id: &str) -> StoreResult<bool> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM pq_dequeued WHERE queue_id = $1 AND member_id = $2)",
        )
        .bind(queue_id)
        .bind(member_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }
}
