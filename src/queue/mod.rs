//! The queue service: priority ordering, dequeues, and their audit trail.
//!
//! [`QueueService`] holds nothing but a handle to a [`QueueStore`]. All state
//! lives in the store, so one service can be cloned and shared freely across
//! tasks, and several services over different stores can coexist.

pub mod audit;
pub mod validate;

pub use audit::AuditStatus;
pub use validate::Validate;

use crate::error::{Error, Result};
use crate::model::*;
use crate::store::QueueStore;
use crate::telemetry::queue::{record_dequeued, record_outcome, start_queue_span};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span};

/// Enqueue, dequeue, reorder and audit priority queues held in a store.
#[derive(Clone)]
pub struct QueueService {
    store: Arc<dyn QueueStore>,
}

impl QueueService {
    /// Build a service and run the store's one-time setup.
    pub async fn new(store: Arc<dyn QueueStore>) -> Result<Self> {
        store
            .prepare()
            .await
            .map_err(|source| Error::StoreSetup {
                operation: "prepare",
                source,
            })?;
        Ok(Self { store })
    }

    /// Build a service over a store that is already prepared.
    pub fn with_store(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Round-trip to the store.
    pub async fn health_check(&self) -> Result<()> {
        self.store
            .ping()
            .await
            .map_err(|source| Error::StoreSetup {
                operation: "ping",
                source,
            })
    }

    /// Insert a member, or move it to the new score if it is already queued.
    pub async fn enqueue(&self, req: &EnqueueReq) -> Result<()> {
        observe("enqueue", &req.queue_id, async {
            req.validate()?;
            self.store
                .add(&req.queue_id, &req.entry())
                .await
                .map_err(|e| Error::store("enqueue", &req.queue_id, e))
        })
        .await
    }

    /// Remove members from the head of the queue.
    ///
    /// An empty queue yields an empty list, not an error. Ranked dequeues
    /// record each member for [`QueueService::is_dequeued`]; release-all
    /// flags the whole queue instead.
    pub async fn dequeue(&self, req: &DequeueReq) -> Result<Vec<String>> {
        observe("dequeue", &req.queue_id, async {
            req.validate()?;
            let members = match req.mode.take_count() {
                Some(count) => self.store.pop_by_rank(&req.queue_id, count).await,
                None => self.store.release_all(&req.queue_id).await,
            }
            .map_err(|e| Error::store("dequeue", &req.queue_id, e))?;

            record_dequeued(&Span::current(), req.mode.as_str(), members.len());
            Ok(members)
        })
        .await
    }

    /// The next member to be dequeued, left in place.
    pub async fn peek(&self, queue_id: &str) -> Result<String> {
        observe("peek", queue_id, async {
            validate::queue_id(queue_id)?;
            let head = self
                .store
                .range_by_rank(queue_id, 0, 0)
                .await
                .map_err(|e| Error::store("peek", queue_id, e))?;
            head.into_iter()
                .next()
                .ok_or_else(|| Error::QueueEmpty(queue_id.to_string()))
        })
        .await
    }

    /// Zero-based rank of a member; 0 is next to be dequeued.
    pub async fn get_position(&self, req: &PositionReq) -> Result<u64> {
        observe("position", &req.queue_id, async {
            req.validate()?;
            let count = self
                .store
                .cardinality(&req.queue_id)
                .await
                .map_err(|e| Error::store("position", &req.queue_id, e))?;
            if count == 0 {
                return Err(Error::QueueEmpty(req.queue_id.clone()));
            }

            self.store
                .rank(&req.queue_id, &req.member_id)
                .await
                .map_err(|e| Error::store("position", &req.queue_id, e))?
                .ok_or_else(|| Error::MemberNotFound {
                    queue_id: req.queue_id.clone(),
                    member_id: req.member_id.clone(),
                })
        })
        .await
    }

    /// Set or update a member's score. Same store effect as [`QueueService::enqueue`].
    pub async fn set_priority(&self, req: &SetPriorityReq) -> Result<()> {
        observe("set_priority", &req.queue_id, async {
            req.validate()?;
            self.store
                .add(&req.queue_id, &req.entry())
                .await
                .map_err(|e| Error::store("set_priority", &req.queue_id, e))
        })
        .await
    }

    /// Cancel a member. Absent members are not an error, and the removal is
    /// not recorded as a dequeue.
    pub async fn delete(&self, req: &DeleteReq) -> Result<()> {
        observe("delete", &req.queue_id, async {
            req.validate()?;
            let removed = self
                .store
                .remove(&req.queue_id, &req.member_id)
                .await
                .map_err(|e| Error::store("delete", &req.queue_id, e))?;
            tracing::debug!(member_id = %req.member_id, removed, "delete");
            Ok(())
        })
        .await
    }

    /// Empty the queue and flag it fully released. Idempotent; returns how
    /// many members were removed.
    pub async fn clear(&self, queue_id: &str) -> Result<u64> {
        observe("clear", queue_id, async {
            validate::queue_id(queue_id)?;
            let members = self
                .store
                .release_all(queue_id)
                .await
                .map_err(|e| Error::store("clear", queue_id, e))?;
            record_dequeued(&Span::current(), DequeueMode::ReleaseAll.as_str(), members.len());
            Ok(members.len() as u64)
        })
        .await
    }

    /// Run any request and wrap its result in the matching [`Response`].
    pub async fn execute(&self, req: Request) -> Result<Response> {
        match req {
            Request::Enqueue(r) => self.enqueue(&r).await.map(|()| Response::Enqueued),
            Request::Dequeue(r) => self.dequeue(&r).await.map(Response::Dequeued),
            Request::Position(r) => self.get_position(&r).await.map(Response::Position),
            Request::SetPriority(r) => self.set_priority(&r).await.map(|()| Response::PrioritySet),
            Request::Delete(r) => self.delete(&r).await.map(|()| Response::Deleted),
            Request::Peek { queue_id } => self.peek(&queue_id).await.map(Response::Peeked),
            Request::IsDequeued(r) => self.is_dequeued(&r).await.map(Response::IsDequeued),
            Request::Clear { queue_id } => self.clear(&queue_id).await.map(Response::Cleared),
        }
    }
}

/// Run one operation inside its span and record the outcome.
async fn observe<T>(
    operation: &'static str,
    queue_id: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let span = start_queue_span(operation, queue_id);
    let started = Instant::now();
    let result = fut.instrument(span.clone()).await;
    record_outcome(&span, operation, started, &result);
    result
}
