//! Dequeue audit: has a member already left its queue through a dequeue?
//!
//! Two records answer this. A queue-wide release flag, set whenever the whole
//! queue is released at once, covers every member the queue ever held. A
//! per-queue set of members, filled by ranked dequeues, covers the rest.
//! The flag is checked first and wins regardless of the set's contents.
//!
//! Deletes write neither record, so a cancelled member never reads as
//! dequeued unless the queue was released as a whole.

use super::{QueueService, Validate, observe};
use crate::error::{Error, Result};
use crate::model::IsDequeuedReq;
use serde::{Deserialize, Serialize};

/// Why a member does or does not count as dequeued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// The queue has been fully released; every member counts.
    Released,
    /// The member was taken by a ranked dequeue.
    Dequeued,
    /// No dequeue record. The member may be queued, deleted, or unknown.
    NotDequeued,
}

impl AuditStatus {
    pub fn is_dequeued(self) -> bool {
        !matches!(self, AuditStatus::NotDequeued)
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditStatus::Released => "released",
            AuditStatus::Dequeued => "dequeued",
            AuditStatus::NotDequeued => "not_dequeued",
        };
        write!(f, "{s}")
    }
}

impl QueueService {
    /// Look up the dequeue record for a member.
    ///
    /// Never fails because the member is unknown: a member that was never
    /// enqueued is simply [`AuditStatus::NotDequeued`].
    pub async fn audit(&self, req: &IsDequeuedReq) -> Result<AuditStatus> {
        observe("audit", &req.queue_id, async {
            req.validate()?;

            let released = self
                .store
                .is_released(&req.queue_id)
                .await
                .map_err(|e| Error::store("audit", &req.queue_id, e))?;
            if released {
                return Ok(AuditStatus::Released);
            }

            let dequeued = self
                .store
                .is_member_dequeued(&req.queue_id, &req.member_id)
                .await
                .map_err(|e| Error::store("audit", &req.queue_id, e))?;
            Ok(if dequeued {
                AuditStatus::Dequeued
            } else {
                AuditStatus::NotDequeued
            })
        })
        .await
    }

    /// Whether the member has left the queue through a dequeue or a full release.
    pub async fn is_dequeued(&self, req: &IsDequeuedReq) -> Result<bool> {
        self.audit(req).await.map(AuditStatus::is_dequeued)
    }
}
