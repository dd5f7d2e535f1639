//! Core data model.
//!
//! A queue is a named, score-ordered set of member identifiers. Lower scores
//! leave first; equal scores leave in byte-wise member order. Every operation
//! is expressed as a plain request value so callers (and the CLI) can route
//! them through [`crate::queue::QueueService::execute`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One member of a queue together with its priority score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub member_id: String,
    /// Lower is higher priority.
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Add a member to a queue, or move it if it is already there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueReq {
    pub queue_id: String,
    pub member_id: String,
    pub score: f64,
}

impl EnqueueReq {
    pub fn entry(&self) -> QueueEntry {
        QueueEntry {
            member_id: self.member_id.clone(),
            score: self.score,
        }
    }
}

/// How many members a dequeue takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "count", rename_all = "snake_case")]
pub enum DequeueMode {
    /// The single highest-priority member.
    #[default]
    Single,
    /// Up to N members from the head of the queue. N of 0 or 1 behaves as
    /// [`DequeueMode::Single`].
    First(usize),
    /// Every member, flagging the queue as fully released.
    ReleaseAll,
}

impl DequeueMode {
    /// Number of members a ranked dequeue removes, or `None` for release-all.
    pub fn take_count(self) -> Option<usize> {
        match self {
            DequeueMode::Single => Some(1),
            DequeueMode::First(n) => Some(n.max(1)),
            DequeueMode::ReleaseAll => None,
        }
    }

    /// Label used for metrics and spans.
    pub fn as_str(self) -> &'static str {
        match self {
            DequeueMode::Single => "single",
            DequeueMode::First(n) if n <= 1 => "single",
            DequeueMode::First(_) => "first_n",
            DequeueMode::ReleaseAll => "release_all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeueReq {
    pub queue_id: String,
    #[serde(default)]
    pub mode: DequeueMode,
}

/// Ask for a member's zero-based rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReq {
    pub queue_id: String,
    pub member_id: String,
}

/// Set or update a member's score. Same effect as [`EnqueueReq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPriorityReq {
    pub queue_id: String,
    pub member_id: String,
    pub score: f64,
}

impl SetPriorityReq {
    pub fn entry(&self) -> QueueEntry {
        QueueEntry {
            member_id: self.member_id.clone(),
            score: self.score,
        }
    }
}

/// Cancel a member. Does not count as a dequeue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReq {
    pub queue_id: String,
    pub member_id: String,
}

/// Has this member left the queue through a dequeue?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsDequeuedReq {
    pub queue_id: String,
    pub member_id: String,
}

/// Any queue operation, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Enqueue(EnqueueReq),
    Dequeue(DequeueReq),
    Position(PositionReq),
    SetPriority(SetPriorityReq),
    Delete(DeleteReq),
    Peek { queue_id: String },
    IsDequeued(IsDequeuedReq),
    Clear { queue_id: String },
}

impl Request {
    /// The queue this request targets.
    pub fn queue_id(&self) -> &str {
        match self {
            Request::Enqueue(r) => &r.queue_id,
            Request::Dequeue(r) => &r.queue_id,
            Request::Position(r) => &r.queue_id,
            Request::SetPriority(r) => &r.queue_id,
            Request::Delete(r) => &r.queue_id,
            Request::Peek { queue_id } => queue_id,
            Request::IsDequeued(r) => &r.queue_id,
            Request::Clear { queue_id } => queue_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Result of [`Request`], one variant per request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum Response {
    Enqueued,
    Dequeued(Vec<String>),
    Position(u64),
    PrioritySet,
    Deleted,
    Peeked(String),
    IsDequeued(bool),
    Cleared(u64),
}
