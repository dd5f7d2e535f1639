//! Boundary checks applied before any store call is issued.

use crate::error::{Error, Result};
use crate::model::*;

/// A request that can be checked for malformed input.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub(crate) fn queue_id(queue_id: &str) -> Result<()> {
    if queue_id.is_empty() {
        return Err(Error::InvalidRequest("queue id must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn member_id(member_id: &str) -> Result<()> {
    if member_id.is_empty() {
        return Err(Error::InvalidRequest("member id must not be empty".to_string()));
    }
    Ok(())
}

/// Scores must be finite: NaN and both infinities are rejected.
pub(crate) fn score(score: f64) -> Result<()> {
    if !score.is_finite() {
        return Err(Error::InvalidRequest(format!(
            "score must be a finite number, got {score}"
        )));
    }
    Ok(())
}

fn member_in_queue(queue: &str, member: &str) -> Result<()> {
    queue_id(queue)?;
    member_id(member)
}

impl Validate for QueueEntry {
    fn validate(&self) -> Result<()> {
        member_id(&self.member_id)?;
        score(self.score)
    }
}

impl Validate for EnqueueReq {
    fn validate(&self) -> Result<()> {
        queue_id(&self.queue_id)?;
        self.entry().validate()
    }
}

impl Validate for SetPriorityReq {
    fn validate(&self) -> Result<()> {
        queue_id(&self.queue_id)?;
        self.entry().validate()
    }
}

impl Validate for DequeueReq {
    fn validate(&self) -> Result<()> {
        queue_id(&self.queue_id)
    }
}

impl Validate for PositionReq {
    fn validate(&self) -> Result<()> {
        member_in_queue(&self.queue_id, &self.member_id)
    }
}

impl Validate for DeleteReq {
    fn validate(&self) -> Result<()> {
        member_in_queue(&self.queue_id, &self.member_id)
    }
}

impl Validate for IsDequeuedReq {
    fn validate(&self) -> Result<()> {
        member_in_queue(&self.queue_id, &self.member_id)
    }
}

impl Validate for Request {
    fn validate(&self) -> Result<()> {
        match self {
            Request::Enqueue(r) => r.validate(),
            Request::Dequeue(r) => r.validate(),
            Request::Position(r) => r.validate(),
            Request::SetPriority(r) => r.validate(),
            Request::Delete(r) => r.validate(),
            Request::IsDequeued(r) => r.validate(),
            Request::Peek { queue_id: q } | Request::Clear { queue_id: q } => queue_id(q),
        }
    }
}
