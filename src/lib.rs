//! # pqueue-rs
//!
//! Priority queues layered over a score-ordered set store.
//!
//! Producers enqueue members with a numeric score; consumers dequeue the
//! lowest scores first, query ranks, re-prioritize, delete, and later ask
//! whether a member already left its queue through a dequeue. Redis and
//! Postgres backends are provided, plus an in-memory store for tests.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod queue;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
pub use queue::QueueService;
