//! Metric instrument factories for pqueue-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"pqueue-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for pqueue-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("pqueue-rs")
}

/// Counter: queue operations.
/// Labels: `operation`, `result` ("ok" | "empty" | "not_found" | "invalid" | "error").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("pqueue.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: members removed by dequeues.
/// Labels: `mode` ("single" | "first_n" | "release_all").
pub fn dequeued_members() -> Counter<u64> {
    meter()
        .u64_counter("pqueue.queue.dequeued_members")
        .with_description("Number of members removed by dequeue operations")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("pqueue.operation.duration_ms")
        .with_description("Queue operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
