//! Queue operation span helpers.
//!
//! Every service call runs inside a `queue.<operation>` span and reports its
//! outcome to the metric instruments when it finishes.

use super::metrics;
use crate::error::Error;
use opentelemetry::KeyValue;
use std::time::Instant;
use tracing::Span;

/// Start a span for a queue operation.
///
/// The `queue.outcome` field is declared empty and filled by [`record_outcome`].
pub fn start_queue_span(operation: &'static str, queue_id: &str) -> Span {
    tracing::info_span!(
        "queue.operation",
        "otel.name" = operation,
        "queue.operation" = operation,
        "queue.id" = queue_id,
        "queue.outcome" = tracing::field::Empty,
    )
}

/// Short label for an operation result.
pub fn outcome_label<T>(result: &Result<T, Error>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(Error::QueueEmpty(_)) => "empty",
        Err(Error::MemberNotFound { .. }) => "not_found",
        Err(Error::InvalidRequest(_)) => "invalid",
        Err(_) => "error",
    }
}

/// Record the outcome on the span and on the operation metrics.
pub fn record_outcome<T>(
    span: &Span,
    operation: &'static str,
    started: Instant,
    result: &Result<T, Error>,
) {
    let outcome = outcome_label(result);
    span.record("queue.outcome", outcome);
    if let Err(e) = result {
        span.in_scope(|| match e {
            Error::StoreUnavailable { .. } | Error::StoreSetup { .. } => {
                tracing::warn!(error = %e, "queue operation failed")
            }
            _ => tracing::debug!(error = %e, "queue operation rejected"),
        });
    }

    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("result", outcome),
        ],
    );
    metrics::operation_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("operation", operation)],
    );
}

/// Count members leaving a queue through a dequeue.
pub fn record_dequeued(span: &Span, mode: &'static str, count: usize) {
    span.in_scope(|| {
        tracing::info!(mode, count, "dequeued");
    });
    metrics::dequeued_members().add(count as u64, &[KeyValue::new("mode", mode)]);
}
