//! Structured metric emission for physical log calls (component A, metrics
//! half — see [`crate::retry`] for the retry half).
//!
//! Every successful physical call emits exactly one `tracing::info!` event
//! carrying the field set spec'd for operational dashboards: stream name,
//! byte/event counts, elapsed time, and a discriminator identifying which
//! operation completed.

use crate::slice::Direction;
use std::time::Duration;

/// Discriminates which physical operation a metric event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationMetric {
    WriteSuccess,
    WriteConflict,
    Slice { direction: Direction },
    Batch { direction: Direction, slice_count: usize },
}

impl OperationMetric {
    fn label(&self) -> &'static str {
        match self {
            OperationMetric::WriteSuccess => "WriteSuccess",
            OperationMetric::WriteConflict => "WriteConflict",
            OperationMetric::Slice { .. } => "Slice",
            OperationMetric::Batch { .. } => "Batch",
        }
    }
}

/// Emit one structured log event for a completed write.
pub fn record_write(
    stream: &str,
    metric: OperationMetric,
    bytes: usize,
    count: usize,
    elapsed: Duration,
    expected_version: i64,
    next_expected_version: Option<i64>,
    log_position: Option<i64>,
) {
    tracing::info!(
        esEvt = metric.label(),
        stream,
        bytes,
        count,
        expectedVersion = expected_version,
        nextExpectedVersion = ?next_expected_version,
        logPosition = ?log_position,
        elapsedMs = elapsed.as_millis() as u64,
        "{}",
        metric.label()
    );
}

/// Emit one structured log event for a completed slice read.
pub fn record_slice(
    stream: &str,
    direction: Direction,
    bytes: usize,
    count: usize,
    elapsed: Duration,
    start_pos: i64,
) {
    tracing::info!(
        esEvt = "Slice",
        stream,
        bytes,
        count,
        direction = ?direction,
        startPos = start_pos,
        elapsedMs = elapsed.as_millis() as u64,
        "Slice"
    );
}

/// Emit one structured log event at the completion of a batched load.
pub fn record_batch(stream: &str, direction: Direction, slice_count: usize, elapsed: Duration) {
    tracing::info!(
        esEvt = "Batch",
        stream,
        direction = ?direction,
        batchIndex = slice_count,
        elapsedMs = elapsed.as_millis() as u64,
        "Batch"
    );
}

/// Log the used/residual byte partition of a batch that straddled a
/// snapshot boundary (spec.md §4.E step 3) — drives operational tuning of
/// batch size.
pub fn record_snapshot_partition(stream: &str, batch_size: usize, used_bytes: usize, residual_bytes: usize) {
    tracing::info!(
        stream,
        batchSize = batch_size,
        usedBytes = used_bytes,
        residualBytes = residual_bytes,
        "snapshot partition within batch"
    );
}
