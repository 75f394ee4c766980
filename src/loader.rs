//! Forward and backward-to-snapshot loaders (components D and E).

use crate::error::StoreError;
use crate::log_client::EventLogClient;
use crate::metrics;
use crate::reader::{self, ReadBatch};
use crate::retry::RetryPolicy;
use crate::slice::{Direction, ReadFrom, ResolvedEvent};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Result of a load: the stream version observed, plus the events in
/// chronological order.
pub struct Loaded {
    pub version: i64,
    pub events: Vec<ResolvedEvent>,
}

/// Forward loader (component D): concatenate all forward batches from
/// `from_position` into one chronological result.
pub async fn load_forwards_from(
    client: Arc<dyn EventLogClient>,
    retry: Option<RetryPolicy>,
    stream: &str,
    from_position: i64,
    page_size: usize,
    max_batches: Option<usize>,
) -> Result<Loaded, StoreError> {
    let start = Instant::now();
    let mut batch_stream = Box::pin(reader::read_forward(
        client,
        retry,
        stream,
        from_position,
        page_size,
        max_batches,
    ));

    let mut version = None;
    let mut events = Vec::new();
    let mut slice_count = 0usize;

    while let Some(batch) = batch_stream.next().await {
        let ReadBatch {
            first_batch_version,
            events: mut batch_events,
        } = batch?;
        if let Some(v) = first_batch_version {
            version = Some(v);
        }
        slice_count += 1;
        events.append(&mut batch_events);
    }

    let version = version.ok_or_else(|| StoreError::MissingVersion {
        stream: stream.to_string(),
    })?;

    metrics::record_batch(stream, Direction::Forward, slice_count, start.elapsed());
    Ok(Loaded { version, events })
}

/// Backward-to-snapshot loader (component E): read backward from the tail,
/// stop inclusively at the first event recognized by `is_snapshot`, then
/// reverse into chronological order.
///
/// If the snapshot sits inside a larger batch, the batch's used (kept) vs
/// residual (discarded) byte split is reported via
/// [`metrics::record_snapshot_partition`] — this drives operational
/// tuning of page size.
pub async fn load_backwards_until_compaction_or_start(
    client: Arc<dyn EventLogClient>,
    retry: Option<RetryPolicy>,
    stream: &str,
    page_size: usize,
    max_batches: Option<usize>,
    is_snapshot: impl Fn(&ResolvedEvent) -> bool,
) -> Result<Loaded, StoreError> {
    let start = Instant::now();
    let mut batch_stream = Box::pin(reader::read_backward(
        client,
        retry,
        stream,
        ReadFrom::End,
        page_size,
        max_batches,
    ));

    let mut version = None;
    // Accumulated in backward (descending) order; reversed at the end.
    let mut backward_events: Vec<ResolvedEvent> = Vec::new();
    let mut slice_count = 0usize;

    'outer: while let Some(batch) = batch_stream.next().await {
        let ReadBatch {
            first_batch_version,
            events: batch_events,
        } = batch?;
        if let Some(v) = first_batch_version {
            version = Some(v);
        }
        slice_count += 1;

        if let Some(snapshot_index) = batch_events.iter().position(|e| is_snapshot(e)) {
            let used_bytes: usize = batch_events[..=snapshot_index].iter().map(|e| e.byte_len()).sum();
            let residual_bytes: usize = batch_events[snapshot_index + 1..].iter().map(|e| e.byte_len()).sum();
            if residual_bytes > 0 {
                metrics::record_snapshot_partition(stream, page_size, used_bytes, residual_bytes);
            }
            backward_events.extend(batch_events.into_iter().take(snapshot_index + 1));
            break 'outer;
        }

        backward_events.extend(batch_events);
    }

    let version = version.ok_or_else(|| StoreError::MissingVersion {
        stream: stream.to_string(),
    })?;

    backward_events.reverse();
    metrics::record_batch(stream, Direction::Backward, slice_count, start.elapsed());
    Ok(Loaded {
        version,
        events: backward_events,
    })
}
