//! Read primitive (component C): a lazy, pull-based paged slice reader.
//!
//! Modeled as a `futures::Stream` built on `futures::stream::unfold` rather
//! than a callback stream (spec.md §9's "pull-based async iterator, not a
//! callback stream" design note) — each `.next()` on the stream is the
//! only suspension point, so cancellation between batches is cooperative
//! and leaves no partial state to clean up.

use crate::error::StoreError;
use crate::log_client::EventLogClient;
use crate::metrics;
use crate::retry::{with_retry, RetryPolicy};
use crate::slice::{Direction, ReadFrom, ResolvedEvent, SliceStatus};
use futures::stream::{self, Stream};
use std::sync::Arc;
use std::time::Instant;

/// One page yielded by [`read_batches`].
///
/// Only the first item of a sequence carries `first_batch_version`
/// (the slice's `lastEventNumber`); subsequent items carry `None`
/// (spec.md §4.C).
#[derive(Clone, Debug)]
pub struct ReadBatch {
    pub first_batch_version: Option<i64>,
    pub events: Vec<ResolvedEvent>,
}

#[derive(Clone, Copy, Debug)]
enum Position {
    Forward(i64),
    Backward(ReadFrom),
}

struct ReaderState {
    client: Arc<dyn EventLogClient>,
    retry: Option<RetryPolicy>,
    stream: String,
    direction: Direction,
    max_batches: Option<usize>,
    page_size: usize,
    position: Position,
    batches_yielded: usize,
    first_version_emitted: bool,
    done: bool,
}

/// Page forward from `from_position` in `stream`, one physical read per
/// item, `page_size` events per page.
pub fn read_forward(
    client: Arc<dyn EventLogClient>,
    retry: Option<RetryPolicy>,
    stream: impl Into<String>,
    from_position: i64,
    page_size: usize,
    max_batches: Option<usize>,
) -> impl Stream<Item = Result<ReadBatch, StoreError>> {
    read_batches(ReaderState {
        client,
        retry,
        stream: stream.into(),
        direction: Direction::Forward,
        max_batches,
        page_size,
        position: Position::Forward(from_position),
        batches_yielded: 0,
        first_version_emitted: false,
        done: false,
    })
}

/// Page backward from `from` in `stream`.
pub fn read_backward(
    client: Arc<dyn EventLogClient>,
    retry: Option<RetryPolicy>,
    stream: impl Into<String>,
    from: ReadFrom,
    page_size: usize,
    max_batches: Option<usize>,
) -> impl Stream<Item = Result<ReadBatch, StoreError>> {
    read_batches(ReaderState {
        client,
        retry,
        stream: stream.into(),
        direction: Direction::Backward,
        max_batches,
        page_size,
        position: Position::Backward(from),
        batches_yielded: 0,
        first_version_emitted: false,
        done: false,
    })
}

fn read_batches(state: ReaderState) -> impl Stream<Item = Result<ReadBatch, StoreError>> {
    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        if let Some(max) = state.max_batches {
            if state.batches_yielded >= max {
                state.done = true;
                return Some((
                    Err(StoreError::BatchLimitExceeded {
                        stream: state.stream.clone(),
                        max_batches: max,
                    }),
                    state,
                ));
            }
        }

        let start = Instant::now();
        let stream_name = state.stream.clone();
        let client = Arc::clone(&state.client);
        let position = state.position;
        let page_size = state.page_size;
        let direction = state.direction;
        let retry = state.retry.clone();

        let slice = with_retry(retry.as_ref(), "readAttempt", |_attempt| {
            let client = Arc::clone(&client);
            let stream_name = stream_name.clone();
            async move {
                match position {
                    Position::Forward(from) => {
                        client.read_stream_forward(&stream_name, from, page_size).await
                    }
                    Position::Backward(from) => {
                        client.read_stream_backward(&stream_name, from, page_size).await
                    }
                }
                .map_err(StoreError::transport)
            }
        })
        .await;

        let slice = match slice {
            Ok(s) => s,
            Err(e) => {
                state.done = true;
                return Some((Err(e), state));
            }
        };

        match slice.status {
            SliceStatus::StreamNotFound => {
                state.done = true;
                Some((
                    Ok(ReadBatch {
                        first_batch_version: Some(-1),
                        events: Vec::new(),
                    }),
                    state,
                ))
            }
            SliceStatus::StreamDeleted => {
                state.done = true;
                Some((
                    Err(StoreError::StreamDeleted {
                        stream: state.stream.clone(),
                    }),
                    state,
                ))
            }
            SliceStatus::Success => {
                let elapsed = start.elapsed();
                let bytes: usize = slice.events.iter().map(|e| e.byte_len()).sum();
                let start_pos = match position {
                    Position::Forward(p) => p,
                    Position::Backward(ReadFrom::EventNumber(p)) => p,
                    Position::Backward(ReadFrom::End) => slice.last_event_number,
                };
                metrics::record_slice(&state.stream, direction, bytes, slice.events.len(), elapsed, start_pos);

                let first_batch_version = if state.first_version_emitted {
                    None
                } else {
                    state.first_version_emitted = true;
                    Some(slice.last_event_number)
                };

                state.batches_yielded += 1;
                state.position = match direction {
                    Direction::Forward => Position::Forward(slice.next_event_number),
                    Direction::Backward => Position::Backward(ReadFrom::EventNumber(slice.next_event_number)),
                };
                state.done = slice.is_end_of_stream;

                Some((
                    Ok(ReadBatch {
                        first_batch_version,
                        events: slice.events,
                    }),
                    state,
                ))
            }
        }
    })
}
