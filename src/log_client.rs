//! The external physical event-log client contract.
//!
//! This crate never talks to a log server directly; every physical read or
//! write goes through an injected [`EventLogClient`]. Wire I/O, retries at
//! the transport level, and authentication are the client implementation's
//! concern, not this crate's.

use crate::error::LogClientError;
use crate::slice::{EncodedEvent, ReadFrom, StreamSlice};
use async_trait::async_trait;

/// Outcome of a successful append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppendResult {
    /// Stream version after this append.
    pub next_expected_version: i64,
    /// Opaque log-wide position of the last appended event, if the client
    /// surfaces one.
    pub log_position: Option<i64>,
}

/// Result of an append attempt: either it was written, or it was rejected
/// because `expected_version` no longer matched the stream's actual
/// version (an expected outcome, not an error — see [`crate::error`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Written(AppendResult),
    WrongExpectedVersion,
}

/// The physical event-log collaborator.
///
/// Implementations own the wire protocol (HTTP, gRPC, an embedded store,
/// whatever) and surface faults as `LogClientError`; this crate interprets
/// only the specific "wrong expected version" outcome, via
/// [`AppendOutcome`].
#[async_trait]
pub trait EventLogClient: Send + Sync {
    async fn append_to_stream(
        &self,
        stream: &str,
        expected_version: i64,
        events: Vec<EncodedEvent>,
    ) -> Result<AppendOutcome, LogClientError>;

    async fn read_stream_forward(
        &self,
        stream: &str,
        from: i64,
        count: usize,
    ) -> Result<StreamSlice, LogClientError>;

    async fn read_stream_backward(
        &self,
        stream: &str,
        from: ReadFrom,
        count: usize,
    ) -> Result<StreamSlice, LogClientError>;
}

pub use memory::MemoryEventLogClient;

mod memory {
    use super::*;
    use crate::slice::{ResolvedEvent, SliceStatus};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory [`EventLogClient`] test double.
    ///
    /// Not a production implementation: streams live entirely in a
    /// `Mutex<HashMap<..>>` with no persistence. Used by this crate's own
    /// scenario tests, and available to downstream crates for exercising
    /// [`crate::category::Category`] without a real log server.
    #[derive(Default)]
    pub struct MemoryEventLogClient {
        streams: Mutex<HashMap<String, Vec<EncodedEvent>>>,
    }

    impl MemoryEventLogClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a stream with events at construction time, bypassing
        /// `append_to_stream`'s version check.
        pub fn seed(&self, stream: &str, events: Vec<EncodedEvent>) {
            self.streams
                .lock()
                .unwrap()
                .entry(stream.to_string())
                .or_default()
                .extend(events);
        }

        fn resolved(stream_events: &[EncodedEvent], from: usize, count: usize) -> Vec<ResolvedEvent> {
            stream_events
                .iter()
                .enumerate()
                .skip(from)
                .take(count)
                .map(|(i, e)| ResolvedEvent {
                    encoded: e.clone(),
                    event_number: i as i64,
                    stream_position: None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl EventLogClient for MemoryEventLogClient {
        async fn append_to_stream(
            &self,
            stream: &str,
            expected_version: i64,
            events: Vec<EncodedEvent>,
        ) -> Result<AppendOutcome, LogClientError> {
            let mut streams = self.streams.lock().unwrap();
            let entry = streams.entry(stream.to_string()).or_default();
            let actual_version = entry.len() as i64 - 1;
            if actual_version != expected_version {
                return Ok(AppendOutcome::WrongExpectedVersion);
            }
            entry.extend(events);
            let next_expected_version = entry.len() as i64 - 1;
            Ok(AppendOutcome::Written(AppendResult {
                next_expected_version,
                log_position: Some(next_expected_version),
            }))
        }

        async fn read_stream_forward(
            &self,
            stream: &str,
            from: i64,
            count: usize,
        ) -> Result<StreamSlice, LogClientError> {
            let streams = self.streams.lock().unwrap();
            let Some(events) = streams.get(stream) else {
                return Ok(StreamSlice::not_found());
            };
            if events.is_empty() {
                return Ok(StreamSlice::not_found());
            }
            let from = from.max(0) as usize;
            let last_event_number = events.len() as i64 - 1;
            let page = Self::resolved(events, from, count);
            let next_event_number = from as i64 + page.len() as i64;
            Ok(StreamSlice {
                status: SliceStatus::Success,
                events: page,
                last_event_number,
                next_event_number,
                is_end_of_stream: next_event_number > last_event_number,
            })
        }

        async fn read_stream_backward(
            &self,
            stream: &str,
            from: ReadFrom,
            count: usize,
        ) -> Result<StreamSlice, LogClientError> {
            let streams = self.streams.lock().unwrap();
            let Some(events) = streams.get(stream) else {
                return Ok(StreamSlice::not_found());
            };
            if events.is_empty() {
                return Ok(StreamSlice::not_found());
            }
            let last_event_number = events.len() as i64 - 1;
            let start = match from {
                ReadFrom::End => last_event_number,
                ReadFrom::EventNumber(n) => n,
            };
            if start < 0 {
                return Ok(StreamSlice {
                    status: SliceStatus::Success,
                    events: Vec::new(),
                    last_event_number,
                    next_event_number: -1,
                    is_end_of_stream: true,
                });
            }
            let first = start.saturating_sub(count as i64 - 1).max(0) as usize;
            let mut page = Self::resolved(events, first, start as usize - first + 1);
            page.reverse();
            let next_event_number = first as i64 - 1;
            Ok(StreamSlice {
                status: SliceStatus::Success,
                events: page,
                last_event_number,
                next_event_number,
                is_end_of_stream: next_event_number < 0,
            })
        }
    }
}
