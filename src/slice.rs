//! Wire and read-side data model: encoded events, resolved events, and
//! the paged slice shape returned by the external event-log client.

use bytes::Bytes;

/// An event encoded to its wire representation by the caller's [`Codec`](crate::codec::Codec).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedEvent {
    pub event_type: String,
    pub payload: Bytes,
    pub metadata: Bytes,
}

impl EncodedEvent {
    pub fn new(event_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
            metadata: Bytes::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Bytes reported for metrics: payload + metadata, null counted as zero.
    pub fn byte_len(&self) -> usize {
        self.payload.len() + self.metadata.len()
    }
}

/// An event as read back from the log: the wire event plus its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub encoded: EncodedEvent,
    /// Stream-relative, monotonically increasing from 0.
    pub event_number: i64,
    /// Opaque log-wide position, if the client surfaces one.
    pub stream_position: Option<Bytes>,
}

impl ResolvedEvent {
    pub fn byte_len(&self) -> usize {
        self.encoded.byte_len()
    }
}

/// Direction of a paged read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Starting position for a backward read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadFrom {
    /// A specific event number.
    EventNumber(i64),
    /// The current tail of the stream.
    End,
}

/// Outcome status of a single slice read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceStatus {
    Success,
    StreamNotFound,
    StreamDeleted,
}

/// One page of a stream read.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct StreamSlice {
    pub status: SliceStatus,
    pub events: Vec<ResolvedEvent>,
    pub last_event_number: i64,
    pub next_event_number: i64,
    pub is_end_of_stream: bool,
}

impl StreamSlice {
    /// Synthetic empty slice for a stream that does not exist yet.
    pub fn not_found() -> Self {
        Self {
            status: SliceStatus::StreamNotFound,
            events: Vec::new(),
            last_event_number: -1,
            next_event_number: 0,
            is_end_of_stream: true,
        }
    }
}
