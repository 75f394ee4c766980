//! Error types for the stream storage adapter.

use thiserror::Error;

/// Error surfaced by the external [`EventLogClient`](crate::log_client::EventLogClient).
///
/// Opaque by design: this crate depends only on the client's contract, not
/// on any concrete implementation, so its error type is boxed at the
/// boundary.
pub type LogClientError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal errors from the core's load/sync protocols.
///
/// `Conflict` on append is deliberately **not** a variant here: it is an
/// expected, non-error outcome represented on the relevant result types
/// instead (see [`crate::writer::WriteOutcome`]).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stream deleted: {stream}")]
    StreamDeleted { stream: String },

    #[error("batch limit exceeded reading {stream} (max_batches={max_batches})")]
    BatchLimitExceeded { stream: String, max_batches: usize },

    #[error("batch stream for {stream} terminated without reporting a version")]
    MissingVersion { stream: String },

    #[error("transport error: {0}")]
    Transport(#[source] LogClientError),
}

impl StoreError {
    pub fn transport(err: impl Into<LogClientError>) -> Self {
        StoreError::Transport(err.into())
    }
}
