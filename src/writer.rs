//! Write primitive (component B): version-checked append.

use crate::error::StoreError;
use crate::log_client::{AppendOutcome, AppendResult, EventLogClient};
use crate::metrics::{self, OperationMetric};
use crate::retry::{with_retry, RetryPolicy};
use crate::slice::EncodedEvent;
use std::time::Instant;

/// Outcome of [`write_events`]: either the append landed, or the stream's
/// actual version no longer matched `expected_version` — an expected
/// outcome, not an error (spec.md §7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(AppendResult),
    Conflict,
}

/// Version-checked append (component B).
///
/// Bytes reported for metrics are `len(payload) + len(metadata)` summed
/// across `events`. Any transport fault other than "wrong expected
/// version" propagates as [`StoreError::Transport`].
pub async fn write_events(
    client: &dyn EventLogClient,
    retry: Option<&RetryPolicy>,
    stream: &str,
    expected_version: i64,
    events: Vec<EncodedEvent>,
) -> Result<WriteOutcome, StoreError> {
    let bytes: usize = events.iter().map(|e| e.byte_len()).sum();
    let count = events.len();

    let start = Instant::now();
    let outcome = with_retry(retry, "writeAttempt", |_attempt| {
        let events = events.clone();
        async move {
            client
                .append_to_stream(stream, expected_version, events)
                .await
                .map_err(StoreError::transport)
        }
    })
    .await?;
    let elapsed = start.elapsed();

    match outcome {
        AppendOutcome::Written(result) => {
            metrics::record_write(
                stream,
                OperationMetric::WriteSuccess,
                bytes,
                count,
                elapsed,
                expected_version,
                Some(result.next_expected_version),
                result.log_position,
            );
            Ok(WriteOutcome::Written(result))
        }
        AppendOutcome::WrongExpectedVersion => {
            // Expected outcome: information level, not an error.
            metrics::record_write(
                stream,
                OperationMetric::WriteConflict,
                bytes,
                count,
                elapsed,
                expected_version,
                None,
                None,
            );
            Ok(WriteOutcome::Conflict)
        }
    }
}
