//! Stream token algebra (component F).
//!
//! A [`Token`] is the opaque value a caller holds between a load and the
//! next sync: it carries the stream version plus enough compaction
//! bookkeeping to decide, on the next load, whether a forward or a
//! backward-to-snapshot read is cheaper, and whether the next write should
//! carry a fresh snapshot event.

use crate::slice::ResolvedEvent;

/// Opaque handle returned on load, re-presented on sync.
///
/// Immutable: every state transition in this module produces a new value
/// rather than mutating one in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    /// Highest event number observed or written. `-1` denotes an empty
    /// stream.
    pub stream_version: i64,
    /// Event number of the most recent in-stream snapshot, if known.
    pub snapshot_event_number: Option<i64>,
    /// Headroom: events that may be appended before the next snapshot is
    /// advisable. `None` iff no compaction strategy is configured.
    pub batch_capacity_limit: Option<i64>,
}

impl Token {
    /// Rule 1: non-compacting. Used whenever no compaction predicate is
    /// configured.
    pub fn non_compacting(stream_version: i64) -> Self {
        Self {
            stream_version,
            snapshot_event_number: None,
            batch_capacity_limit: None,
        }
    }

    /// Rule 2: uncompacted, but a compaction strategy is configured and no
    /// snapshot has ever been observed — assume the whole prefix is live.
    pub fn uncompacted(batch_size: i64, stream_version: i64) -> Self {
        Self {
            stream_version,
            snapshot_event_number: None,
            batch_capacity_limit: Some(headroom(batch_size, 0, stream_version, None)),
        }
    }

    /// Rule 3: token built from an observed snapshot [`ResolvedEvent`].
    pub fn from_snapshot(snapshot: &ResolvedEvent, batch_size: i64, stream_version: i64) -> Self {
        let snapshot_event_number = snapshot.event_number;
        Self {
            stream_version,
            snapshot_event_number: Some(snapshot_event_number),
            batch_capacity_limit: Some(headroom(
                batch_size,
                0,
                stream_version,
                Some(snapshot_event_number),
            )),
        }
    }

    /// Rule 4: carry forward from a previous token plus the events just
    /// read or written on top of it.
    pub fn carry_forward(prev: &Token, added_count: i64, batch_size: i64, new_version: i64) -> Self {
        Self {
            stream_version: new_version,
            snapshot_event_number: prev.snapshot_event_number,
            batch_capacity_limit: Some(headroom(
                batch_size,
                added_count,
                new_version,
                prev.snapshot_event_number,
            )),
        }
    }

    /// Rule 5: token for a snapshot event about to be written as part of
    /// the current batch.
    pub fn from_written_snapshot(
        prev_stream_version: i64,
        snapshot_index_within_written_batch: i64,
        _written_count: i64,
        batch_size: i64,
        new_version: i64,
    ) -> Self {
        let snapshot_event_number = prev_stream_version + 1 + snapshot_index_within_written_batch;
        Self {
            stream_version: new_version,
            snapshot_event_number: Some(snapshot_event_number),
            batch_capacity_limit: Some(headroom(
                batch_size,
                0,
                new_version,
                Some(snapshot_event_number),
            )),
        }
    }
}

/// `headroom = max(0, batchSize − unstoredEventsPending − (streamVersion − snapshotEventNumber + 1))`
///
/// `snapshot_event_number = None` is treated as `-1`, matching rule 2 (the
/// subtracted term becomes `streamVersion + 2`).
fn headroom(
    batch_size: i64,
    unstored_events_pending: i64,
    stream_version: i64,
    snapshot_event_number: Option<i64>,
) -> i64 {
    let snapshot_event_number = snapshot_event_number.unwrap_or(-1);
    let consumed = unstored_events_pending + (stream_version - snapshot_event_number + 1);
    (batch_size - consumed).max(0)
}
