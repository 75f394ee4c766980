//! Gateway (component G): glues the loaders, the writer, and the token
//! constructors into the four operations the caller-facing category
//! builds on.

use crate::error::StoreError;
use crate::loader::{self, Loaded};
use crate::log_client::EventLogClient;
use crate::retry::RetryPolicy;
use crate::slice::{EncodedEvent, ResolvedEvent};
use crate::token::Token;
use crate::writer::{self, WriteOutcome};
use std::sync::Arc;

/// A snapshot (compaction-event) predicate, shared between load and sync
/// paths. See [`crate::category::CompactionStrategy`] for how callers
/// configure it.
pub type SnapshotPredicate = dyn Fn(&ResolvedEvent) -> bool + Send + Sync;

/// Outcome of [`Gateway::try_sync`].
pub enum GatewaySyncResult {
    Written(Token),
    Conflict,
}

/// Owns the connection handle (an injected [`EventLogClient`]) and the two
/// retry policies; all fields are read-only after construction, so
/// `Gateway` is safe for concurrent use across streams (spec.md §5).
#[derive(Clone)]
pub struct Gateway {
    client: Arc<dyn EventLogClient>,
    read_retry: Option<RetryPolicy>,
    write_retry: Option<RetryPolicy>,
    /// Page size for physical reads, and the `batchSize` term in the
    /// token headroom formula (spec.md §4.F).
    batch_size: i64,
    max_batches: Option<usize>,
}

impl Gateway {
    pub fn new(client: Arc<dyn EventLogClient>) -> Self {
        Self {
            client,
            read_retry: None,
            write_retry: None,
            batch_size: 500,
            max_batches: None,
        }
    }

    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = Some(policy);
        self
    }

    pub fn with_write_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_retry = Some(policy);
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }

    /// **LoadBatched**: forward from 0.
    pub async fn load_batched(
        &self,
        stream: &str,
        is_snapshot: Option<&SnapshotPredicate>,
    ) -> Result<(Token, Vec<ResolvedEvent>), StoreError> {
        let Loaded { version, events } = loader::load_forwards_from(
            Arc::clone(&self.client),
            self.read_retry.clone(),
            stream,
            0,
            self.batch_size as usize,
            self.max_batches,
        )
        .await?;

        let token = match is_snapshot {
            None => Token::non_compacting(version),
            Some(pred) => match events.iter().rev().find(|e| pred(e)) {
                Some(snapshot) => Token::from_snapshot(snapshot, self.batch_size, version),
                None => Token::uncompacted(self.batch_size, version),
            },
        };
        Ok((token, events))
    }

    /// **LoadBackwardsStoppingAtCompactionEvent**: requires a predicate.
    pub async fn load_backwards_stopping_at_compaction_event(
        &self,
        stream: &str,
        is_snapshot: &SnapshotPredicate,
    ) -> Result<(Token, Vec<ResolvedEvent>), StoreError> {
        let Loaded { version, events } = loader::load_backwards_until_compaction_or_start(
            Arc::clone(&self.client),
            self.read_retry.clone(),
            stream,
            self.batch_size as usize,
            self.max_batches,
            |e| is_snapshot(e),
        )
        .await?;

        let token = match events.first() {
            Some(first) if is_snapshot(first) => Token::from_snapshot(first, self.batch_size, version),
            _ => Token::uncompacted(self.batch_size, version),
        };
        Ok((token, events))
    }

    /// **LoadFromToken**: forward from `token.stream_version + 1`.
    pub async fn load_from_token(
        &self,
        stream: &str,
        token: Token,
        is_snapshot: Option<&SnapshotPredicate>,
    ) -> Result<(Token, Vec<ResolvedEvent>), StoreError> {
        let Loaded { version, events } = loader::load_forwards_from(
            Arc::clone(&self.client),
            self.read_retry.clone(),
            stream,
            token.stream_version + 1,
            self.batch_size as usize,
            self.max_batches,
        )
        .await?;

        let new_token = match is_snapshot {
            None => Token::non_compacting(version),
            Some(pred) => match events.iter().rev().find(|e| pred(e)) {
                Some(snapshot) => Token::from_snapshot(snapshot, self.batch_size, version),
                None => Token::carry_forward(&token, events.len() as i64, self.batch_size, version),
            },
        };
        Ok((new_token, events))
    }

    /// **TrySync**: version-checked append, then constructs the next
    /// token either from the just-written events (rules 1/4/5) — no
    /// re-read of the tail is performed on success.
    pub async fn try_sync(
        &self,
        stream: &str,
        token: Token,
        events: Vec<EncodedEvent>,
        is_snapshot: Option<&SnapshotPredicate>,
    ) -> Result<GatewaySyncResult, StoreError> {
        let written_count = events.len() as i64;
        let outcome = writer::write_events(
            self.client.as_ref(),
            self.write_retry.as_ref(),
            stream,
            token.stream_version,
            events.clone(),
        )
        .await?;

        let result = match outcome {
            WriteOutcome::Conflict => return Ok(GatewaySyncResult::Conflict),
            WriteOutcome::Written(result) => result,
        };
        let new_version = result.next_expected_version;

        let new_token = match is_snapshot {
            None => Token::non_compacting(new_version),
            Some(pred) => {
                // Rule 5 applies only when the *last* event in the just-written
                // batch is a snapshot, not any event within it (spec.md §4.G).
                let last_is_snapshot = events.last().is_some_and(|encoded| {
                    let synthetic = ResolvedEvent {
                        encoded: encoded.clone(),
                        event_number: token.stream_version + written_count,
                        stream_position: None,
                    };
                    pred(&synthetic)
                });
                if last_is_snapshot {
                    Token::from_written_snapshot(
                        token.stream_version,
                        written_count - 1,
                        written_count,
                        self.batch_size,
                        new_version,
                    )
                } else {
                    Token::carry_forward(&token, written_count, self.batch_size, new_version)
                }
            }
        };
        Ok(GatewaySyncResult::Written(new_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_client::MemoryEventLogClient;
    use crate::slice::EncodedEvent;
    use bytes::Bytes;

    fn ev(event_type: &str) -> EncodedEvent {
        EncodedEvent::new(event_type, Bytes::new())
    }

    fn is_snapshot(e: &ResolvedEvent) -> bool {
        e.encoded.event_type == "Snapshot"
    }

    // S1: empty stream load.
    #[tokio::test]
    async fn s1_empty_stream_loads_synthetic_version() {
        let client = Arc::new(MemoryEventLogClient::new());
        let gateway = Gateway::new(client).with_batch_size(10);

        let (token, events) = gateway.load_batched("cart-1", None).await.unwrap();
        assert_eq!(token.stream_version, -1);
        assert_eq!(token.snapshot_event_number, None);
        assert_eq!(token.batch_capacity_limit, None);
        assert!(events.is_empty());
    }

    // S2: append two events from an empty stream.
    #[tokio::test]
    async fn s2_append_to_empty_stream() {
        let client = Arc::new(MemoryEventLogClient::new());
        let gateway = Gateway::new(client).with_batch_size(10);

        let result = gateway
            .try_sync("cart-1", crate::token::Token::non_compacting(-1), vec![ev("Added"), ev("Added")], None)
            .await
            .unwrap();

        match result {
            GatewaySyncResult::Written(token) => {
                assert_eq!(token.stream_version, 1);
                assert_eq!(token.snapshot_event_number, None);
            }
            GatewaySyncResult::Conflict => panic!("expected a successful write"),
        }
    }

    // S3: backward load stops inclusively at the snapshot.
    #[tokio::test]
    async fn s3_backward_load_stops_at_snapshot() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed(
            "cart-1",
            vec![
                ev("E"),
                ev("E"),
                ev("E"),
                ev("E"),
                ev("E"),
                ev("Snapshot"),
                ev("E"),
                ev("E"),
                ev("E"),
            ],
        );
        let gateway = Gateway::new(client).with_batch_size(10);

        let (token, events) = gateway
            .load_backwards_stopping_at_compaction_event("cart-1", &is_snapshot)
            .await
            .unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].encoded.event_type, "Snapshot");
        assert_eq!(events[0].event_number, 5);
        assert_eq!(events.last().unwrap().event_number, 8);
        assert_eq!(token.stream_version, 8);
        assert_eq!(token.snapshot_event_number, Some(5));
        assert_eq!(token.batch_capacity_limit, Some(6));
    }

    // S4: append on top of a compacted token carries the snapshot forward.
    #[tokio::test]
    async fn s4_sync_after_snapshot_carries_forward() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed(
            "cart-1",
            vec![
                ev("E"), ev("E"), ev("E"), ev("E"), ev("E"),
                ev("Snapshot"), ev("E"), ev("E"), ev("E"),
            ],
        );
        let gateway = Gateway::new(Arc::clone(&client)).with_batch_size(10);

        let (token, _) = gateway
            .load_backwards_stopping_at_compaction_event("cart-1", &is_snapshot)
            .await
            .unwrap();

        let result = gateway
            .try_sync("cart-1", token, vec![ev("E")], Some(&is_snapshot))
            .await
            .unwrap();

        match result {
            GatewaySyncResult::Written(new_token) => {
                assert_eq!(new_token.stream_version, 9);
                assert_eq!(new_token.snapshot_event_number, Some(5));
                assert_eq!(new_token.batch_capacity_limit, Some(4));
            }
            GatewaySyncResult::Conflict => panic!("expected a successful write"),
        }
    }

    // S5: a stale token loses the race; LoadFromToken observes the winner.
    #[tokio::test]
    async fn s5_concurrent_sync_one_conflicts_resync_sees_winner() {
        let client = Arc::new(MemoryEventLogClient::new());
        let gateway = Gateway::new(Arc::clone(&client)).with_batch_size(10);

        let (token, _) = gateway.load_batched("cart-1", None).await.unwrap();
        assert_eq!(token.stream_version, -1);

        let winner = gateway
            .try_sync("cart-1", token, vec![ev("E9")], None)
            .await
            .unwrap();
        assert!(matches!(winner, GatewaySyncResult::Written(_)));

        let loser = gateway
            .try_sync("cart-1", token, vec![ev("E9-dup")], None)
            .await
            .unwrap();
        assert!(matches!(loser, GatewaySyncResult::Conflict));

        let (resynced, events) = gateway.load_from_token("cart-1", token, None).await.unwrap();
        assert_eq!(resynced.stream_version, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].encoded.event_type, "E9");
    }

    // Rule 2: a compaction strategy configured, but no snapshot ever
    // written yet — headroom assumes the whole prefix is live.
    #[tokio::test]
    async fn rule2_uncompacted_when_no_snapshot_seen() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed("cart-1", vec![ev("E"), ev("E"), ev("E")]);
        let gateway = Gateway::new(client).with_batch_size(10);

        let (token, _) = gateway.load_batched("cart-1", Some(&is_snapshot)).await.unwrap();
        assert_eq!(token.stream_version, 2);
        assert_eq!(token.snapshot_event_number, None);
        assert_eq!(token.batch_capacity_limit, Some(6)); // max(0, 10 - (2+2))
    }

    // TrySync's rule-5 check is the *last* written event, not any event
    // in the batch: a snapshot anywhere but last still carries forward.
    #[tokio::test]
    async fn try_sync_rule5_only_when_last_written_event_is_snapshot() {
        let client = Arc::new(MemoryEventLogClient::new());
        let gateway = Gateway::new(client).with_batch_size(10);
        let start = crate::token::Token::non_compacting(-1);

        let not_last = gateway
            .try_sync("cart-1", start, vec![ev("Snapshot"), ev("E")], Some(&is_snapshot))
            .await
            .unwrap();
        match not_last {
            GatewaySyncResult::Written(token) => {
                assert_eq!(token.stream_version, 1);
                assert_eq!(token.snapshot_event_number, None); // rule 4, not rule 5
            }
            GatewaySyncResult::Conflict => panic!("expected a successful write"),
        }

        let is_last = gateway
            .try_sync("cart-2", crate::token::Token::non_compacting(-1), vec![ev("E"), ev("Snapshot")], Some(&is_snapshot))
            .await
            .unwrap();
        match is_last {
            GatewaySyncResult::Written(token) => {
                assert_eq!(token.stream_version, 1);
                assert_eq!(token.snapshot_event_number, Some(1)); // rule 5
            }
            GatewaySyncResult::Conflict => panic!("expected a successful write"),
        }
    }

    // LoadFromToken picks rule 3 (reset) when the incremental read
    // crosses a freshly-written snapshot.
    #[tokio::test]
    async fn load_from_token_resets_on_newly_seen_snapshot() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed("cart-1", vec![ev("E"), ev("E")]);
        let gateway = Gateway::new(Arc::clone(&client)).with_batch_size(10);

        let stale_token = crate::token::Token::uncompacted(10, 1);
        client.seed("cart-1", vec![ev("Snapshot")]);

        let (token, events) = gateway
            .load_from_token("cart-1", stale_token, Some(&is_snapshot))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(token.snapshot_event_number, Some(2));
        assert_eq!(token.stream_version, 2);
    }

    // S6: MaxBatches exceeded before end-of-stream fails fatally.
    #[tokio::test]
    async fn s6_max_batches_exceeded_is_fatal() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed("cart-1", vec![ev("E"); 5]);
        let gateway = Gateway::new(client).with_batch_size(2).with_max_batches(1);

        let result = gateway.load_batched("cart-1", None).await;
        assert!(matches!(result, Err(StoreError::BatchLimitExceeded { .. })));
    }
}
