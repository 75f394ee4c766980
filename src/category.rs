//! Category + Folder (component H): threads a caller's [`Codec`] and fold
//! function through the gateway, exposing the canonical `Load`/`TrySync`
//! shape to the upstream caller façade.

use crate::codec::Codec;
use crate::error::StoreError;
use crate::gateway::{Gateway, GatewaySyncResult};
use crate::slice::{EncodedEvent, ResolvedEvent};
use crate::token::Token;
use async_trait::async_trait;
use std::sync::Arc;

/// How a [`Category`] recognizes a compaction (snapshot) event.
///
/// The core never produces snapshots itself (spec.md §1 Non-goals); it
/// only recognizes ones a caller already wrote, via this predicate.
#[derive(Clone)]
pub enum CompactionStrategy {
    /// Snapshot events are those whose `event_type` equals this string.
    EventType(String),
    /// An arbitrary predicate over the resolved event.
    Predicate(Arc<dyn Fn(&ResolvedEvent) -> bool + Send + Sync>),
}

impl CompactionStrategy {
    pub fn event_type(s: impl Into<String>) -> Self {
        CompactionStrategy::EventType(s.into())
    }

    pub fn predicate(p: impl Fn(&ResolvedEvent) -> bool + Send + Sync + 'static) -> Self {
        CompactionStrategy::Predicate(Arc::new(p))
    }

    fn as_fn(&self) -> Arc<dyn Fn(&ResolvedEvent) -> bool + Send + Sync> {
        match self {
            CompactionStrategy::EventType(s) => {
                let s = s.clone();
                Arc::new(move |e: &ResolvedEvent| e.encoded.event_type == s)
            }
            CompactionStrategy::Predicate(p) => Arc::clone(p),
        }
    }
}

/// Outcome of [`Category::try_sync`] / [`Folder::try_sync`].
pub enum SyncResult<S> {
    Written(Token, S),
    /// The append lost a version race. `resync` is a deferred
    /// continuation re-reading the tail since the presented token and
    /// re-folding onto the caller-provided state — it is not run eagerly,
    /// so an abandoned conflict costs nothing (spec.md §9).
    Conflict(Resync<S>),
}

/// Deferred reload following a [`SyncResult::Conflict`].
pub struct Resync<S> {
    gateway: Gateway,
    predicate: Option<Arc<dyn Fn(&ResolvedEvent) -> bool + Send + Sync>>,
    stream: String,
    token: Token,
    state: S,
    decode_and_fold: Arc<dyn Fn(Vec<ResolvedEvent>, S) -> S + Send + Sync>,
}

impl<S> Resync<S> {
    /// Run the deferred `LoadFromToken` and fold onto the state the
    /// caller held at conflict time.
    pub async fn run(self) -> Result<(Token, S), StoreError> {
        let (token, events) = self
            .gateway
            .load_from_token(&self.stream, self.token, self.predicate.as_deref())
            .await?;
        let state = (self.decode_and_fold)(events, self.state);
        Ok((token, state))
    }
}

/// Wraps a [`Gateway`] with a [`Codec`], a fold function, an initial
/// state, and an optional [`CompactionStrategy`] — the parameters a
/// [`crate::builder::CategoryBuilder`] fixes at construction time. No
/// per-stream state is kept here (spec.md §3); `state` is always supplied
/// by and returned to the caller.
#[derive(Clone)]
pub struct Category<C: Codec, S> {
    gateway: Gateway,
    codec: Arc<C>,
    fold: Arc<dyn Fn(S, C::Event) -> S + Send + Sync>,
    initial: S,
    compaction: Option<CompactionStrategy>,
}

impl<C, S> Category<C, S>
where
    C: Codec + 'static,
    C::Event: Clone,
    S: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        gateway: Gateway,
        codec: Arc<C>,
        fold: Arc<dyn Fn(S, C::Event) -> S + Send + Sync>,
        initial: S,
        compaction: Option<CompactionStrategy>,
    ) -> Self {
        Self {
            gateway,
            codec,
            fold,
            initial,
            compaction,
        }
    }

    fn predicate(&self) -> Option<Arc<dyn Fn(&ResolvedEvent) -> bool + Send + Sync>> {
        self.compaction.as_ref().map(CompactionStrategy::as_fn)
    }

    fn decode_fold(&self, events: Vec<ResolvedEvent>, state: S) -> S {
        events
            .into_iter()
            .filter_map(|resolved| self.codec.try_decode(&resolved))
            .fold(state, |s, e| (self.fold)(s, e))
    }
}

#[async_trait]
impl<C, S> Folder for Category<C, S>
where
    C: Codec + 'static,
    C::Event: Clone + Send,
    S: Clone + Send + Sync + 'static,
{
    type Event = C::Event;
    type State = S;

    /// `Load`: forward-batched, or backward-to-snapshot when a
    /// compaction strategy is configured (spec.md §4.H).
    async fn load(&self, stream: &str) -> Result<(Token, S), StoreError> {
        let predicate = self.predicate();
        let (token, events) = match &predicate {
            Some(pred) => {
                self.gateway
                    .load_backwards_stopping_at_compaction_event(stream, pred.as_ref())
                    .await?
            }
            None => self.gateway.load_batched(stream, None).await?,
        };
        let state = self.decode_fold(events, self.initial.clone());
        Ok((token, state))
    }

    /// `TrySync`: encode, append; on success fold the just-written domain
    /// events onto the caller's state (no re-read); on conflict return a
    /// deferred [`Resync`].
    async fn try_sync(
        &self,
        stream: &str,
        current: (Token, S),
        events: Vec<C::Event>,
    ) -> Result<SyncResult<S>, StoreError> {
        let (token, state) = current;
        let encoded: Vec<EncodedEvent> = events.iter().map(|e| self.codec.encode(e)).collect();
        let predicate = self.predicate();

        let result = self
            .gateway
            .try_sync(stream, token, encoded, predicate.as_deref())
            .await?;

        match result {
            GatewaySyncResult::Written(new_token) => {
                let fold = Arc::clone(&self.fold);
                let new_state = events.into_iter().fold(state, |s, e| fold(s, e));
                Ok(SyncResult::Written(new_token, new_state))
            }
            GatewaySyncResult::Conflict => {
                let codec = Arc::clone(&self.codec);
                let fold = Arc::clone(&self.fold);
                let decode_and_fold: Arc<dyn Fn(Vec<ResolvedEvent>, S) -> S + Send + Sync> =
                    Arc::new(move |resolved, state| {
                        resolved
                            .into_iter()
                            .filter_map(|r| codec.try_decode(&r))
                            .fold(state, |s, e| fold(s, e))
                    });
                Ok(SyncResult::Conflict(Resync {
                    gateway: self.gateway.clone(),
                    predicate,
                    stream: stream.to_string(),
                    token,
                    state,
                    decode_and_fold,
                }))
            }
        }
    }
}

/// Upstream-facing contract (spec.md §6 `ICategory`): codec-agnostic
/// `Load`/`TrySync` over a fixed `Event`/`State` pair, so caller
/// orchestration (the `Stream` façade that loops conflict/retry,
/// out of scope here) can depend on it without naming the concrete codec.
#[async_trait]
pub trait Folder: Send + Sync {
    type Event;
    type State: Clone + Send;

    async fn load(&self, stream: &str) -> Result<(Token, Self::State), StoreError>;

    async fn try_sync(
        &self,
        stream: &str,
        current: (Token, Self::State),
        events: Vec<Self::Event>,
    ) -> Result<SyncResult<Self::State>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use crate::log_client::MemoryEventLogClient;

    #[derive(Clone, Debug, PartialEq)]
    enum CartEvent {
        Added(String),
        Removed(String),
        Snapshot(Vec<String>),
    }

    struct CartCodec;

    impl Codec for CartCodec {
        type Event = CartEvent;

        fn encode(&self, event: &CartEvent) -> EncodedEvent {
            match event {
                CartEvent::Added(item) => EncodedEvent::new("Added", item.clone().into_bytes()),
                CartEvent::Removed(item) => EncodedEvent::new("Removed", item.clone().into_bytes()),
                CartEvent::Snapshot(items) => {
                    EncodedEvent::new("Snapshot", items.join(",").into_bytes())
                }
            }
        }

        fn try_decode(&self, resolved: &ResolvedEvent) -> Option<CartEvent> {
            let payload = std::str::from_utf8(&resolved.encoded.payload).ok()?.to_string();
            match resolved.encoded.event_type.as_str() {
                "Added" => Some(CartEvent::Added(payload)),
                "Removed" => Some(CartEvent::Removed(payload)),
                "Snapshot" => Some(CartEvent::Snapshot(
                    payload.split(',').filter(|s| !s.is_empty()).map(String::from).collect(),
                )),
                // Unknown event types are silently dropped (spec's forward-compatibility contract).
                _ => None,
            }
        }
    }

    fn fold(mut items: Vec<String>, event: CartEvent) -> Vec<String> {
        match event {
            CartEvent::Added(item) => items.push(item),
            CartEvent::Removed(item) => items.retain(|i| i != &item),
            CartEvent::Snapshot(items_snapshot) => items = items_snapshot,
        }
        items
    }

    fn category(gateway: Gateway) -> Category<CartCodec, Vec<String>> {
        crate::builder::CategoryBuilder::new(gateway, CartCodec)
            .initial(Vec::new())
            .fold(fold)
            .build()
    }

    fn compacted_category(gateway: Gateway) -> Category<CartCodec, Vec<String>> {
        crate::builder::CategoryBuilder::new(gateway, CartCodec)
            .initial(Vec::new())
            .fold(fold)
            .compact_on_event_type("Snapshot")
            .build()
    }

    // Property 1: round-trip.
    #[tokio::test]
    async fn round_trip_append_then_load() {
        let gateway = Gateway::new(Arc::new(MemoryEventLogClient::new()));
        let cat = category(gateway);

        let (token, state) = cat.load("cart-1").await.unwrap();
        assert_eq!(token.stream_version, -1);
        assert_eq!(state, Vec::<String>::new());

        let sync = cat
            .try_sync("cart-1", (token, state), vec![CartEvent::Added("a".into())])
            .await
            .unwrap();
        let (token, state) = match sync {
            SyncResult::Written(t, s) => (t, s),
            SyncResult::Conflict(_) => panic!("expected a successful write"),
        };
        assert_eq!(state, vec!["a".to_string()]);

        let (reloaded_token, reloaded_state) = cat.load("cart-1").await.unwrap();
        assert_eq!(reloaded_token.stream_version, token.stream_version);
        assert_eq!(reloaded_state, state);
    }

    // Property 2: version monotonicity across successive syncs.
    #[tokio::test]
    async fn version_increases_by_event_count_each_sync() {
        let gateway = Gateway::new(Arc::new(MemoryEventLogClient::new()));
        let cat = category(gateway);

        let (token, state) = cat.load("cart-1").await.unwrap();
        let SyncResult::Written(token, state) = cat
            .try_sync(
                "cart-1",
                (token, state),
                vec![CartEvent::Added("a".into()), CartEvent::Added("b".into())],
            )
            .await
            .unwrap()
        else {
            panic!("expected a successful write")
        };
        assert_eq!(token.stream_version, 1);

        let SyncResult::Written(token, _) = cat
            .try_sync("cart-1", (token, state), vec![CartEvent::Added("c".into())])
            .await
            .unwrap()
        else {
            panic!("expected a successful write")
        };
        assert_eq!(token.stream_version, 2);
    }

    // Property 3 / S5: exactly one of two concurrent syncs wins; the
    // loser's resync observes the winner's events.
    #[tokio::test]
    async fn conflict_resync_observes_winners_events() {
        let client = Arc::new(MemoryEventLogClient::new());
        let gateway = Gateway::new(Arc::clone(&client));
        let cat = category(gateway);

        let (token, state) = cat.load("cart-1").await.unwrap();

        let winner = cat
            .try_sync("cart-1", (token, state.clone()), vec![CartEvent::Added("a".into())])
            .await
            .unwrap();
        assert!(matches!(winner, SyncResult::Written(_, _)));

        let loser = cat
            .try_sync("cart-1", (token, state), vec![CartEvent::Added("b".into())])
            .await
            .unwrap();
        let resync = match loser {
            SyncResult::Conflict(resync) => resync,
            SyncResult::Written(_, _) => panic!("expected a conflict"),
        };

        let (resynced_token, resynced_state) = resync.run().await.unwrap();
        assert_eq!(resynced_token.stream_version, 0);
        assert_eq!(resynced_state, vec!["a".to_string()]);
    }

    // Property 6: an event type the codec doesn't recognize is silently
    // dropped before folding, never surfaced to `fold`.
    #[tokio::test]
    async fn unknown_event_type_is_skipped_by_fold() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed(
            "cart-1",
            vec![
                EncodedEvent::new("Added", b"a".to_vec()),
                EncodedEvent::new("SomeFutureEventType", b"unreadable".to_vec()),
                EncodedEvent::new("Added", b"c".to_vec()),
            ],
        );
        let gateway = Gateway::new(client);
        let cat = category(gateway);

        let (_token, state) = cat.load("cart-1").await.unwrap();
        assert_eq!(state, vec!["a".to_string(), "c".to_string()]);
    }

    // Snapshot stop (S3 at the category level): a backward load with a
    // compaction strategy returns events from the snapshot (inclusive)
    // onward, and the fold replaces state rather than replaying history.
    #[tokio::test]
    async fn compacted_load_stops_at_snapshot() {
        let client = Arc::new(MemoryEventLogClient::new());
        client.seed(
            "cart-1",
            vec![
                EncodedEvent::new("Added", b"a".to_vec()),
                EncodedEvent::new("Removed", b"a".to_vec()),
                EncodedEvent::new("Snapshot", b"x,y".to_vec()),
                EncodedEvent::new("Added", b"z".to_vec()),
            ],
        );
        let gateway = Gateway::new(client).with_batch_size(10);
        let cat = compacted_category(gateway);

        let (token, state) = cat.load("cart-1").await.unwrap();
        assert_eq!(token.snapshot_event_number, Some(2));
        assert_eq!(state, vec!["x".to_string(), "y".to_string(), "z".to_string()]);
    }
}
