//! Domain event &lt;-&gt; wire bytes codec contract.

use crate::slice::{EncodedEvent, ResolvedEvent};

/// Maps domain events to and from their wire representation.
///
/// `try_decode` returning `None` is the forward-compatibility contract:
/// an event type the codec doesn't recognize is silently dropped by the
/// [`crate::category::Category`] fold, never surfaced as an error. This is
/// required behavior, not a bug — it lets old readers tolerate event types
/// introduced after they were built.
pub trait Codec: Send + Sync {
    type Event;

    fn encode(&self, event: &Self::Event) -> EncodedEvent;

    fn try_decode(&self, resolved: &ResolvedEvent) -> Option<Self::Event>;
}

/// Example JSON codec, shipped behind the `json` feature to demonstrate
/// [`Codec`] without forcing a serialization format on every user.
#[cfg(feature = "json")]
pub mod json {
    use super::*;
    use bytes::Bytes;
    use serde::{de::DeserializeOwned, Serialize};
    use std::marker::PhantomData;

    /// A [`Codec`] that tags events by `std::any::type_name` of the event
    /// enum and serializes the payload as JSON.
    ///
    /// Intended for single-event-type streams or an externally-tagged
    /// `enum` whose variant carries its own discriminant in the payload;
    /// callers needing per-variant `event_type` strings should implement
    /// [`Codec`] directly instead.
    pub struct JsonCodec<E> {
        event_type: String,
        _marker: PhantomData<E>,
    }

    impl<E> JsonCodec<E> {
        pub fn new(event_type: impl Into<String>) -> Self {
            Self {
                event_type: event_type.into(),
                _marker: PhantomData,
            }
        }
    }

    impl<E> Codec for JsonCodec<E>
    where
        E: Serialize + DeserializeOwned + Send + Sync,
    {
        type Event = E;

        fn encode(&self, event: &E) -> EncodedEvent {
            let payload = serde_json::to_vec(event).expect("JsonCodec: event must serialize");
            EncodedEvent::new(self.event_type.clone(), Bytes::from(payload))
        }

        fn try_decode(&self, resolved: &ResolvedEvent) -> Option<E> {
            if resolved.encoded.event_type != self.event_type {
                return None;
            }
            serde_json::from_slice(&resolved.encoded.payload).ok()
        }
    }
}
