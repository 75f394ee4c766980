//! Builder (component I): constructs a [`Gateway`] and a [`Category`]
//! with a chosen compaction strategy.

use crate::category::{CompactionStrategy, Category};
use crate::codec::Codec;
use crate::log_client::EventLogClient;
use crate::retry::RetryPolicy;
use crate::slice::ResolvedEvent;
use std::sync::Arc;

/// Fluent builder for a [`Gateway`](crate::gateway::Gateway).
#[must_use = "builders do nothing unless you call .build()"]
pub struct GatewayBuilder {
    client: Arc<dyn EventLogClient>,
    read_retry: Option<RetryPolicy>,
    write_retry: Option<RetryPolicy>,
    batch_size: i64,
    max_batches: Option<usize>,
}

impl GatewayBuilder {
    pub fn new(client: impl EventLogClient + 'static) -> Self {
        Self {
            client: Arc::new(client),
            read_retry: None,
            write_retry: None,
            batch_size: 500,
            max_batches: None,
        }
    }

    /// Share an already-`Arc`'d client (e.g. across multiple gateways).
    pub fn with_client(client: Arc<dyn EventLogClient>) -> Self {
        Self {
            client,
            read_retry: None,
            write_retry: None,
            batch_size: 500,
            max_batches: None,
        }
    }

    pub fn read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = Some(policy);
        self
    }

    pub fn write_retry(mut self, policy: RetryPolicy) -> Self {
        self.write_retry = Some(policy);
        self
    }

    /// Page size for physical reads; also the `batchSize` term in the
    /// token headroom formula (spec.md §4.F).
    pub fn batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Cap on pages read per load before failing with
    /// [`crate::error::StoreError::BatchLimitExceeded`].
    pub fn max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }

    pub fn build(self) -> crate::gateway::Gateway {
        let mut gateway = crate::gateway::Gateway::new(self.client).with_batch_size(self.batch_size);
        if let Some(p) = self.read_retry {
            gateway = gateway.with_read_retry(p);
        }
        if let Some(p) = self.write_retry {
            gateway = gateway.with_write_retry(p);
        }
        if let Some(m) = self.max_batches {
            gateway = gateway.with_max_batches(m);
        }
        gateway
    }
}

/// Fluent builder for a [`Category`].
///
/// `fold` and `initial` are the category's fixed construction-time
/// parameters (spec.md §4.I): every `Load`/`TrySync` call threads events
/// through the same fold onto the caller-supplied running state.
#[must_use = "builders do nothing unless you call .build()"]
pub struct CategoryBuilder<C: Codec, S> {
    gateway: crate::gateway::Gateway,
    codec: Arc<C>,
    fold: Option<Arc<dyn Fn(S, C::Event) -> S + Send + Sync>>,
    initial: Option<S>,
    compaction: Option<CompactionStrategy>,
}

impl<C, S> CategoryBuilder<C, S>
where
    C: Codec + 'static,
    C::Event: Clone,
    S: Clone + Send + Sync + 'static,
{
    pub fn new(gateway: crate::gateway::Gateway, codec: C) -> Self {
        Self {
            gateway,
            codec: Arc::new(codec),
            fold: None,
            initial: None,
            compaction: None,
        }
    }

    pub fn fold(mut self, fold: impl Fn(S, C::Event) -> S + Send + Sync + 'static) -> Self {
        self.fold = Some(Arc::new(fold));
        self
    }

    pub fn initial(mut self, initial: S) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Compact whenever an event's type equals `event_type`.
    pub fn compact_on_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.compaction = Some(CompactionStrategy::event_type(event_type));
        self
    }

    /// Compact whenever `predicate` recognizes a resolved event as a
    /// snapshot.
    pub fn compact_on_predicate(
        mut self,
        predicate: impl Fn(&ResolvedEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.compaction = Some(CompactionStrategy::predicate(predicate));
        self
    }

    /// # Panics
    /// If `fold` or `initial` were never set — both are required to
    /// construct a usable category.
    pub fn build(self) -> Category<C, S> {
        let fold = self.fold.expect("CategoryBuilder: fold is required");
        let initial = self.initial.expect("CategoryBuilder: initial is required");
        Category::new(self.gateway, self.codec, fold, initial, self.compaction)
    }
}
