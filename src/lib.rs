//! Event-sourced stream storage adapter.
//!
//! Sits between application domain logic and an append-only event log: it
//! loads the current state of an aggregate (a named event stream), lets
//! the caller apply a fold to derive state, and writes new events back
//! under optimistic concurrency — detecting and surfacing version
//! conflicts so the caller can retry.
//!
//! The wire I/O itself is delegated to an injected [`EventLogClient`]; the
//! hard part this crate owns is the [`Token`] algebra (deciding when a
//! compaction/snapshot event keeps reads cheap and which read direction to
//! use next), the paged load protocols, and the conflict-aware sync
//! protocol.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use streamcore::{CategoryBuilder, GatewayBuilder};
//! use streamcore::codec::json::JsonCodec;
//! use streamcore::log_client::MemoryEventLogClient;
//! use streamcore::category::Folder;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! enum CartEvent {
//!     Added { item: String },
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = std::sync::Arc::new(MemoryEventLogClient::new());
//!     let gateway = GatewayBuilder::with_client(client).build();
//!     let category = CategoryBuilder::new(gateway, JsonCodec::<CartEvent>::new("CartEvent"))
//!         .initial(Vec::<String>::new())
//!         .fold(|mut items, e| {
//!             match e {
//!                 CartEvent::Added { item } => items.push(item),
//!             }
//!             items
//!         })
//!         .build();
//!
//!     let (token, state) = category.load("cart-1").await?;
//!     let _ = (token, state);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod category;
pub mod codec;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod log_client;
pub mod metrics;
pub mod reader;
pub mod retry;
pub mod slice;
pub mod token;
pub mod writer;

pub use builder::{CategoryBuilder, GatewayBuilder};
pub use category::{CompactionStrategy, Folder, Resync, SyncResult};
pub use codec::Codec;
pub use error::{LogClientError, StoreError};
pub use gateway::{Gateway, GatewaySyncResult};
pub use log_client::{AppendOutcome, AppendResult, EventLogClient};
pub use retry::RetryPolicy;
pub use slice::{Direction, EncodedEvent, ReadFrom, ResolvedEvent, SliceStatus, StreamSlice};
pub use token::Token;
