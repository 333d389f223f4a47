//! # simlink
//!
//! Client runtime for a poll-driven simulation engine protocol.
//!
//! Callers declare named variables to read or write. The runtime turns them
//! into engine data definitions and requests, polls for binary records,
//! decodes them against the definition they answer and publishes the values
//! in a change-tracked map.
//!
//! ## Core Concepts
//!
//! - **Definitions**: ordered variable lists, deduplicated by content hash
//! - **Subscriptions**: requests bound to a definition, feeding a [`ChangeDict`]
//! - **Dispatcher**: single-threaded poll loop routing records to receivers
//! - **Transport**: byte-level boundary to the engine
//!
//! ## Example
//!
//! ```ignore
//! use simlink::{ConnectionConfig, MemoryTransport, Revision, SimConnection, SubscribeOptions};
//!
//! let mut sc = SimConnection::open(MemoryTransport::new(), ConnectionConfig::default())?;
//!
//! // One-off read
//! let title = sc.get_datum("TITLE", None, None)?;
//!
//! // Continuous updates
//! let sub = sc.subscribe(&["PLANE ALTITUDE".into()], SubscribeOptions::default())?;
//! let mut seen = Revision::default();
//! while sc.receive(Some(Duration::from_secs(1)))? {
//!     for (name, value) in sub.changed_since(seen) {
//!         println!("{} = {}", name, value);
//!     }
//!     seen = sub.latest();
//! }
//!
//! // Writes and events
//! sc.set_value("KOHLSMAN SETTING HG", 29.92, None)?;
//! sc.send_event("GEAR_TOGGLE", 0)?;
//! ```

pub mod catalog;
pub mod changedict;
pub mod config;
pub mod connection;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-exports
pub use catalog::Catalog;
pub use changedict::{ChangeDict, SimData};
pub use config::ConnectionConfig;
pub use connection::{SimConnection, SubscribeOptions, Subscription, SubscriptionCallback};
pub use definition::{DataDefinition, DatumSpec, DefinitionRegistry, VariableSpec};
pub use dispatch::{Dispatcher, ReceiverId, RecvFilter, ServerInfo};
pub use error::{DecodeError, Result, SimError, TransportError};
pub use events::EventIdMapper;
pub use protocol::{Directive, Message, Recv, RecvId};
pub use transport::{MemoryTransport, Transport};
pub use types::*;
