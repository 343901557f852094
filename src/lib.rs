//! Partial-page navigation orchestrator.
//!
//! Issues one asynchronous request per interaction, narrates its lifecycle
//! over typed event buses, mirrors outcomes into native history and caches
//! page fragments per history entry so back/forward navigation can restore
//! them without a network round-trip.

pub mod bus;
pub mod cache;
pub mod config;
pub mod document;
pub mod extensions;
pub mod history;
pub mod interaction;
pub mod memory;
pub mod redirect;
pub mod request;
pub mod transport;
pub mod util;
pub mod wire;

pub use bus::{BusEvent, Event, EventBus, ListenerId};
pub use cache::{
    CacheError, CacheKey, Snapshot, SnippetCache, SnippetUpdater, StorageKind, StorageTag,
};
pub use config::{Config, ConfigError};
pub use document::{Document, Fragment, FragmentApplier, ScriptLoader};
pub use extensions::{AbortRegistry, UniqueKey, UniqueRequests};
pub use history::{HistoryEntry, HistoryError, HistoryMode, HistoryTracker, NativeHistory};
pub use interaction::{Element, InteractionDispatcher, InteractionError};
pub use memory::MemoryBrowser;
pub use redirect::RedirectFollower;
pub use request::{Options, Orchestrator, Payload, RequestData, RequestError};
pub use transport::{HttpTransport, MockTransport, Transport, TransportError};
pub use wire::{Collaborators, Pagewire};
