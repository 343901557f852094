//! History tracking
//!
//! Keeps a monotonic cursor in step with the native history stack: pushes
//! raise it by one, replaces keep it, and a native pop sets it to the popped
//! entry's cursor so the difference gives the navigation direction.

pub mod entry;
pub mod events;
pub mod mode;
pub mod native;
pub mod tracker;

pub use entry::{HistoryEntry, SnippetTag, HISTORY_SOURCE};
pub use events::{
    BuildStateEvent, HistoryEvent, HistoryEventKind, HistoryOperation, RestoreStateEvent,
};
pub use mode::HistoryMode;
pub use native::{NativeHistory, PopListener};
pub use tracker::{HistoryTracker, HISTORY_ATTRIBUTE};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("native history already has a tracker attached")]
    AlreadyOwned,
}
