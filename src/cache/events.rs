use crate::bus::BusEvent;
use crate::cache::{Snapshot, StorageTag};
use crate::history::HistoryEntry;
use crate::request::SharedOptions;

#[derive(Debug)]
pub enum CacheEvent {
    /// About to persist a snapshot for a new history entry.
    Store(StoreEvent),
    /// About to look up the snapshot of a popped entry.
    Fetch(FetchEvent),
    /// About to apply a fetched snapshot to the page.
    Restore(RestoreEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEventKind {
    Store,
    Fetch,
    Restore,
}

impl BusEvent for CacheEvent {
    type Kind = CacheEventKind;

    fn kind(&self) -> CacheEventKind {
        match self {
            CacheEvent::Store(_) => CacheEventKind::Store,
            CacheEvent::Fetch(_) => CacheEventKind::Fetch,
            CacheEvent::Restore(_) => CacheEventKind::Restore,
        }
    }
}

#[derive(Debug)]
pub struct StoreEvent {
    pub snapshot: Snapshot,
    pub entry: HistoryEntry,
    pub storage: StorageTag,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct FetchEvent {
    pub entry: HistoryEntry,
    pub storage: StorageTag,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct RestoreEvent {
    /// Listeners may edit the snapshot before it is applied.
    pub snapshot: Snapshot,
    pub entry: HistoryEntry,
    pub options: SharedOptions,
}
