use crate::bus::BusEvent;
use crate::history::HistoryEntry;
use crate::request::SharedOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOperation {
    Push,
    Replace,
}

impl HistoryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryOperation::Push => "push",
            HistoryOperation::Replace => "replace",
        }
    }
}

#[derive(Debug)]
pub enum HistoryEvent {
    /// An entry is about to be written; listeners may tag it.
    BuildState(BuildStateEvent),
    /// Native back/forward landed on one of our entries.
    RestoreState(RestoreStateEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryEventKind {
    BuildState,
    RestoreState,
}

impl BusEvent for HistoryEvent {
    type Kind = HistoryEventKind;

    fn kind(&self) -> HistoryEventKind {
        match self {
            HistoryEvent::BuildState(_) => HistoryEventKind::BuildState,
            HistoryEvent::RestoreState(_) => HistoryEventKind::RestoreState,
        }
    }
}

#[derive(Debug)]
pub struct BuildStateEvent {
    pub entry: HistoryEntry,
    pub operation: HistoryOperation,
    /// True for the boot entry replacing the initial document load.
    pub is_initial: bool,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct RestoreStateEvent {
    pub entry: HistoryEntry,
    /// `entry.cursor - previous cursor`; negative means back.
    pub direction: i64,
    pub options: SharedOptions,
}
