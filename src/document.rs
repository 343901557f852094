//! Document-side collaborators
//!
//! The core never touches a DOM. It asks a [`Document`] for the current
//! location and fragments, and hands restored snapshots to a
//! [`FragmentApplier`] and a [`ScriptLoader`].

use url::Url;

use crate::cache::Snapshot;

/// A named, independently replaceable region of page markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub id: String,
    pub markup: String,
    /// False for fragments flagged as non-cacheable.
    pub cacheable: bool,
}

impl Fragment {
    pub fn new(id: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            markup: markup.into(),
            cacheable: true,
        }
    }

    pub fn uncacheable(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

pub trait Document: Send + Sync {
    /// Current document location; relative request URLs resolve against it.
    fn location(&self) -> Url;

    /// Whether the document has finished parsing.
    fn is_interactive(&self) -> bool;

    /// Fragments currently on the page, in document order.
    fn fragments(&self) -> Vec<Fragment>;

    /// Hand navigation to the browser (full page load).
    fn assign(&self, url: &Url);
}

/// Patches restored fragments into the page.
pub trait FragmentApplier: Send + Sync {
    fn apply(&self, snapshot: &Snapshot);
}

/// Runs executable content embedded in restored fragments.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, snapshot: &Snapshot);
}
