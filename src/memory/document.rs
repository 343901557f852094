use parking_lot::Mutex;
use url::Url;

use crate::cache::Snapshot;
use crate::document::{Document, Fragment, FragmentApplier, ScriptLoader};

/// In-memory document: a location plus an ordered list of fragments.
///
/// Also acts as fragment applier and script loader, recording what it was
/// handed so callers can inspect it afterwards.
pub struct MemoryDocument {
    state: Mutex<DocumentState>,
}

struct DocumentState {
    location: Url,
    interactive: bool,
    fragments: Vec<Fragment>,
    assigned: Vec<Url>,
    applied: Vec<Snapshot>,
    script_loads: usize,
}

impl MemoryDocument {
    /// An interactive document at `location`.
    pub fn new(location: Url) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                location,
                interactive: true,
                fragments: Vec::new(),
                assigned: Vec::new(),
                applied: Vec::new(),
                script_loads: 0,
            }),
        }
    }

    /// A document that is still parsing.
    pub fn loading(location: Url) -> Self {
        let document = Self::new(location);
        document.set_interactive(false);
        document
    }

    pub fn with_fragment(self, fragment: Fragment) -> Self {
        self.state.lock().fragments.push(fragment);
        self
    }

    pub fn set_location(&self, location: Url) {
        self.state.lock().location = location;
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.state.lock().interactive = interactive;
    }

    /// Replace a fragment's markup, appending it when absent.
    pub fn set_fragment(&self, id: &str, markup: &str) {
        let mut state = self.state.lock();
        match state.fragments.iter_mut().find(|fragment| fragment.id == id) {
            Some(fragment) => fragment.markup = markup.to_string(),
            None => state.fragments.push(Fragment::new(id, markup)),
        }
    }

    pub fn fragment(&self, id: &str) -> Option<String> {
        self.state
            .lock()
            .fragments
            .iter()
            .find(|fragment| fragment.id == id)
            .map(|fragment| fragment.markup.clone())
    }

    /// URLs handed to [`Document::assign`].
    pub fn assigned(&self) -> Vec<Url> {
        self.state.lock().assigned.clone()
    }

    /// Snapshots handed to [`FragmentApplier::apply`].
    pub fn applied(&self) -> Vec<Snapshot> {
        self.state.lock().applied.clone()
    }

    pub fn script_loads(&self) -> usize {
        self.state.lock().script_loads
    }
}

impl Document for MemoryDocument {
    fn location(&self) -> Url {
        self.state.lock().location.clone()
    }

    fn is_interactive(&self) -> bool {
        self.state.lock().interactive
    }

    fn fragments(&self) -> Vec<Fragment> {
        self.state.lock().fragments.clone()
    }

    fn assign(&self, url: &Url) {
        let mut state = self.state.lock();
        state.assigned.push(url.clone());
        state.location = url.clone();
    }
}

impl FragmentApplier for MemoryDocument {
    fn apply(&self, snapshot: &Snapshot) {
        for (id, markup) in snapshot.iter() {
            self.set_fragment(id, markup);
        }
        self.state.lock().applied.push(snapshot.clone());
    }
}

impl ScriptLoader for MemoryDocument {
    fn load(&self, _snapshot: &Snapshot) {
        self.state.lock().script_loads += 1;
    }
}
