//! In-memory collaborators
//!
//! Stand-ins for the browser: a document, a session history stack and a
//! tab-scoped store. Used by the command-line tool and by tests.

pub mod document;
pub mod history;
pub mod tab_store;

use std::sync::Arc;

use url::Url;

use crate::transport::Transport;
use crate::wire::Collaborators;

pub use document::MemoryDocument;
pub use history::{MemoryHistory, StackEntry};
pub use tab_store::MemoryTabStore;

/// A document, its history stack and its tab store, wired together.
#[derive(Clone)]
pub struct MemoryBrowser {
    pub document: Arc<MemoryDocument>,
    pub history: Arc<MemoryHistory>,
    pub tab_store: Arc<MemoryTabStore>,
}

impl MemoryBrowser {
    pub fn new(location: Url) -> Self {
        Self::with_document(MemoryDocument::new(location))
    }

    pub fn with_document(document: MemoryDocument) -> Self {
        let document = Arc::new(document);
        Self {
            history: Arc::new(MemoryHistory::new(Arc::clone(&document))),
            document,
            tab_store: Arc::new(MemoryTabStore::new()),
        }
    }

    pub fn collaborators(&self, transport: Arc<dyn Transport>) -> Collaborators {
        Collaborators {
            transport,
            document: self.document.clone(),
            native_history: self.history.clone(),
            tab_store: self.tab_store.clone(),
            applier: self.document.clone(),
            scripts: self.document.clone(),
        }
    }
}
