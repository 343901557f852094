use std::sync::Arc;

use tracing::debug;

use crate::cache::Snapshot;
use crate::document::{FragmentApplier, ScriptLoader};
use crate::request::{Orchestrator, Payload, RequestEvent, RequestEventKind};

/// Payload member holding `{fragment id: markup}` updates.
pub const SNIPPETS_FIELD: &str = "snippets";

/// Patches the fragments a successful response carries into the page.
///
/// Attach it before the history tracker: the tracker's `buildState` snapshot
/// must already show the new page.
#[derive(Clone)]
pub struct SnippetUpdater {
    inner: Arc<UpdaterInner>,
}

struct UpdaterInner {
    applier: Arc<dyn FragmentApplier>,
    scripts: Arc<dyn ScriptLoader>,
}

impl SnippetUpdater {
    pub fn attach(
        orchestrator: &Orchestrator,
        applier: Arc<dyn FragmentApplier>,
        scripts: Arc<dyn ScriptLoader>,
    ) -> Self {
        let inner = Arc::new(UpdaterInner { applier, scripts });
        let weak = Arc::downgrade(&inner);
        orchestrator.events().on(RequestEventKind::Success, move |event| {
            if let (Some(inner), RequestEvent::Success(success)) = (weak.upgrade(), event.detail()) {
                inner.update(&success.payload);
            }
        });
        Self { inner }
    }

    /// Apply the payload's snippets. Returns false when it carries none.
    pub fn update(&self, payload: &Payload) -> bool {
        self.inner.update(payload)
    }
}

impl UpdaterInner {
    fn update(&self, payload: &Payload) -> bool {
        let Some(snapshot) = payload.get(SNIPPETS_FIELD).and_then(Snapshot::from_json) else {
            return false;
        };
        if snapshot.is_empty() {
            return false;
        }
        debug!(fragments = snapshot.len(), "applying response snippets");
        self.applier.apply(&snapshot);
        self.scripts.load(&snapshot);
        true
    }
}
