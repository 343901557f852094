use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::extensions::UniqueKey;
use crate::interaction::{InteractionDispatcher, InteractionEvent, InteractionEventKind};
use crate::request::{
    resolve_layers, CompleteEvent, Orchestrator, RequestEvent, RequestEventKind, RequestId,
    StartEvent,
};

/// Element attribute naming the uniqueness key, or `off`.
pub const UNIQUE_ATTRIBUTE: &str = "data-wire-unique";

/// Keeps at most one in-flight request per uniqueness key; a newer request
/// aborts the older one.
#[derive(Clone)]
pub struct UniqueRequests {
    inner: Arc<UniqueInner>,
}

#[derive(Default)]
struct UniqueInner {
    in_flight: Mutex<HashMap<String, (RequestId, CancellationToken)>>,
}

impl UniqueRequests {
    pub fn attach(orchestrator: &Orchestrator) -> Self {
        let inner = Arc::new(UniqueInner::default());
        let weak = Arc::downgrade(&inner);
        orchestrator.events().on(RequestEventKind::Start, {
            let weak = weak.clone();
            move |event| {
                if let (Some(inner), RequestEvent::Start(start)) = (weak.upgrade(), event.detail()) {
                    inner.on_start(start);
                }
            }
        });
        orchestrator.events().on(RequestEventKind::Complete, move |event| {
            if let (Some(inner), RequestEvent::Complete(complete)) = (weak.upgrade(), event.detail()) {
                inner.on_complete(complete);
            }
        });
        Self { inner }
    }

    /// Number of keys with a request in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Copy the uniqueness attribute of interacting elements into their options.
    pub fn configure_from(&self, dispatcher: &InteractionDispatcher) {
        dispatcher
            .events()
            .on(InteractionEventKind::Interaction, |event| {
                let InteractionEvent::Interaction(interaction) = event.detail();
                let (element, form) = interaction.element.configured(UNIQUE_ATTRIBUTE);
                let mut options = interaction.options.lock();
                options.unique = resolve_layers(
                    options.unique.take(),
                    element.map(UniqueKey::parse),
                    form.map(UniqueKey::parse),
                );
            });
    }
}

impl UniqueInner {
    fn on_start(&self, start: &StartEvent) {
        let UniqueKey::Key(key) = start.options.lock().unique_key() else {
            return;
        };
        let previous = self
            .in_flight
            .lock()
            .insert(key.clone(), (start.request.id, start.cancellation.clone()));
        if let Some((id, token)) = previous {
            debug!(%id, %key, "aborting superseded request");
            token.cancel();
        }
    }

    fn on_complete(&self, complete: &CompleteEvent) {
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|_, (id, _)| *id != complete.request.id);
    }
}
