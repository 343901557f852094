use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::extensions::parse_flag;
use crate::interaction::{InteractionDispatcher, InteractionEvent, InteractionEventKind};
use crate::request::{resolve_layers, Orchestrator, RequestEvent, RequestEventKind, RequestId};

/// Element attribute opting a request out of [`AbortRegistry::abort_all`].
pub const ABORT_ATTRIBUTE: &str = "data-wire-abort";

/// Tracks abortable in-flight requests so they can be cancelled together,
/// e.g. when the user presses Escape.
#[derive(Clone)]
pub struct AbortRegistry {
    inner: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
}

impl AbortRegistry {
    pub fn attach(orchestrator: &Orchestrator) -> Self {
        let inner = Arc::new(Mutex::new(HashMap::new()));
        let weak = Arc::downgrade(&inner);
        orchestrator.events().on(RequestEventKind::Start, {
            let weak = weak.clone();
            move |event| {
                let (Some(in_flight), RequestEvent::Start(start)) = (weak.upgrade(), event.detail())
                else {
                    return;
                };
                if start.options.lock().is_abortable() {
                    in_flight
                        .lock()
                        .insert(start.request.id, start.cancellation.clone());
                }
            }
        });
        orchestrator.events().on(RequestEventKind::Complete, move |event| {
            if let (Some(in_flight), RequestEvent::Complete(complete)) =
                (weak.upgrade(), event.detail())
            {
                in_flight.lock().remove(&complete.request.id);
            }
        });
        Self { inner }
    }

    /// Cancel every abortable request in flight. Returns how many were cancelled.
    pub fn abort_all(&self) -> usize {
        let tokens: Vec<CancellationToken> = self.inner.lock().values().cloned().collect();
        for token in &tokens {
            token.cancel();
        }
        if !tokens.is_empty() {
            debug!(count = tokens.len(), "aborting in-flight requests");
        }
        tokens.len()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock().len()
    }

    /// Copy the abort attribute of interacting elements into their options.
    pub fn configure_from(&self, dispatcher: &InteractionDispatcher) {
        dispatcher
            .events()
            .on(InteractionEventKind::Interaction, |event| {
                let InteractionEvent::Interaction(interaction) = event.detail();
                let (element, form) = interaction.element.configured(ABORT_ATTRIBUTE);
                let mut options = interaction.options.lock();
                options.abort = resolve_layers(
                    options.abort,
                    element.map(parse_flag),
                    form.map(parse_flag),
                );
            });
    }
}
