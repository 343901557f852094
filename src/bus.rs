//! Synchronous, cancelable event dispatch
//!
//! Every component owns one [`EventBus`] typed over its own event enum.
//! Dispatch runs on the caller's thread in registration order. A listener
//! may stop propagation to later listeners, and may suppress a cancelable
//! event so the emitter abandons the operation the event stands for.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// An event enum that can travel over an [`EventBus`].
pub trait BusEvent {
    /// Discriminant listeners subscribe to.
    type Kind: Copy + Eq + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One dispatch of an event, shared mutably with every listener in turn.
#[derive(Debug)]
pub struct Event<E> {
    detail: E,
    cancelable: bool,
    suppressed: bool,
    propagation_stopped: bool,
}

impl<E> Event<E> {
    pub fn new(detail: E) -> Self {
        Self {
            detail,
            cancelable: false,
            suppressed: false,
            propagation_stopped: false,
        }
    }

    pub fn cancelable(detail: E) -> Self {
        Self {
            cancelable: true,
            ..Self::new(detail)
        }
    }

    pub fn detail(&self) -> &E {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut E {
        &mut self.detail
    }

    pub fn into_detail(self) -> E {
        self.detail
    }

    pub fn is_cancelable(&self) -> bool {
        self.cancelable
    }

    /// Mark the event suppressed. Has no effect on non-cancelable events.
    pub fn suppress(&mut self) {
        if self.cancelable {
            self.suppressed = true;
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Skip every listener registered after the current one.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

type Listener<E> = Arc<dyn Fn(&mut Event<E>) + Send + Sync>;

struct Registration<E: BusEvent> {
    id: ListenerId,
    kind: E::Kind,
    listener: Listener<E>,
}

/// Ordered publish/subscribe scoped to one owning component.
pub struct EventBus<E: BusEvent> {
    listeners: Mutex<Vec<Registration<E>>>,
    next_id: AtomicU64,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe `listener` to events of `kind`.
    pub fn on<F>(&self, kind: E::Kind, listener: F) -> ListenerId
    where
        F: Fn(&mut Event<E>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Registration {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    /// Unsubscribe a listener. Returns false if it was not registered for `kind`.
    pub fn off(&self, kind: E::Kind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|registration| !(registration.id == id && registration.kind == kind));
        listeners.len() != before
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    /// Run every listener for the event's kind and hand the event back, so the
    /// emitter can read whatever listeners wrote into the detail.
    ///
    /// The listener list is snapshotted before the first call: listeners added
    /// or removed during dispatch only affect later dispatches.
    pub fn dispatch(&self, mut event: Event<E>) -> Event<E> {
        let kind = event.detail.kind();
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .lock()
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| Arc::clone(&registration.listener))
            .collect();

        for listener in snapshot {
            listener(&mut event);
            if event.propagation_stopped {
                break;
            }
        }
        event
    }

    /// Dispatch `detail`. Returns false when a listener suppressed it.
    pub fn emit(&self, detail: E, cancelable: bool) -> bool {
        let event = if cancelable {
            Event::cancelable(detail)
        } else {
            Event::new(detail)
        };
        !self.dispatch(event).is_suppressed()
    }
}
