//! Redirect following
//!
//! A successful payload carrying `redirect` hands navigation either to the
//! browser (hard) or to a fresh `GET` through the orchestrator (soft).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::bus::{BusEvent, Event, EventBus};
use crate::request::{
    Orchestrator, RequestData, RequestEvent, RequestEventKind, SharedOptions, SuccessEvent,
};
use crate::util::TaskSet;

#[derive(Debug)]
pub enum RedirectEvent {
    /// About to follow a redirect. Cancelable; listeners may rewrite the
    /// target or the hard flag.
    Redirect(RedirectDetail),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectEventKind {
    Redirect,
}

impl BusEvent for RedirectEvent {
    type Kind = RedirectEventKind;

    fn kind(&self) -> RedirectEventKind {
        RedirectEventKind::Redirect
    }
}

#[derive(Debug)]
pub struct RedirectDetail {
    pub url: Url,
    /// Full page load instead of a partial request.
    pub hard: bool,
    pub options: SharedOptions,
}

#[derive(Clone)]
pub struct RedirectFollower {
    inner: Arc<RedirectInner>,
}

struct RedirectInner {
    bus: EventBus<RedirectEvent>,
    orchestrator: Orchestrator,
    follow_ups: TaskSet,
}

impl RedirectFollower {
    /// Subscribe to `orchestrator`. Attach before other success listeners so
    /// they never see redirecting payloads.
    pub fn attach(orchestrator: &Orchestrator) -> Self {
        let inner = Arc::new(RedirectInner {
            bus: EventBus::new(),
            orchestrator: orchestrator.clone(),
            follow_ups: TaskSet::new(),
        });
        let weak = Arc::downgrade(&inner);
        orchestrator.events().on(RequestEventKind::Success, move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let followed = match event.detail() {
                RequestEvent::Success(success) => inner.on_success(success),
                _ => false,
            };
            if followed {
                event.stop_propagation();
            }
        });
        Self { inner }
    }

    pub fn events(&self) -> &EventBus<RedirectEvent> {
        &self.inner.bus
    }

    /// Follow `url` as if a payload had asked for it.
    pub fn redirect(&self, url: &str, options: SharedOptions) {
        if let Err(err) = self.inner.follow(url, options) {
            warn!(%err, url, "cannot follow redirect");
        }
    }

    /// Soft redirects still running.
    pub fn pending(&self) -> usize {
        self.inner.follow_ups.len()
    }

    pub async fn wait_idle(&self) {
        self.inner.follow_ups.wait_idle().await;
    }
}

impl RedirectInner {
    /// Returns true when the payload asked for a redirect.
    fn on_success(&self, success: &SuccessEvent) -> bool {
        let Some(target) = success.payload.get("redirect").and_then(Value::as_str) else {
            return false;
        };
        if let Err(err) = self.follow(target, success.options.clone()) {
            warn!(%err, target, "ignoring malformed redirect");
        }
        true
    }

    fn follow(&self, target: &str, options: SharedOptions) -> Result<(), url::ParseError> {
        let location = self.orchestrator.document().location();
        let url = location.join(target)?;
        let hard = options.lock().force_redirect.unwrap_or(false) || url.origin() != location.origin();

        let event = self.bus.dispatch(Event::cancelable(RedirectEvent::Redirect(RedirectDetail {
            url,
            hard,
            options,
        })));
        if event.is_suppressed() {
            debug!("redirect suppressed");
            return Ok(());
        }
        let RedirectEvent::Redirect(RedirectDetail { url, hard, options }) = event.into_detail();

        if hard {
            debug!(%url, "hard redirect");
            self.orchestrator.document().assign(&url);
            return Ok(());
        }

        debug!(%url, "following redirect");
        let mut options = options.snapshot();
        options.href = Some(url.to_string());
        let orchestrator = self.orchestrator.clone();
        let spawned = self.follow_ups.spawn(move |cancellation| async move {
            if let Err(err) = orchestrator
                .issue_cancellable("GET", url.as_str(), RequestData::Empty, options, cancellation)
                .await
            {
                warn!(%err, %url, "redirected request failed");
            }
        });
        if !spawned {
            warn!("no runtime to follow redirect on");
        }
        Ok(())
    }
}
