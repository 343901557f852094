use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error};

use crate::bus::{Event, EventBus};
use crate::history::{
    BuildStateEvent, HistoryEntry, HistoryError, HistoryEvent, HistoryMode, HistoryOperation,
    NativeHistory, RestoreStateEvent,
};
use crate::interaction::{InteractionDispatcher, InteractionEvent, InteractionEventKind};
use crate::request::{
    resolve_layers, BeforeEvent, Orchestrator, RequestEvent, RequestEventKind, SharedOptions,
    SuccessEvent,
};

/// Element attribute selecting the history mode.
pub const HISTORY_ATTRIBUTE: &str = "data-wire-history";

/// Mirrors request outcomes into native history and replays native pops.
///
/// Owns the cursor: exactly one tracker may be attached to a given native
/// history, enforced through [`NativeHistory::claim`].
#[derive(Clone)]
pub struct HistoryTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    bus: EventBus<HistoryEvent>,
    native: Arc<dyn NativeHistory>,
    orchestrator: Orchestrator,
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    cursor: i64,
    initialized: bool,
    /// Initialization requested while the document was still loading.
    pending_init: bool,
}

impl HistoryTracker {
    /// Subscribe to `orchestrator` and take ownership of `native`.
    pub fn attach(
        orchestrator: &Orchestrator,
        native: Arc<dyn NativeHistory>,
    ) -> Result<Self, HistoryError> {
        if !native.claim() {
            return Err(HistoryError::AlreadyOwned);
        }

        let inner = Arc::new(TrackerInner {
            bus: EventBus::new(),
            native: Arc::clone(&native),
            orchestrator: orchestrator.clone(),
            state: Mutex::new(TrackerState::default()),
        });

        let weak = Arc::downgrade(&inner);
        orchestrator.events().on(RequestEventKind::Before, {
            let weak = weak.clone();
            move |event| {
                if let (Some(inner), RequestEvent::Before(before)) = (weak.upgrade(), event.detail()) {
                    inner.on_before(before);
                }
            }
        });
        orchestrator.events().on(RequestEventKind::Success, {
            let weak = weak.clone();
            move |event| {
                if let (Some(inner), RequestEvent::Success(success)) = (weak.upgrade(), event.detail()) {
                    inner.on_success(success);
                }
            }
        });
        native.subscribe_pop(Box::new(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.on_pop(state.as_ref());
            }
        }));

        Ok(Self { inner })
    }

    pub fn events(&self) -> &EventBus<HistoryEvent> {
        &self.inner.bus
    }

    pub fn cursor(&self) -> i64 {
        self.inner.state.lock().cursor
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    /// Finish an initialization deferred while the document was loading.
    pub fn document_interactive(&self) {
        let run = {
            let mut state = self.inner.state.lock();
            let run = state.pending_init && !state.initialized;
            if run {
                state.pending_init = false;
                state.initialized = true;
            }
            run
        };
        if run {
            self.inner.replace_boot_entry();
        }
    }

    /// Deliver a native pop for histories that do not call back on their own.
    pub fn handle_pop(&self, state: Option<&Value>) {
        self.inner.on_pop(state);
    }

    /// Copy the history attribute of interacting elements into their options.
    pub fn configure_from(&self, dispatcher: &InteractionDispatcher) {
        dispatcher
            .events()
            .on(InteractionEventKind::Interaction, |event| {
                let InteractionEvent::Interaction(interaction) = event.detail();
                let (element, form) = interaction.element.configured(HISTORY_ATTRIBUTE);
                let mut options = interaction.options.lock();
                options.history = resolve_layers(
                    options.history,
                    element.map(HistoryMode::parse),
                    form.map(HistoryMode::parse),
                );
            });
    }
}

impl TrackerInner {
    fn on_before(&self, before: &BeforeEvent) {
        {
            let mut options = before.options.lock();
            if !options.history_mode().is_enabled() {
                return;
            }
            if options.href.is_none() {
                options.href = Some(before.request.url.to_string());
            }
        }
        self.ensure_initialized();
    }

    fn on_success(&self, success: &SuccessEvent) {
        // The redirected request records history instead.
        if success.payload.get("redirect").is_some_and(Value::is_string) {
            return;
        }
        let (mode, href) = {
            let mut options = success.options.lock();
            let mode = options.history_mode();
            if !mode.is_enabled() {
                return;
            }
            let post_get_url = success
                .payload
                .get("postGet")
                .and_then(Value::as_bool)
                .filter(|post_get| *post_get)
                .and_then(|_| success.payload.get("url"))
                .and_then(Value::as_str);
            if let Some(url) = post_get_url {
                options.href = Some(url.to_string());
            }
            let href = options
                .href
                .clone()
                .unwrap_or_else(|| success.request.url.to_string());
            (mode, href)
        };

        self.flush_pending_init();

        let operation = match mode {
            HistoryMode::Replace => HistoryOperation::Replace,
            _ => HistoryOperation::Push,
        };
        let cursor = {
            let mut state = self.state.lock();
            if operation == HistoryOperation::Push {
                state.cursor += 1;
            }
            state.cursor
        };
        self.record(operation, cursor, href, success.options.clone(), false);
    }

    fn on_pop(&self, state: Option<&Value>) {
        let Some(entry) = state.and_then(HistoryEntry::from_state) else {
            debug!("ignoring pop to a foreign history entry");
            return;
        };

        let direction = {
            let mut tracker = self.state.lock();
            let direction = entry.cursor - tracker.cursor;
            tracker.cursor = entry.cursor;
            direction
        };
        debug!(cursor = entry.cursor, direction, href = %entry.href, "restoring history entry");

        let options = SharedOptions::new(self.orchestrator.default_options());
        self.bus.emit(
            HistoryEvent::RestoreState(RestoreStateEvent {
                entry,
                direction,
                options,
            }),
            false,
        );
    }

    fn ensure_initialized(&self) {
        {
            let mut state = self.state.lock();
            if state.initialized || state.pending_init {
                return;
            }
            if !self.orchestrator.document().is_interactive() {
                debug!("document still loading; deferring history initialization");
                state.pending_init = true;
                return;
            }
            state.initialized = true;
        }
        self.replace_boot_entry();
    }

    /// A success arriving before the document became interactive records the
    /// boot entry first, so the push lands on top of it.
    fn flush_pending_init(&self) {
        let run = {
            let mut state = self.state.lock();
            let run = state.pending_init && !state.initialized;
            if run {
                state.pending_init = false;
                state.initialized = true;
            }
            run
        };
        if run {
            self.replace_boot_entry();
        }
    }

    fn replace_boot_entry(&self) {
        let href = self.orchestrator.document().location().to_string();
        let cursor = self.state.lock().cursor;
        let options = SharedOptions::new(self.orchestrator.default_options());
        self.record(HistoryOperation::Replace, cursor, href, options, true);
    }

    fn record(
        &self,
        operation: HistoryOperation,
        cursor: i64,
        href: String,
        options: SharedOptions,
        is_initial: bool,
    ) {
        let entry = HistoryEntry::new(cursor, href.clone());
        let fallback = entry.clone();
        let event = self.bus.dispatch(Event::new(HistoryEvent::BuildState(BuildStateEvent {
            entry,
            operation,
            is_initial,
            options,
        })));
        let entry = match event.into_detail() {
            HistoryEvent::BuildState(built) => built.entry,
            HistoryEvent::RestoreState(_) => fallback,
        };

        let state = match entry.to_state() {
            Ok(state) => state,
            Err(err) => {
                error!(%err, %href, "failed to serialize history entry");
                return;
            }
        };

        debug!(operation = operation.as_str(), cursor, %href, "writing history entry");
        match operation {
            HistoryOperation::Push => self.native.push_state(state, &href),
            HistoryOperation::Replace => self.native.replace_state(state, &href),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEventKind;
    use crate::memory::MemoryBrowser;
    use crate::request::{Options, RequestData};
    use crate::transport::MockTransport;
    use proptest::prelude::*;
    use serde_json::json;
    use url::Url;

    struct Fixture {
        browser: MemoryBrowser,
        transport: MockTransport,
        orchestrator: Orchestrator,
        tracker: HistoryTracker,
        restores: Arc<Mutex<Vec<(i64, HistoryEntry)>>>,
        builds: Arc<Mutex<Vec<(HistoryOperation, bool, i64)>>>,
    }

    fn fixture() -> Fixture {
        let browser = MemoryBrowser::new(Url::parse("https://news.test/").unwrap());
        let transport = MockTransport::new();
        let orchestrator = Orchestrator::new(
            Arc::new(transport.clone()),
            browser.document.clone(),
            Options::default(),
        );
        let tracker = HistoryTracker::attach(&orchestrator, browser.history.clone()).unwrap();

        let restores = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&restores);
        tracker.events().on(HistoryEventKind::RestoreState, move |event| {
            if let HistoryEvent::RestoreState(restore) = event.detail() {
                sink.lock().push((restore.direction, restore.entry.clone()));
            }
        });
        let builds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&builds);
        tracker.events().on(HistoryEventKind::BuildState, move |event| {
            if let HistoryEvent::BuildState(build) = event.detail() {
                sink.lock().push((build.operation, build.is_initial, build.entry.cursor));
            }
        });

        Fixture {
            browser,
            transport,
            orchestrator,
            tracker,
            restores,
            builds,
        }
    }

    async fn visit(fixture: &Fixture, url: &str, options: Options) {
        fixture
            .orchestrator
            .issue("GET", url, RequestData::Empty, options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_request_replaces_boot_entry_then_pushes() {
        let f = fixture();
        visit(&f, "/a", Options::new()).await;

        assert!(f.tracker.is_initialized());
        assert_eq!(f.tracker.cursor(), 1);
        assert_eq!(f.browser.history.replace_count(), 1);
        assert_eq!(f.browser.history.push_count(), 1);
        assert_eq!(
            *f.builds.lock(),
            vec![(HistoryOperation::Replace, true, 0), (HistoryOperation::Push, false, 1)]
        );

        let entries = f.browser.history.entries();
        assert_eq!(
            entries[0].state,
            Some(json!({"source": "pagewire", "cursor": 0, "href": "https://news.test/"}))
        );
        assert_eq!(
            entries[1].state,
            Some(json!({"source": "pagewire", "cursor": 1, "href": "https://news.test/a"}))
        );
    }

    #[tokio::test]
    async fn test_replace_keeps_cursor() {
        let f = fixture();
        visit(&f, "/a", Options::new()).await;
        visit(&f, "/a?sort=new", Options::new().with_history(HistoryMode::Replace)).await;

        assert_eq!(f.tracker.cursor(), 1);
        assert_eq!(f.browser.history.len(), 2);
        assert_eq!(f.browser.history.current().url.as_str(), "https://news.test/a?sort=new");
    }

    #[tokio::test]
    async fn test_disabled_history_touches_nothing() {
        let f = fixture();
        visit(&f, "/a", Options::new().with_history(HistoryMode::Disabled)).await;

        assert_eq!(f.browser.history.push_count(), 0);
        assert_eq!(f.browser.history.replace_count(), 0);
        assert!(f.builds.lock().is_empty());
        assert!(!f.tracker.is_initialized());
    }

    #[tokio::test]
    async fn test_back_navigation_restores_with_direction() {
        let f = fixture();
        visit(&f, "/a", Options::new()).await;
        visit(&f, "/b", Options::new()).await;
        assert_eq!(f.tracker.cursor(), 2);

        assert!(f.browser.history.back());

        assert_eq!(f.tracker.cursor(), 1);
        let restores = f.restores.lock();
        assert_eq!(restores.len(), 1);
        assert_eq!(restores[0].0, -1);
        assert_eq!(restores[0].1.href, "https://news.test/a");
    }

    #[test]
    fn test_pop_direction_spans_several_steps() {
        let f = fixture();
        f.tracker.handle_pop(Some(&HistoryEntry::new(5, "/five").to_state().unwrap()));
        f.tracker.handle_pop(Some(&HistoryEntry::new(2, "/two").to_state().unwrap()));

        assert_eq!(f.tracker.cursor(), 2);
        let directions: Vec<i64> = f.restores.lock().iter().map(|(d, _)| *d).collect();
        assert_eq!(directions, vec![5, -3]);
    }

    #[test]
    fn test_foreign_pop_is_ignored() {
        let f = fixture();
        f.tracker.handle_pop(Some(&HistoryEntry::new(4, "/x").to_state().unwrap()));
        f.tracker.handle_pop(Some(&json!({"source": "router", "cursor": 9, "href": "/y"})));
        f.tracker.handle_pop(None);

        assert_eq!(f.tracker.cursor(), 4);
        assert_eq!(f.restores.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_href_is_not_overwritten() {
        let f = fixture();
        let mut options = Options::new();
        options.href = Some("https://news.test/pretty".into());
        visit(&f, "/raw?id=7", options).await;

        assert_eq!(f.browser.history.current().url.as_str(), "https://news.test/pretty");
    }

    #[tokio::test]
    async fn test_post_get_payload_records_its_url() {
        let f = fixture();
        f.transport
            .set_reply("/save", crate::transport::MockReply::Respond(
                crate::transport::TransportResponse::json(200, &json!({"postGet": true, "url": "https://news.test/saved"})),
            ));
        f.orchestrator
            .issue("POST", "/save", RequestData::Empty, Options::new())
            .await
            .unwrap();

        assert_eq!(f.browser.history.current().url.as_str(), "https://news.test/saved");
    }

    #[tokio::test]
    async fn test_initialization_waits_for_interactive_document() {
        let f = fixture();
        f.browser.document.set_interactive(false);
        let suppress = f.orchestrator.events().on(RequestEventKind::Before, |event| event.suppress());
        visit(&f, "/a", Options::new()).await;
        assert!(!f.tracker.is_initialized());
        assert_eq!(f.browser.history.replace_count(), 0);

        f.browser.document.set_interactive(true);
        f.tracker.document_interactive();
        assert!(f.tracker.is_initialized());
        assert_eq!(f.browser.history.replace_count(), 1);
        assert!(f.orchestrator.events().off(RequestEventKind::Before, suppress));
    }

    #[test]
    fn test_second_tracker_on_same_history_is_rejected() {
        let f = fixture();
        let second = HistoryTracker::attach(&f.orchestrator, f.browser.history.clone());
        assert!(matches!(second, Err(HistoryError::AlreadyOwned)));
    }

    proptest! {
        #[test]
        fn prop_cursor_rises_by_one_per_push(modes in proptest::collection::vec(any::<bool>(), 1..12)) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let f = fixture();
                let mut expected = 0;
                for (step, push) in modes.iter().enumerate() {
                    let mode = if *push { HistoryMode::Push } else { HistoryMode::Replace };
                    visit(&f, &format!("/step/{step}"), Options::new().with_history(mode)).await;
                    if *push {
                        expected += 1;
                    }
                    assert_eq!(f.tracker.cursor(), expected);
                }
            });
        }
    }
}
