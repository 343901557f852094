use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bus::{Event, EventBus};
use crate::cache::storage::fallback_tag;
use crate::cache::{
    CacheEvent, FetchEvent, HistoryStorage, OffStorage, RestoreEvent, SessionStorage, Snapshot,
    SnippetStorage, StorageTag, StoreEvent, TabStore,
};
use crate::document::{Document, FragmentApplier, ScriptLoader};
use crate::history::{
    BuildStateEvent, HistoryEvent, HistoryEventKind, HistoryTracker, RestoreStateEvent, SnippetTag,
};
use crate::interaction::{InteractionDispatcher, InteractionEvent, InteractionEventKind};
use crate::request::{resolve_layers, Orchestrator};
use crate::util::TaskSet;

/// Element attribute selecting the cache backend.
pub const SNIPPET_CACHE_ATTRIBUTE: &str = "data-wire-snippet-cache";

/// Persists fragment snapshots for new history entries and re-applies them
/// on back/forward navigation.
#[derive(Clone)]
pub struct SnippetCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    bus: EventBus<CacheEvent>,
    document: Arc<dyn Document>,
    applier: Arc<dyn FragmentApplier>,
    scripts: Arc<dyn ScriptLoader>,
    storages: RwLock<HashMap<String, Arc<dyn SnippetStorage>>>,
    refreshes: TaskSet,
    restoring: AtomicBool,
}

/// Clears the in-progress flag however the restore ends.
struct RestoreGuard<'a>(&'a AtomicBool);

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SnippetCache {
    /// Register the built-in backends and subscribe to `tracker`.
    pub fn attach(
        tracker: &HistoryTracker,
        orchestrator: &Orchestrator,
        tab_store: Arc<dyn TabStore>,
        applier: Arc<dyn FragmentApplier>,
        scripts: Arc<dyn ScriptLoader>,
    ) -> Self {
        let refreshes = TaskSet::new();
        let inner = Arc::new(CacheInner {
            bus: EventBus::new(),
            document: Arc::clone(orchestrator.document()),
            applier,
            scripts,
            storages: RwLock::new(HashMap::new()),
            refreshes: refreshes.clone(),
            restoring: AtomicBool::new(false),
        });
        let cache = Self { inner };
        cache.register_storage(Arc::new(OffStorage::new(orchestrator.clone(), refreshes)));
        cache.register_storage(Arc::new(HistoryStorage));
        cache.register_storage(Arc::new(SessionStorage::new(tab_store)));

        let weak = Arc::downgrade(&cache.inner);
        tracker.events().on(HistoryEventKind::BuildState, {
            let weak = weak.clone();
            move |event| {
                if let (Some(inner), HistoryEvent::BuildState(build)) =
                    (weak.upgrade(), event.detail_mut())
                {
                    inner.on_build(build);
                }
            }
        });
        tracker.events().on(HistoryEventKind::RestoreState, move |event| {
            if let (Some(inner), HistoryEvent::RestoreState(restore)) =
                (weak.upgrade(), event.detail())
            {
                inner.on_restore(restore);
            }
        });

        cache
    }

    pub fn events(&self) -> &EventBus<CacheEvent> {
        &self.inner.bus
    }

    /// Add a backend, replacing any registered under the same tag.
    pub fn register_storage(&self, storage: Arc<dyn SnippetStorage>) {
        self.inner
            .storages
            .write()
            .insert(storage.kind().to_string(), storage);
    }

    /// The backend for `tag`, or the history backend when none is registered.
    pub fn storage(&self, tag: &StorageTag) -> Arc<dyn SnippetStorage> {
        self.inner.storage(tag)
    }

    /// Copy the cache attribute of interacting elements into their options.
    pub fn configure_from(&self, dispatcher: &InteractionDispatcher) {
        dispatcher
            .events()
            .on(InteractionEventKind::Interaction, |event| {
                let InteractionEvent::Interaction(interaction) = event.detail();
                let (element, form) = interaction.element.configured(SNIPPET_CACHE_ATTRIBUTE);
                let mut options = interaction.options.lock();
                options.snippet_cache = resolve_layers(
                    options.snippet_cache.take(),
                    element.map(StorageTag::parse),
                    form.map(StorageTag::parse),
                );
            });
    }

    /// Refresh requests issued by the `off` backend that are still running.
    pub fn pending_refreshes(&self) -> usize {
        self.inner.refreshes.len()
    }

    pub async fn wait_refreshes(&self) {
        self.inner.refreshes.wait_idle().await;
    }
}

impl CacheInner {
    fn storage(&self, tag: &StorageTag) -> Arc<dyn SnippetStorage> {
        let storages = self.storages.read();
        if let Some(storage) = storages.get(tag.as_str()) {
            return Arc::clone(storage);
        }
        warn!(tag = %tag, "unknown snippet cache backend; using history");
        storages
            .get(fallback_tag().as_str())
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(HistoryStorage))
    }

    fn snapshot(&self) -> Snapshot {
        self.document
            .fragments()
            .into_iter()
            .filter(|fragment| fragment.cacheable)
            .map(|fragment| (fragment.id, fragment.markup))
            .collect()
    }

    fn on_build(&self, build: &mut BuildStateEvent) {
        let tag = build.options.lock().storage_tag();
        let storage = self.storage(&tag);
        let kind = storage.kind().to_string();

        let event = self.bus.dispatch(Event::cancelable(CacheEvent::Store(StoreEvent {
            snapshot: self.snapshot(),
            entry: build.entry.clone(),
            storage: StorageTag::new(kind.clone()),
            options: build.options.clone(),
        })));
        if event.is_suppressed() {
            debug!(href = %build.entry.href, "snapshot store suppressed");
            return;
        }
        let CacheEvent::Store(store) = event.into_detail() else {
            return;
        };

        match storage.store(&store.snapshot) {
            Ok(key) => {
                debug!(storage = %kind, fragments = store.snapshot.len(), "stored snapshot");
                build.entry.snippets = Some(SnippetTag { storage: kind, key });
            }
            Err(err) => warn!(%err, storage = %kind, "failed to store snapshot; entry left untagged"),
        }
    }

    fn on_restore(&self, restore: &RestoreStateEvent) {
        let Some(tag) = restore.entry.snippets.as_ref() else {
            return;
        };
        if self.restoring.swap(true, Ordering::SeqCst) {
            debug!(href = %restore.entry.href, "restore already running; skipping");
            return;
        }
        let _guard = RestoreGuard(&self.restoring);

        let storage = self.storage(&StorageTag::new(tag.storage.clone()));
        let fetch = self.bus.emit(
            CacheEvent::Fetch(FetchEvent {
                entry: restore.entry.clone(),
                storage: StorageTag::new(storage.kind()),
                options: restore.options.clone(),
            }),
            true,
        );
        if !fetch {
            return;
        }

        let snapshot = match storage.fetch(&tag.key, &restore.entry, &restore.options) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, storage = storage.kind(), "failed to fetch snapshot");
                return;
            }
        };

        let event = self.bus.dispatch(Event::cancelable(CacheEvent::Restore(RestoreEvent {
            snapshot,
            entry: restore.entry.clone(),
            options: restore.options.clone(),
        })));
        if event.is_suppressed() {
            return;
        }
        let CacheEvent::Restore(restored) = event.into_detail() else {
            return;
        };

        debug!(href = %restore.entry.href, fragments = restored.snapshot.len(), "restoring snapshot");
        self.applier.apply(&restored.snapshot);
        self.scripts.load(&restored.snapshot);
    }
}
