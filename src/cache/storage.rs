use std::sync::Arc;

use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheKey, Snapshot, StorageTag};
use crate::history::{HistoryEntry, HistoryMode};
use crate::request::{Orchestrator, RequestData, SharedOptions};
use crate::util::TaskSet;

const SESSION_KEY_LEN: usize = 8;

/// Built-in backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Off,
    History,
    Session,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Off => "off",
            StorageKind::History => "history",
            StorageKind::Session => "session",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(StorageKind::Off),
            "history" => Some(StorageKind::History),
            "session" => Some(StorageKind::Session),
            _ => None,
        }
    }
}

/// Storage strategy for fragment snapshots.
pub trait SnippetStorage: Send + Sync {
    /// Tag written into history entries; selects this backend on restore.
    fn kind(&self) -> &str;

    fn store(&self, snapshot: &Snapshot) -> Result<CacheKey, CacheError>;

    fn fetch(
        &self,
        key: &CacheKey,
        entry: &HistoryEntry,
        options: &SharedOptions,
    ) -> Result<Option<Snapshot>, CacheError>;
}

/// Tab-scoped key/value store (`sessionStorage` in a browser).
pub trait TabStore: Send + Sync {
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;

    fn get_item(&self, key: &str) -> Option<String>;
}

/// Stores nothing. Restoring re-requests the entry's page instead.
pub struct OffStorage {
    orchestrator: Orchestrator,
    refreshes: TaskSet,
}

impl OffStorage {
    pub fn new(orchestrator: Orchestrator, refreshes: TaskSet) -> Self {
        Self {
            orchestrator,
            refreshes,
        }
    }
}

impl SnippetStorage for OffStorage {
    fn kind(&self) -> &str {
        StorageKind::Off.as_str()
    }

    fn store(&self, _snapshot: &Snapshot) -> Result<CacheKey, CacheError> {
        Ok(CacheKey::Empty)
    }

    /// Never yields a snapshot. Issues a fresh `GET` for the entry with
    /// history and caching disabled; only the newest refresh is kept.
    fn fetch(
        &self,
        _key: &CacheKey,
        entry: &HistoryEntry,
        options: &SharedOptions,
    ) -> Result<Option<Snapshot>, CacheError> {
        let mut options = options.snapshot();
        options.history = Some(HistoryMode::Disabled);
        options.snippet_cache = Some(StorageKind::Off.into());
        options.href = None;

        let orchestrator = self.orchestrator.clone();
        let href = entry.href.clone();
        debug!(%href, "refreshing uncached history entry");

        self.refreshes.abort_all();
        let spawned = self.refreshes.spawn({
            let href = href.clone();
            move |cancellation| async move {
                if let Err(err) = orchestrator
                    .issue_cancellable("GET", &href, RequestData::Empty, options, cancellation)
                    .await
                {
                    warn!(%err, %href, "refresh of history entry failed");
                }
            }
        });
        if !spawned {
            return Err(CacheError::NoRuntime(href));
        }
        Ok(None)
    }
}

/// Keeps the snapshot inside the history entry itself.
pub struct HistoryStorage;

impl SnippetStorage for HistoryStorage {
    fn kind(&self) -> &str {
        StorageKind::History.as_str()
    }

    fn store(&self, snapshot: &Snapshot) -> Result<CacheKey, CacheError> {
        Ok(CacheKey::Inline(snapshot.clone()))
    }

    fn fetch(
        &self,
        key: &CacheKey,
        _entry: &HistoryEntry,
        _options: &SharedOptions,
    ) -> Result<Option<Snapshot>, CacheError> {
        Ok(match key {
            CacheKey::Inline(snapshot) => Some(snapshot.clone()),
            _ => None,
        })
    }
}

/// Serializes snapshots into the tab store under a short random key.
pub struct SessionStorage {
    store: Arc<dyn TabStore>,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn TabStore>) -> Self {
        Self { store }
    }
}

fn random_key() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_KEY_LEN)
        .map(char::from)
        .collect()
}

impl SnippetStorage for SessionStorage {
    fn kind(&self) -> &str {
        StorageKind::Session.as_str()
    }

    fn store(&self, snapshot: &Snapshot) -> Result<CacheKey, CacheError> {
        let key = random_key();
        let text = serde_json::to_string(snapshot)?;
        self.store.set_item(&key, &text)?;
        Ok(CacheKey::Id(key))
    }

    /// `None` when the key is gone (storage cleared) or unreadable.
    fn fetch(
        &self,
        key: &CacheKey,
        _entry: &HistoryEntry,
        _options: &SharedOptions,
    ) -> Result<Option<Snapshot>, CacheError> {
        let CacheKey::Id(key) = key else {
            return Ok(None);
        };
        let Some(text) = self.store.get_item(key) else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(%err, %key, "discarding unreadable cached snapshot");
                Ok(None)
            }
        }
    }
}

/// Default backend used when a tag names nothing registered.
pub(crate) fn fallback_tag() -> StorageTag {
    StorageKind::History.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryTabStore};
    use crate::request::Options;
    use crate::transport::MockTransport;
    use proptest::prelude::*;
    use url::Url;

    fn entry() -> HistoryEntry {
        HistoryEntry::new(1, "https://a.test/list")
    }

    fn options() -> SharedOptions {
        Options::new().into_shared()
    }

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(id, markup)| (id.to_string(), markup.to_string()))
            .collect()
    }

    #[test]
    fn test_session_keys_are_short_and_distinct() {
        let store = SessionStorage::new(Arc::new(MemoryTabStore::new()));
        let first = store.store(&Snapshot::new()).unwrap();
        let second = store.store(&Snapshot::new()).unwrap();

        let (CacheKey::Id(a), CacheKey::Id(b)) = (&first, &second) else {
            panic!("session storage must hand out ids");
        };
        assert_eq!(a.len(), SESSION_KEY_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_fetch_after_clear_yields_nothing() {
        let tab = Arc::new(MemoryTabStore::new());
        let store = SessionStorage::new(tab.clone());
        let key = store.store(&snapshot(&[("main", "<p>x</p>")])).unwrap();
        tab.clear();

        assert_eq!(store.fetch(&key, &entry(), &options()).unwrap(), None);
    }

    #[test]
    fn test_session_store_surfaces_quota_errors() {
        let store = SessionStorage::new(Arc::new(MemoryTabStore::with_quota(16)));
        let result = store.store(&snapshot(&[("main", "<p>far too long for the quota</p>")]));
        assert!(matches!(result, Err(CacheError::QuotaExceeded(16))));
    }

    #[test]
    fn test_history_fetch_ignores_foreign_keys() {
        let result = HistoryStorage
            .fetch(&CacheKey::Id("abc".into()), &entry(), &options())
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_off_fetch_refreshes_without_history_or_cache() {
        let transport = MockTransport::new();
        let document = Arc::new(MemoryDocument::new(Url::parse("https://a.test/").unwrap()));
        let orchestrator = Orchestrator::new(Arc::new(transport.clone()), document, Options::default());
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            orchestrator
                .events()
                .on(crate::request::RequestEventKind::Before, move |event| {
                    let options = event.detail().options().snapshot();
                    seen.lock().push((options.history_mode(), options.storage_tag()));
                });
        }
        let refreshes = TaskSet::new();
        let off = OffStorage::new(orchestrator, refreshes.clone());

        let key = off.store(&snapshot(&[("main", "<p/>")])).unwrap();
        assert_eq!(key, CacheKey::Empty);
        assert_eq!(off.fetch(&key, &entry(), &options()).unwrap(), None);
        refreshes.wait_idle().await;

        let sent = transport.captured_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, reqwest::Method::GET);
        assert_eq!(sent[0].url.as_str(), "https://a.test/list");
        assert_eq!(
            *seen.lock(),
            vec![(HistoryMode::Disabled, StorageTag::from(StorageKind::Off))]
        );
    }

    #[tokio::test]
    async fn test_newer_refresh_aborts_the_pending_one() {
        let transport = MockTransport::new().with_reply("/list", crate::transport::MockReply::Hang);
        let document = Arc::new(MemoryDocument::new(Url::parse("https://a.test/").unwrap()));
        let orchestrator = Orchestrator::new(Arc::new(transport.clone()), document, Options::default());
        let aborts = Arc::new(parking_lot::Mutex::new(0));
        {
            let aborts = Arc::clone(&aborts);
            orchestrator
                .events()
                .on(crate::request::RequestEventKind::Abort, move |_| *aborts.lock() += 1);
        }
        let refreshes = TaskSet::new();
        let off = OffStorage::new(orchestrator, refreshes.clone());

        off.fetch(&CacheKey::Empty, &entry(), &options()).unwrap();
        transport.wait_for_requests(1).await;
        transport.set_reply(
            "/list",
            crate::transport::MockReply::Respond(crate::transport::TransportResponse::json(
                200,
                &serde_json::json!({}),
            )),
        );
        off.fetch(&CacheKey::Empty, &entry(), &options()).unwrap();
        refreshes.wait_idle().await;

        assert_eq!(*aborts.lock(), 1);
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_off_fetch_outside_runtime_reports_error() {
        let document = Arc::new(MemoryDocument::new(Url::parse("https://a.test/").unwrap()));
        let orchestrator =
            Orchestrator::new(Arc::new(MockTransport::new()), document, Options::default());
        let off = OffStorage::new(orchestrator, TaskSet::new());

        let result = off.fetch(&CacheKey::Empty, &entry(), &options());
        assert!(matches!(result, Err(CacheError::NoRuntime(_))));
    }

    proptest! {
        #[test]
        fn prop_history_and_session_round_trip(
            pairs in proptest::collection::btree_map("[a-z-]{1,8}", ".{0,24}", 0..6)
        ) {
            let original: Snapshot = pairs.into_iter().collect();
            let backends: Vec<Box<dyn SnippetStorage>> = vec![
                Box::new(HistoryStorage),
                Box::new(SessionStorage::new(Arc::new(MemoryTabStore::new()))),
            ];
            for backend in backends {
                let key = backend.store(&original).unwrap();
                let restored = backend.fetch(&key, &entry(), &options()).unwrap();
                prop_assert_eq!(restored, Some(original.clone()));
            }
        }
    }
}
