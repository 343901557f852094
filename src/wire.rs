//! The assembled navigation stack.

use std::sync::Arc;

use crate::cache::{SnippetCache, SnippetUpdater, TabStore};
use crate::config::Config;
use crate::document::{Document, FragmentApplier, ScriptLoader};
use crate::extensions::{AbortRegistry, UniqueRequests};
use crate::history::{HistoryError, HistoryTracker, NativeHistory};
use crate::interaction::{Element, InteractionDispatcher, InteractionError};
use crate::redirect::RedirectFollower;
use crate::request::{Options, Orchestrator, Payload, RequestData, RequestError};
use crate::transport::Transport;

/// Everything the stack needs from its host environment.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub document: Arc<dyn Document>,
    pub native_history: Arc<dyn NativeHistory>,
    pub tab_store: Arc<dyn TabStore>,
    pub applier: Arc<dyn FragmentApplier>,
    pub scripts: Arc<dyn ScriptLoader>,
}

/// Orchestrator, snippet updater, history tracker, snippet cache, redirect
/// follower and request policies wired over one set of collaborators.
#[derive(Clone)]
pub struct Pagewire {
    orchestrator: Orchestrator,
    redirects: RedirectFollower,
    snippets: SnippetUpdater,
    history: HistoryTracker,
    cache: SnippetCache,
    unique: UniqueRequests,
    aborts: AbortRegistry,
    interactions: InteractionDispatcher,
}

impl Pagewire {
    /// Fails when another tracker already owns the native history.
    pub fn new(collaborators: Collaborators, config: &Config) -> Result<Self, HistoryError> {
        let Collaborators {
            transport,
            document,
            native_history,
            tab_store,
            applier,
            scripts,
        } = collaborators;

        let orchestrator = Orchestrator::new(transport, document, config.defaults.clone());
        // Success listeners run in attach order. Redirects see payloads first,
        // and snippets land on the page before history snapshots it.
        let redirects = RedirectFollower::attach(&orchestrator);
        let snippets = SnippetUpdater::attach(&orchestrator, applier.clone(), scripts.clone());
        let history = HistoryTracker::attach(&orchestrator, native_history)?;
        let cache = SnippetCache::attach(&history, &orchestrator, tab_store, applier, scripts);
        let unique = UniqueRequests::attach(&orchestrator);
        let aborts = AbortRegistry::attach(&orchestrator);

        let interactions = InteractionDispatcher::new(&orchestrator, &config.allowed_origins);
        history.configure_from(&interactions);
        cache.configure_from(&interactions);
        unique.configure_from(&interactions);
        aborts.configure_from(&interactions);

        Ok(Self {
            orchestrator,
            redirects,
            snippets,
            history,
            cache,
            unique,
            aborts,
            interactions,
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn redirects(&self) -> &RedirectFollower {
        &self.redirects
    }

    pub fn snippets(&self) -> &SnippetUpdater {
        &self.snippets
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn cache(&self) -> &SnippetCache {
        &self.cache
    }

    pub fn unique(&self) -> &UniqueRequests {
        &self.unique
    }

    pub fn aborts(&self) -> &AbortRegistry {
        &self.aborts
    }

    pub fn interactions(&self) -> &InteractionDispatcher {
        &self.interactions
    }

    pub async fn request(
        &self,
        method: &str,
        url: &str,
        data: RequestData,
        options: Options,
    ) -> Result<Payload, RequestError> {
        self.orchestrator.issue(method, url, data, options).await
    }

    pub async fn click(
        &self,
        element: &Element,
        options: Options,
    ) -> Result<Payload, InteractionError> {
        self.interactions.click(element, options).await
    }

    pub async fn submit(
        &self,
        element: &Element,
        options: Options,
    ) -> Result<Payload, InteractionError> {
        self.interactions.submit(element, options).await
    }

    /// Cancel every abortable request in flight.
    pub fn abort_all(&self) -> usize {
        self.aborts.abort_all()
    }

    /// Wait for follow-up requests (redirects, cache refreshes) to finish.
    pub async fn settle(&self) {
        loop {
            futures::future::join(self.redirects.wait_idle(), self.cache.wait_refreshes()).await;
            if self.redirects.pending() == 0 && self.cache.pending_refreshes() == 0 {
                return;
            }
        }
    }
}
