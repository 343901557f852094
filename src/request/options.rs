use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::StorageTag;
use crate::extensions::UniqueKey;
use crate::history::HistoryMode;

/// Credentials policy handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Transport sub-configuration, merged one level deep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub credentials: Option<Credentials>,
    pub headers: BTreeMap<String, String>,
}

impl FetchOptions {
    fn merged_over(mut self, defaults: &FetchOptions) -> Self {
        self.credentials = self.credentials.or(defaults.credentials);
        for (name, value) in &defaults.headers {
            self.headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }
}

/// Per-interaction configuration.
///
/// Unset fields fall through to the process-wide defaults when the request
/// is issued. Extensions read their own settings out of `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub abort: Option<bool>,
    pub unique: Option<UniqueKey>,
    pub history: Option<HistoryMode>,
    pub snippet_cache: Option<StorageTag>,
    /// Href recorded in history; stamped on `before` unless a redirect set it.
    pub href: Option<String>,
    pub force_redirect: Option<bool>,
    pub fetch: FetchOptions,
    pub extra: Map<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, mode: HistoryMode) -> Self {
        self.history = Some(mode);
        self
    }

    pub fn with_snippet_cache(mut self, tag: impl Into<StorageTag>) -> Self {
        self.snippet_cache = Some(tag.into());
        self
    }

    pub fn with_abort(mut self, abortable: bool) -> Self {
        self.abort = Some(abortable);
        self
    }

    pub fn with_unique(mut self, unique: UniqueKey) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn with_force_redirect(mut self, force: bool) -> Self {
        self.force_redirect = Some(force);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fetch.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Layer these call-site options over `defaults`; call-site values win.
    pub fn merged_over(self, defaults: &Options) -> Options {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra);
        Options {
            abort: self.abort.or(defaults.abort),
            unique: self.unique.or_else(|| defaults.unique.clone()),
            history: self.history.or(defaults.history),
            snippet_cache: self.snippet_cache.or_else(|| defaults.snippet_cache.clone()),
            href: self.href.or_else(|| defaults.href.clone()),
            force_redirect: self.force_redirect.or(defaults.force_redirect),
            fetch: self.fetch.merged_over(&defaults.fetch),
            extra,
        }
    }

    pub fn history_mode(&self) -> HistoryMode {
        self.history.unwrap_or_default()
    }

    pub fn storage_tag(&self) -> StorageTag {
        self.snippet_cache.clone().unwrap_or_default()
    }

    pub fn is_abortable(&self) -> bool {
        self.abort.unwrap_or(true)
    }

    pub fn unique_key(&self) -> UniqueKey {
        self.unique.clone().unwrap_or_default()
    }

    pub fn credentials(&self) -> Credentials {
        self.fetch.credentials.unwrap_or_default()
    }

    pub fn into_shared(self) -> SharedOptions {
        SharedOptions::new(self)
    }
}

/// Options shared by reference through one request's whole event chain.
///
/// Listeners see each other's writes. Never hold the guard across an emit.
#[derive(Clone, Default)]
pub struct SharedOptions(Arc<Mutex<Options>>);

impl SharedOptions {
    pub fn new(options: Options) -> Self {
        Self(Arc::new(Mutex::new(options)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Options> {
        self.0.lock()
    }

    pub fn snapshot(&self) -> Options {
        self.0.lock().clone()
    }

    pub fn ptr_eq(&self, other: &SharedOptions) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedOptions").field(&*self.0.lock()).finish()
    }
}

/// Pick the first configured layer: explicit option, element attribute,
/// owning-form attribute.
pub fn resolve_layers<T>(explicit: Option<T>, element: Option<T>, form: Option<T>) -> Option<T> {
    explicit.or(element).or(form)
}

/// [`resolve_layers`] with a final default.
pub fn resolve<T>(explicit: Option<T>, element: Option<T>, form: Option<T>, default: T) -> T {
    resolve_layers(explicit, element, form).unwrap_or(default)
}
