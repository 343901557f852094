use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::{CacheError, TabStore};

/// Tab-scoped key/value store kept in memory, with an optional byte quota.
#[derive(Default)]
pub struct MemoryTabStore {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryTabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys plus values would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl TabStore for MemoryTabStore {
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock();
        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(CacheError::QuotaExceeded(quota));
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }
}
