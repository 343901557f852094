use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use crate::document::Document;
use crate::history::{NativeHistory, PopListener};
use crate::memory::MemoryDocument;

/// One slot of the in-memory history stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StackEntry {
    pub state: Option<Value>,
    pub url: Url,
}

/// Session history stack with browser semantics: pushing drops forward
/// entries, and `go` delivers the target state to pop listeners.
pub struct MemoryHistory {
    document: Arc<MemoryDocument>,
    claimed: AtomicBool,
    stack: Mutex<Stack>,
    pop_listeners: Mutex<Vec<Arc<dyn Fn(Option<Value>) + Send + Sync>>>,
    pushes: AtomicUsize,
    replaces: AtomicUsize,
}

struct Stack {
    entries: Vec<StackEntry>,
    index: usize,
}

impl MemoryHistory {
    /// A stack holding one stateless entry for the document's location.
    pub fn new(document: Arc<MemoryDocument>) -> Self {
        let initial = StackEntry {
            state: None,
            url: document.location(),
        };
        Self {
            document,
            claimed: AtomicBool::new(false),
            stack: Mutex::new(Stack {
                entries: vec![initial],
                index: 0,
            }),
            pop_listeners: Mutex::new(Vec::new()),
            pushes: AtomicUsize::new(0),
            replaces: AtomicUsize::new(0),
        }
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn replace_count(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.stack.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.stack.lock().index
    }

    pub fn entries(&self) -> Vec<StackEntry> {
        self.stack.lock().entries.clone()
    }

    pub fn current(&self) -> StackEntry {
        let stack = self.stack.lock();
        stack.entries[stack.index].clone()
    }

    /// Move `delta` steps and notify pop listeners. Returns false when the
    /// target is outside the stack.
    pub fn go(&self, delta: i64) -> bool {
        let target = {
            let mut stack = self.stack.lock();
            let index = stack.index as i64 + delta;
            if delta == 0 || index < 0 || index >= stack.entries.len() as i64 {
                return false;
            }
            stack.index = index as usize;
            stack.entries[stack.index].clone()
        };

        self.document.set_location(target.url);
        let listeners = self.pop_listeners.lock().clone();
        for listener in listeners {
            listener(target.state.clone());
        }
        true
    }

    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn resolve(&self, url: &str) -> Url {
        let location = self.document.location();
        location.join(url).unwrap_or(location)
    }
}

impl NativeHistory for MemoryHistory {
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    fn push_state(&self, state: Value, url: &str) {
        let url = self.resolve(url);
        {
            let mut stack = self.stack.lock();
            let keep = stack.index + 1;
            stack.entries.truncate(keep);
            stack.entries.push(StackEntry {
                state: Some(state),
                url: url.clone(),
            });
            stack.index = keep;
        }
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.document.set_location(url);
    }

    fn replace_state(&self, state: Value, url: &str) {
        let url = self.resolve(url);
        {
            let mut stack = self.stack.lock();
            let index = stack.index;
            stack.entries[index] = StackEntry {
                state: Some(state),
                url: url.clone(),
            };
        }
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.document.set_location(url);
    }

    fn subscribe_pop(&self, listener: PopListener) {
        self.pop_listeners.lock().push(Arc::from(listener));
    }
}
