use serde_json::Value;

/// Callback receiving the state object of a native pop navigation.
pub type PopListener = Box<dyn Fn(Option<Value>) + Send + Sync>;

/// The browser's native history stack.
///
/// Failures inside `push_state`/`replace_state` (quota, serialization) are
/// the implementation's to raise; the tracker does not recover from them.
pub trait NativeHistory: Send + Sync {
    /// Register the single owner. Returns false if already claimed.
    fn claim(&self) -> bool;

    fn push_state(&self, state: Value, url: &str);

    fn replace_state(&self, state: Value, url: &str);

    fn subscribe_pop(&self, listener: PopListener);
}
