//! Scripted transport for deterministic testing
//!
//! Implements [`Transport`] without touching the network: replies are looked
//! up by request path, and every request is captured for later assertions.
//!
//! # Example
//! ```no_run
//! use pagewire::transport::{MockReply, MockTransport, TransportResponse};
//! use serde_json::json;
//!
//! let transport = MockTransport::new()
//!     .with_json("/articles", json!({"snippets": {}}))
//!     .with_reply("/slow", MockReply::Hang);
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// How the mock answers a request.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(TransportResponse),
    Fail(TransportError),
    /// Answer after a delay, unless cancelled first.
    Delayed(Duration, TransportResponse),
    /// Never answer; resolves to `Aborted` once the request is cancelled.
    Hang,
}

/// Mock transport for tests and offline tooling.
#[derive(Clone)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<(String, MockReply)>>>,
    fallback: MockReply,
    captured: Arc<Mutex<Vec<TransportRequest>>>,
    arrived: Arc<Notify>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A transport answering every request with `200 {}`.
    pub fn new() -> Self {
        Self {
            routes: Arc::new(Mutex::new(Vec::new())),
            fallback: MockReply::Respond(TransportResponse::json(
                200,
                &Value::Object(Default::default()),
            )),
            captured: Arc::new(Mutex::new(Vec::new())),
            arrived: Arc::new(Notify::new()),
        }
    }

    /// Answer requests whose URL path equals `path`.
    pub fn with_reply(self, path: impl Into<String>, reply: MockReply) -> Self {
        self.routes.lock().push((path.into(), reply));
        self
    }

    pub fn with_json(self, path: impl Into<String>, body: Value) -> Self {
        self.with_reply(path, MockReply::Respond(TransportResponse::json(200, &body)))
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Replace the reply for `path` on an already shared transport.
    pub fn set_reply(&self, path: impl Into<String>, reply: MockReply) {
        let path = path.into();
        let mut routes = self.routes.lock();
        routes.retain(|(existing, _)| *existing != path);
        routes.push((path, reply));
    }

    /// All requests received so far.
    pub fn captured_requests(&self) -> Vec<TransportRequest> {
        self.captured.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.captured.lock().len()
    }

    /// Wait until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            if self.request_count() >= count {
                return;
            }
            notified.await;
        }
    }

    fn reply_for(&self, request: &TransportRequest) -> MockReply {
        self.routes
            .lock()
            .iter()
            .find(|(path, _)| path == request.url.path())
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let reply = self.reply_for(&request);
        let cancellation = request.cancellation.clone();
        self.captured.lock().push(request);
        self.arrived.notify_waiters();

        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(error) => Err(error),
            MockReply::Delayed(delay, response) => {
                tokio::select! {
                    _ = cancellation.cancelled() => Err(TransportError::Aborted),
                    _ = tokio::time::sleep(delay) => Ok(response),
                }
            }
            MockReply::Hang => {
                cancellation.cancelled().await;
                Err(TransportError::Aborted)
            }
        }
    }
}
