//! Request pipeline: options, data encoding, lifecycle events and the
//! orchestrator that drives them.

pub mod error;
pub mod events;
pub mod options;
pub mod orchestrator;
pub mod payload;

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::transport::TransportRequest;

pub use error::{HttpError, RequestError};
pub use events::{
    AbortEvent, BeforeEvent, CompleteEvent, ErrorEvent, RequestEvent, RequestEventKind,
    StartEvent, SuccessEvent,
};
pub use options::{resolve, resolve_layers, Credentials, FetchOptions, Options, SharedOptions};
pub use orchestrator::Orchestrator;
pub use payload::{empty_payload, Payload, RequestBody, RequestData};

/// Identifies one `issue` call across its lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GET and HEAD never carry a body.
pub fn is_read_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// A fully normalized request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub id: RequestId,
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub credentials: Credentials,
}

impl RequestDescriptor {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn into_transport(self, cancellation: CancellationToken) -> TransportRequest {
        TransportRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            credentials: self.credentials,
            cancellation,
        }
    }
}
