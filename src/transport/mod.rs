//! Network transport seam
//!
//! The orchestrator never talks to the network directly; it hands a
//! [`TransportRequest`] to a [`Transport`] and classifies whatever comes back.

pub mod http;
pub mod mock;

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::request::{Credentials, RequestBody};

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

/// Transport-level failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The request's cancellation token fired.
    #[error("request aborted")]
    Aborted,

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

/// Everything a transport needs to perform one call.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub credentials: Credentials,
    pub cancellation: CancellationToken,
}

/// A completed HTTP exchange. Header names are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response
            .headers
            .insert("content-type".into(), "application/json".into());
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the call. Implementations should watch `request.cancellation`
    /// and return [`TransportError::Aborted`] when it fires.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
