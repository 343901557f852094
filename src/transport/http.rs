use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::config::TransportConfig;
use crate::request::Credentials;
use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// `reqwest`-backed transport.
///
/// Requests with `Credentials::Omit` go through a second client that keeps
/// no cookie jar.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    anonymous: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(config, true)?,
            anonymous: build_client(config, false)?,
        })
    }
}

fn build_client(config: &TransportConfig, cookies: bool) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .cookie_store(cookies);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let client = match request.credentials {
            Credentials::Omit => &self.anonymous,
            Credentials::SameOrigin | Credentials::Include => &self.client,
        };

        let mut builder = client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            if let Some(content_type) = &body.content_type {
                builder = builder.header(CONTENT_TYPE, content_type.as_str());
            }
            builder = builder.body(body.bytes);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.bytes().await?.to_vec();
            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        };

        tokio::select! {
            biased;
            _ = request.cancellation.cancelled() => Err(TransportError::Aborted),
            result = exchange => result,
        }
    }
}
