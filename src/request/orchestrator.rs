use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::bus::{Event, EventBus};
use crate::document::Document;
use crate::request::payload::append_query;
use crate::request::{
    empty_payload, is_read_method, AbortEvent, BeforeEvent, CompleteEvent, ErrorEvent, HttpError,
    Options, Payload, RequestBody, RequestData, RequestDescriptor, RequestError, RequestEvent,
    RequestId, SharedOptions, StartEvent, SuccessEvent,
};
use crate::transport::{Transport, TransportError, TransportResponse};

pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";
pub const ACCEPT_HEADER: &str = "Accept";
pub const ACCEPT_JSON: &str = "application/json";

/// Issues one network request per interaction and narrates it as
/// [`RequestEvent`]s.
///
/// Cheap to clone; clones share the bus, transport and defaults.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    bus: EventBus<RequestEvent>,
    transport: Arc<dyn Transport>,
    document: Arc<dyn Document>,
    defaults: RwLock<Options>,
}

enum Outcome {
    Success(TransportResponse, Payload),
    Aborted,
    Failed(RequestError, Option<TransportResponse>),
}

impl Orchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        document: Arc<dyn Document>,
        defaults: Options,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                bus: EventBus::new(),
                transport,
                document,
                defaults: RwLock::new(defaults),
            }),
        }
    }

    pub fn events(&self) -> &EventBus<RequestEvent> {
        &self.inner.bus
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.inner.document
    }

    /// A fresh copy of the process-wide default options.
    pub fn default_options(&self) -> Options {
        self.inner.defaults.read().clone()
    }

    pub fn set_default_options(&self, defaults: Options) {
        *self.inner.defaults.write() = defaults;
    }

    /// Issue a request.
    ///
    /// Resolves to an empty object when a `before` listener suppresses the
    /// request or when it is cancelled. URL and method errors are returned
    /// before any event fires.
    pub async fn issue(
        &self,
        method: &str,
        url: &str,
        data: RequestData,
        options: Options,
    ) -> Result<Payload, RequestError> {
        self.issue_cancellable(method, url, data, options, CancellationToken::new())
            .await
    }

    /// [`issue`](Self::issue) under a caller-supplied cancellation token.
    pub async fn issue_cancellable(
        &self,
        method: &str,
        url: &str,
        data: RequestData,
        options: Options,
        cancellation: CancellationToken,
    ) -> Result<Payload, RequestError> {
        let options = options.merged_over(&self.default_options()).into_shared();
        let method = parse_method(method)?;
        let target = self.normalize_url(url)?;
        let request = build_request(method.clone(), target.clone(), &data, &options.snapshot());

        let before = self
            .inner
            .bus
            .dispatch(Event::cancelable(RequestEvent::Before(BeforeEvent {
                request,
                method,
                url: target,
                data,
                options: options.clone(),
            })));
        if before.is_suppressed() {
            debug!(url = %before.detail().request().url, "request suppressed by before listener");
            return Ok(empty_payload());
        }
        let request = match before.into_detail() {
            RequestEvent::Before(before) => before.request,
            other => other.request().clone(),
        };

        debug!(id = %request.id, method = %request.method, url = %request.url, "request started");
        self.emit(RequestEvent::Start(StartEvent {
            request: request.clone(),
            cancellation: cancellation.clone(),
            options: options.clone(),
        }));

        let outcome = self.perform(request.clone(), cancellation).await;
        self.finish(request, outcome, options)
    }

    fn normalize_url(&self, url: &str) -> Result<Url, RequestError> {
        self.inner
            .document
            .location()
            .join(url)
            .map_err(|source| RequestError::InvalidUrl {
                url: url.to_string(),
                source,
            })
    }

    async fn perform(&self, request: RequestDescriptor, cancellation: CancellationToken) -> Outcome {
        let transport_request = request.into_transport(cancellation.clone());
        let result = tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(TransportError::Aborted),
            result = self.inner.transport.send(transport_request) => result,
        };

        match result {
            Err(TransportError::Aborted) => Outcome::Aborted,
            Err(err) => Outcome::Failed(err.into(), None),
            Ok(response) if !response.is_success() => Outcome::Failed(
                HttpError {
                    response: response.clone(),
                }
                .into(),
                Some(response),
            ),
            Ok(response) => match parse_payload(&response) {
                Ok(payload) => Outcome::Success(response, payload),
                Err(err) => Outcome::Failed(err, Some(response)),
            },
        }
    }

    fn finish(
        &self,
        request: RequestDescriptor,
        outcome: Outcome,
        options: SharedOptions,
    ) -> Result<Payload, RequestError> {
        match outcome {
            Outcome::Success(response, payload) => {
                debug!(id = %request.id, status = response.status, "request succeeded");
                self.emit(RequestEvent::Success(SuccessEvent {
                    request: request.clone(),
                    response: response.clone(),
                    payload: payload.clone(),
                    options: options.clone(),
                }));
                self.emit(RequestEvent::Complete(CompleteEvent {
                    request,
                    response: Some(response),
                    payload: Some(payload.clone()),
                    error: None,
                    options,
                }));
                Ok(payload)
            }
            Outcome::Aborted => {
                debug!(id = %request.id, "request aborted");
                self.emit(RequestEvent::Abort(AbortEvent {
                    request: request.clone(),
                    options: options.clone(),
                }));
                self.emit(RequestEvent::Complete(CompleteEvent {
                    request,
                    response: None,
                    payload: None,
                    error: None,
                    options,
                }));
                Ok(empty_payload())
            }
            Outcome::Failed(error, response) => {
                debug!(id = %request.id, %error, "request failed");
                self.emit(RequestEvent::Error(ErrorEvent {
                    request: request.clone(),
                    error: error.clone(),
                    response: response.clone(),
                    options: options.clone(),
                }));
                self.emit(RequestEvent::Complete(CompleteEvent {
                    request,
                    response,
                    payload: None,
                    error: Some(error.clone()),
                    options,
                }));
                Err(error)
            }
        }
    }

    fn emit(&self, event: RequestEvent) {
        self.inner.bus.emit(event, false);
    }
}

fn parse_method(method: &str) -> Result<Method, RequestError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| RequestError::InvalidMethod(method.to_string()))
}

fn build_request(
    method: Method,
    mut url: Url,
    data: &RequestData,
    options: &Options,
) -> RequestDescriptor {
    let body = match data {
        RequestData::Empty => None,
        RequestData::Fields(fields) if is_read_method(&method) => {
            append_query(&mut url, fields);
            None
        }
        RequestData::Fields(fields) => Some(RequestBody::form(fields)),
        RequestData::Raw(body) => Some(body.clone()),
    };

    let mut headers = options.fetch.headers.clone();
    headers.insert(REQUESTED_WITH_HEADER.into(), REQUESTED_WITH_VALUE.into());
    headers.insert(ACCEPT_HEADER.into(), ACCEPT_JSON.into());

    RequestDescriptor {
        id: RequestId::new(),
        method,
        url,
        headers,
        body,
        credentials: options.credentials(),
    }
}

/// An empty body parses as an empty object so HEAD and 204 responses succeed.
fn parse_payload(response: &TransportResponse) -> Result<Payload, RequestError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty_payload());
    }
    Ok(serde_json::from_slice(&response.body)?)
}
