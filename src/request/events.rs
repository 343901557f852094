use reqwest::Method;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::bus::BusEvent;
use crate::request::{Payload, RequestData, RequestDescriptor, RequestError, SharedOptions};
use crate::transport::TransportResponse;

/// Lifecycle events emitted by the orchestrator, in order
/// `Before → Start → {Success | Error | Abort} → Complete`.
#[derive(Debug)]
pub enum RequestEvent {
    /// Cancelable; suppressing it skips the request entirely.
    Before(BeforeEvent),
    Start(StartEvent),
    Success(SuccessEvent),
    Error(ErrorEvent),
    Abort(AbortEvent),
    Complete(CompleteEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestEventKind {
    Before,
    Start,
    Success,
    Error,
    Abort,
    Complete,
}

impl BusEvent for RequestEvent {
    type Kind = RequestEventKind;

    fn kind(&self) -> RequestEventKind {
        match self {
            RequestEvent::Before(_) => RequestEventKind::Before,
            RequestEvent::Start(_) => RequestEventKind::Start,
            RequestEvent::Success(_) => RequestEventKind::Success,
            RequestEvent::Error(_) => RequestEventKind::Error,
            RequestEvent::Abort(_) => RequestEventKind::Abort,
            RequestEvent::Complete(_) => RequestEventKind::Complete,
        }
    }
}

impl RequestEvent {
    pub fn options(&self) -> &SharedOptions {
        match self {
            RequestEvent::Before(event) => &event.options,
            RequestEvent::Start(event) => &event.options,
            RequestEvent::Success(event) => &event.options,
            RequestEvent::Error(event) => &event.options,
            RequestEvent::Abort(event) => &event.options,
            RequestEvent::Complete(event) => &event.options,
        }
    }

    pub fn request(&self) -> &RequestDescriptor {
        match self {
            RequestEvent::Before(event) => &event.request,
            RequestEvent::Start(event) => &event.request,
            RequestEvent::Success(event) => &event.request,
            RequestEvent::Error(event) => &event.request,
            RequestEvent::Abort(event) => &event.request,
            RequestEvent::Complete(event) => &event.request,
        }
    }
}

#[derive(Debug)]
pub struct BeforeEvent {
    /// Pending request; listeners may adjust it before it is sent.
    pub request: RequestDescriptor,
    pub method: Method,
    pub url: Url,
    pub data: RequestData,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct StartEvent {
    pub request: RequestDescriptor,
    /// Cancelling this token aborts the in-flight call.
    pub cancellation: CancellationToken,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct SuccessEvent {
    pub request: RequestDescriptor,
    pub response: TransportResponse,
    pub payload: Payload,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct ErrorEvent {
    pub request: RequestDescriptor,
    pub error: RequestError,
    pub response: Option<TransportResponse>,
    pub options: SharedOptions,
}

#[derive(Debug)]
pub struct AbortEvent {
    pub request: RequestDescriptor,
    pub options: SharedOptions,
}

/// Always the last event of a request. After an abort, `payload` and
/// `error` are both `None`.
#[derive(Debug)]
pub struct CompleteEvent {
    pub request: RequestDescriptor,
    pub response: Option<TransportResponse>,
    pub payload: Option<Payload>,
    pub error: Option<RequestError>,
    pub options: SharedOptions,
}
