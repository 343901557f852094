use crate::transport::{TransportError, TransportResponse};

/// Non-2xx response. The response stays inspectable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("server responded with status {}", .response.status)]
pub struct HttpError {
    pub response: TransportResponse,
}

/// Why a request failed.
///
/// Cancellation never surfaces here; aborted requests resolve to an empty
/// payload and are observable only through the `abort` event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RequestError {
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported HTTP method `{0}`")]
    InvalidMethod(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("invalid JSON payload: {0}")]
    Json(String),
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Json(err.to_string())
    }
}

impl RequestError {
    /// The HTTP response behind the failure, if one arrived.
    pub fn response(&self) -> Option<&TransportResponse> {
        match self {
            RequestError::Http(http) => Some(&http.response),
            _ => None,
        }
    }
}
