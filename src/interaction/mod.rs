//! Interaction dispatch
//!
//! Turns a clicked anchor or a submitted form into an orchestrator request,
//! after giving listeners a chance to read per-element configuration.

pub mod dispatcher;
pub mod element;
pub mod events;

use crate::request::RequestError;

pub use dispatcher::InteractionDispatcher;
pub use element::Element;
pub use events::{InteractionDetail, InteractionEvent, InteractionEventKind};

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("<{0}> elements cannot trigger a request")]
    UnsupportedElement(String),

    #[error("origin of `{0}` is not allowed")]
    DisallowedOrigin(String),

    #[error("invalid target URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Request(#[from] RequestError),
}
