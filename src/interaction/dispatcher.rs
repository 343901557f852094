use std::sync::Arc;

use tracing::debug;
use url::{Origin, Url};

use crate::bus::{Event, EventBus};
use crate::interaction::{Element, InteractionDetail, InteractionError, InteractionEvent};
use crate::request::{empty_payload, Options, Orchestrator, Payload, RequestData};

/// Issues requests on behalf of clicked anchors and submitted forms.
#[derive(Clone)]
pub struct InteractionDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    bus: EventBus<InteractionEvent>,
    orchestrator: Orchestrator,
    allowed_origins: Vec<Origin>,
}

struct Target {
    method: String,
    url: Url,
    data: RequestData,
}

impl InteractionDispatcher {
    /// `allowed_origins` lists cross-origin targets that may still be
    /// requested, e.g. `https://api.example.com`. Unparseable entries are
    /// ignored.
    pub fn new(orchestrator: &Orchestrator, allowed_origins: &[String]) -> Self {
        let allowed_origins = allowed_origins
            .iter()
            .filter_map(|origin| match Url::parse(origin) {
                Ok(url) => Some(url.origin()),
                Err(err) => {
                    debug!(%origin, %err, "ignoring unparseable allowed origin");
                    None
                }
            })
            .collect();
        Self {
            inner: Arc::new(DispatcherInner {
                bus: EventBus::new(),
                orchestrator: orchestrator.clone(),
                allowed_origins,
            }),
        }
    }

    pub fn events(&self) -> &EventBus<InteractionEvent> {
        &self.inner.bus
    }

    /// Follow an anchor, or submit the form owning a submitter.
    pub async fn click(
        &self,
        element: &Element,
        options: Options,
    ) -> Result<Payload, InteractionError> {
        if element.is_submitter() && element.owning_form().is_some() {
            return self.submit(element, options).await;
        }
        if !element.is_anchor() {
            return Err(InteractionError::UnsupportedElement(element.tag.clone()));
        }
        let href = element
            .attribute("href")
            .ok_or_else(|| InteractionError::UnsupportedElement(element.tag.clone()))?;
        let target = Target {
            method: "GET".to_string(),
            url: self.inner.resolve(href)?,
            data: RequestData::Empty,
        };
        self.inner.dispatch(element, target, options).await
    }

    /// Submit a form, or the form owning a submitter.
    ///
    /// The submitter's `formmethod`/`formaction` override the form's, and its
    /// own `name=value` is appended after the form's fields.
    pub async fn submit(
        &self,
        element: &Element,
        options: Options,
    ) -> Result<Payload, InteractionError> {
        let (form, submitter) = if element.is_form() {
            (element, None)
        } else {
            match element.owning_form() {
                Some(form) if element.is_submitter() => (form, Some(element)),
                _ => return Err(InteractionError::UnsupportedElement(element.tag.clone())),
            }
        };

        let pick = |submitter_attr: &str, form_attr: &str| {
            submitter
                .and_then(|submitter| submitter.attribute(submitter_attr))
                .or_else(|| form.attribute(form_attr))
                .filter(|value| !value.trim().is_empty())
        };
        let method = pick("formmethod", "method").unwrap_or("GET").to_ascii_uppercase();
        let url = match pick("formaction", "action") {
            Some(action) => self.inner.resolve(action)?,
            None => self.inner.orchestrator.document().location(),
        };

        let mut fields = form.fields().to_vec();
        if let Some(name) = submitter.and_then(|submitter| submitter.attribute("name")) {
            let value = submitter
                .and_then(|submitter| submitter.attribute("value"))
                .unwrap_or_default();
            fields.push((name.to_string(), value.to_string()));
        }
        let data = if fields.is_empty() {
            RequestData::Empty
        } else {
            RequestData::from_pairs(fields)
        };

        self.inner
            .dispatch(element, Target { method, url, data }, options)
            .await
    }
}

impl DispatcherInner {
    fn resolve(&self, href: &str) -> Result<Url, InteractionError> {
        self.orchestrator
            .document()
            .location()
            .join(href)
            .map_err(|source| InteractionError::InvalidUrl {
                url: href.to_string(),
                source,
            })
    }

    fn is_allowed(&self, url: &Url) -> bool {
        let origin = url.origin();
        origin == self.orchestrator.document().location().origin()
            || self.allowed_origins.contains(&origin)
    }

    async fn dispatch(
        &self,
        element: &Element,
        target: Target,
        options: Options,
    ) -> Result<Payload, InteractionError> {
        if !self.is_allowed(&target.url) {
            return Err(InteractionError::DisallowedOrigin(target.url.to_string()));
        }

        let options = options.into_shared();
        let event = self.bus.dispatch(Event::cancelable(InteractionEvent::Interaction(
            InteractionDetail {
                element: element.clone(),
                options: options.clone(),
            },
        )));
        if event.is_suppressed() {
            debug!(url = %target.url, "interaction suppressed");
            return Ok(empty_payload());
        }

        let payload = self
            .orchestrator
            .issue(&target.method, target.url.as_str(), target.data, options.snapshot())
            .await?;
        Ok(payload)
    }
}
