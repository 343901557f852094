//! In-memory site fixtures

use std::sync::Arc;

use pagewire::history::{HistoryEvent, HistoryEventKind};
use pagewire::memory::MemoryDocument;
use pagewire::transport::{MockReply, TransportResponse};
use pagewire::{
    Config, Fragment, MemoryBrowser, MockTransport, Options, Pagewire, Payload, RequestData,
};
use parking_lot::Mutex;
use serde_json::json;
use url::Url;

pub const HOME: &str = "https://news.test/";

/// A browser tab on a small news site, with the full stack attached.
pub struct Site {
    pub browser: MemoryBrowser,
    pub transport: MockTransport,
    pub wire: Pagewire,
}

impl Site {
    pub fn new(transport: MockTransport) -> Self {
        Self::with_config(transport, Config::default())
    }

    pub fn with_config(transport: MockTransport, config: Config) -> Self {
        let document = MemoryDocument::new(Url::parse(HOME).unwrap())
            .with_fragment(Fragment::new("main", "<p>home</p>"))
            .with_fragment(Fragment::new("nav", "<nav>home</nav>"))
            .with_fragment(Fragment::new("ad", "<img src=ad.png>").uncacheable());
        let browser = MemoryBrowser::with_document(document);
        let wire = Pagewire::new(browser.collaborators(Arc::new(transport.clone())), &config)
            .expect("fresh history must be unclaimed");
        Self {
            browser,
            transport,
            wire,
        }
    }

    /// Have the server answer `url` with `markup` for the main fragment.
    pub fn serve(&self, url: &str, markup: &str) {
        let path = Url::parse(HOME).unwrap().join(url).unwrap().path().to_string();
        self.transport.set_reply(
            path,
            MockReply::Respond(TransportResponse::json(
                200,
                &json!({"snippets": {"main": markup}}),
            )),
        );
    }

    /// Request `url`, whose response carries `markup` for the main fragment.
    pub async fn navigate(&self, url: &str, markup: &str, options: Options) -> Payload {
        self.serve(url, markup);
        self.wire
            .request("GET", url, RequestData::Empty, options)
            .await
            .expect("navigation should succeed")
    }

    pub fn main(&self) -> Option<String> {
        self.browser.document.fragment("main")
    }
}

/// Everything a history tracker emitted, in order.
#[derive(Clone, Default)]
pub struct HistoryLog {
    pub builds: Arc<Mutex<Vec<(String, bool, i64)>>>,
    pub restores: Arc<Mutex<Vec<(i64, String)>>>,
}

impl HistoryLog {
    pub fn attach(site: &Site) -> Self {
        let log = Self::default();
        let builds = Arc::clone(&log.builds);
        site.wire
            .history()
            .events()
            .on(HistoryEventKind::BuildState, move |event| {
                if let HistoryEvent::BuildState(build) = event.detail() {
                    builds.lock().push((
                        build.operation.as_str().to_string(),
                        build.is_initial,
                        build.entry.cursor,
                    ));
                }
            });
        let restores = Arc::clone(&log.restores);
        site.wire
            .history()
            .events()
            .on(HistoryEventKind::RestoreState, move |event| {
                if let HistoryEvent::RestoreState(restore) = event.detail() {
                    restores
                        .lock()
                        .push((restore.direction, restore.entry.href.clone()));
                }
            });
        log
    }
}
