//! End-to-end navigation through the assembled stack

use std::time::Duration;

use pagewire::interaction::Element;
use pagewire::transport::MockReply;
use pagewire::{
    Config, HistoryMode, MockTransport, Options, RequestData, StorageKind, UniqueKey,
};
use reqwest::Method;
use serde_json::json;

use super::common::fixtures::{HistoryLog, Site};

#[tokio::test]
async fn test_back_restores_previous_page() {
    let site = Site::new(MockTransport::new());
    let log = HistoryLog::attach(&site);

    site.navigate("/a", "<p>a</p>", Options::new()).await;
    site.navigate("/b", "<p>b</p>", Options::new()).await;
    assert_eq!(site.wire.history().cursor(), 2);
    assert_eq!(site.main().as_deref(), Some("<p>b</p>"));
    let scripts = site.browser.document.script_loads();

    assert!(site.browser.history.back());

    assert_eq!(
        *log.builds.lock(),
        vec![
            ("replace".to_string(), true, 0),
            ("push".to_string(), false, 1),
            ("push".to_string(), false, 2),
        ]
    );
    assert_eq!(
        *log.restores.lock(),
        vec![(-1, "https://news.test/a".to_string())]
    );
    assert_eq!(site.wire.history().cursor(), 1);
    assert_eq!(site.main().as_deref(), Some("<p>a</p>"));

    let applied = site.browser.document.applied();
    let restored = applied.last().unwrap();
    assert_eq!(restored.get("main"), Some("<p>a</p>"));
    assert_eq!(restored.get("nav"), Some("<nav>home</nav>"));
    assert!(restored.get("ad").is_none());
    assert_eq!(site.browser.document.script_loads(), scripts + 1);

    assert!(site.browser.history.back());
    assert_eq!(site.main().as_deref(), Some("<p>home</p>"));
    assert_eq!(site.wire.history().cursor(), 0);
}

#[tokio::test]
async fn test_disabled_history_leaves_native_stack_alone() {
    let site = Site::new(MockTransport::new());
    let log = HistoryLog::attach(&site);

    site.navigate(
        "/search?q=rust",
        "<p>results</p>",
        Options::new().with_history(HistoryMode::Disabled),
    )
    .await;

    assert!(log.builds.lock().is_empty());
    assert_eq!(site.browser.history.push_count(), 0);
    assert_eq!(site.browser.history.replace_count(), 0);
    assert!(!site.wire.history().is_initialized());
}

#[tokio::test]
async fn test_session_cache_survives_back_and_forward() {
    let config = Config {
        defaults: Options::new().with_snippet_cache(StorageKind::Session),
        ..Config::default()
    };
    let site = Site::with_config(MockTransport::new(), config);
    let log = HistoryLog::attach(&site);

    site.navigate("/a", "<p>a</p>", Options::new()).await;
    site.navigate("/b", "<p>b</p>", Options::new()).await;
    assert_eq!(site.browser.tab_store.len(), 3);

    assert!(site.browser.history.back());
    assert_eq!(site.main().as_deref(), Some("<p>a</p>"));
    assert!(site.browser.history.back());
    assert_eq!(site.main().as_deref(), Some("<p>home</p>"));

    assert!(site.browser.history.forward());
    assert_eq!(site.main().as_deref(), Some("<p>a</p>"));
    assert!(site.browser.history.forward());
    assert_eq!(site.main().as_deref(), Some("<p>b</p>"));
    assert_eq!(
        *log.restores.lock(),
        vec![
            (-1, "https://news.test/a".to_string()),
            (-1, "https://news.test/".to_string()),
            (1, "https://news.test/a".to_string()),
            (1, "https://news.test/b".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_uncached_entries_are_refetched_on_back() {
    let config = Config {
        defaults: Options::new().with_snippet_cache(StorageKind::Off),
        ..Config::default()
    };
    let transport = MockTransport::new();
    let site = Site::with_config(transport.clone(), config);

    site.navigate("/a", "<p>a</p>", Options::new()).await;
    site.navigate("/b", "<p>b</p>", Options::new()).await;
    assert!(site.browser.history.back());
    site.wire.settle().await;

    let sent = transport.captured_requests();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].method, Method::GET);
    assert_eq!(sent[2].url.as_str(), "https://news.test/a");
    assert_eq!(site.browser.history.push_count(), 2);
    assert_eq!(site.main().as_deref(), Some("<p>a</p>"));
    assert_eq!(
        site.browser.document.applied().last().and_then(|s| s.get("main").map(str::to_string)),
        Some("<p>a</p>".to_string())
    );
}

#[tokio::test]
async fn test_refetched_entry_shows_the_current_server_content() {
    let config = Config {
        defaults: Options::new().with_snippet_cache(StorageKind::Off),
        ..Config::default()
    };
    let site = Site::with_config(MockTransport::new(), config);

    site.navigate("/a", "<p>a</p>", Options::new()).await;
    site.navigate("/b", "<p>b</p>", Options::new()).await;
    site.serve("/a", "<p>a, edited</p>");
    assert!(site.browser.history.back());
    site.wire.settle().await;

    assert_eq!(site.main().as_deref(), Some("<p>a, edited</p>"));
}

#[tokio::test]
async fn test_form_attributes_pick_history_mode() {
    let transport = MockTransport::new();
    let site = Site::new(transport.clone());
    let form = Element::form("post", "/comments")
        .with_attribute("data-wire-history", "replace")
        .with_field("text", "first!");
    let button = Element::button().within(form);

    site.wire.click(&button, Options::new()).await.unwrap();

    let sent = transport.captured_requests();
    assert_eq!(sent[0].method, Method::POST);
    assert_eq!(sent[0].url.as_str(), "https://news.test/comments");
    assert_eq!(site.browser.history.push_count(), 0);
    assert_eq!(site.browser.history.replace_count(), 2);
    assert_eq!(
        site.browser.history.current().url.as_str(),
        "https://news.test/comments"
    );
}

#[tokio::test]
async fn test_redirect_through_facade_records_target_only() {
    let transport = MockTransport::new()
        .with_json("/login", json!({"redirect": "/inbox"}))
        .with_json("/inbox", json!({"snippets": {"main": "<p>inbox</p>"}}));
    let site = Site::new(transport.clone());

    let payload = site
        .wire
        .request("POST", "/login", RequestData::from_pairs([("user", "ada")]), Options::new())
        .await
        .unwrap();
    site.wire.settle().await;

    assert_eq!(payload, json!({"redirect": "/inbox"}));
    assert_eq!(transport.request_count(), 2);
    assert_eq!(site.browser.history.push_count(), 1);
    assert_eq!(
        site.browser.history.current().url.as_str(),
        "https://news.test/inbox"
    );
    assert_eq!(site.main().as_deref(), Some("<p>inbox</p>"));
}

#[tokio::test]
async fn test_abort_all_resolves_pending_requests_empty() {
    let transport = MockTransport::new()
        .with_reply("/feed", MockReply::Hang)
        .with_reply(
            "/pinned",
            MockReply::Delayed(
                Duration::from_millis(50),
                pagewire::transport::TransportResponse::json(200, &json!({"pinned": true})),
            ),
        );
    let site = Site::new(transport.clone());

    let feed = tokio::spawn({
        let wire = site.wire.clone();
        async move {
            wire.request("GET", "/feed", RequestData::Empty, Options::new())
                .await
        }
    });
    let pinned = tokio::spawn({
        let wire = site.wire.clone();
        async move {
            wire.request(
                "GET",
                "/pinned",
                RequestData::Empty,
                Options::new()
                    .with_abort(false)
                    .with_unique(UniqueKey::Disabled)
                    .with_history(HistoryMode::Disabled),
            )
            .await
        }
    });
    transport.wait_for_requests(2).await;

    assert_eq!(site.wire.abort_all(), 1);
    assert_eq!(feed.await.unwrap().unwrap(), json!({}));
    assert_eq!(pinned.await.unwrap().unwrap(), json!({"pinned": true}));
    assert_eq!(site.wire.aborts().in_flight(), 0);
    assert_eq!(site.browser.history.push_count(), 0);
}
