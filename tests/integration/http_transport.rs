//! The reqwest transport against a local server

use std::sync::Arc;
use std::time::Duration;

use pagewire::config::TransportConfig;
use pagewire::{
    Config, HistoryMode, HttpTransport, MemoryBrowser, Options, Pagewire, RequestData,
    RequestError,
};
use serde_json::json;

use super::common::server;

async fn stack() -> (MemoryBrowser, Pagewire) {
    let base = server::spawn().await;
    let browser = MemoryBrowser::new(base);
    let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
    let wire = Pagewire::new(browser.collaborators(Arc::new(transport)), &Config::default())
        .unwrap();
    (browser, wire)
}

fn quiet() -> Options {
    Options::new().with_history(HistoryMode::Disabled)
}

#[tokio::test]
async fn test_get_sends_protocol_headers_and_query() {
    let (_browser, wire) = stack().await;

    let payload = wire
        .request("GET", "/echo", RequestData::from_pairs([("q", "1")]), quiet())
        .await
        .unwrap();

    assert_eq!(payload["method"], "GET");
    assert_eq!(payload["query"], "q=1");
    assert_eq!(payload["body"], "");
    assert_eq!(payload["requested_with"], "XMLHttpRequest");
    assert_eq!(payload["accept"], "application/json");
    assert!(payload["user_agent"]
        .as_str()
        .unwrap()
        .starts_with("pagewire/"));
}

#[tokio::test]
async fn test_post_sends_form_body() {
    let (_browser, wire) = stack().await;

    let payload = wire
        .request(
            "post",
            "/echo",
            RequestData::from_pairs([("title", "Hello world"), ("tag", "a&b")]),
            quiet(),
        )
        .await
        .unwrap();

    assert_eq!(payload["method"], "POST");
    assert_eq!(payload["query"], json!(null));
    assert_eq!(payload["content_type"], "application/x-www-form-urlencoded");
    assert_eq!(payload["body"], "title=Hello+world&tag=a%26b");
}

#[tokio::test]
async fn test_failures_are_classified() {
    let (_browser, wire) = stack().await;

    let missing = wire
        .request("GET", "/missing", RequestData::Empty, quiet())
        .await
        .unwrap_err();
    assert!(matches!(&missing, RequestError::Http(_)));
    assert_eq!(missing.response().map(|response| response.status), Some(404));

    let broken = wire
        .request("GET", "/broken", RequestData::Empty, quiet())
        .await
        .unwrap_err();
    assert!(matches!(broken, RequestError::Json(_)));

    let empty = wire
        .request("GET", "/empty", RequestData::Empty, quiet())
        .await
        .unwrap();
    assert_eq!(empty, json!({}));
}

#[tokio::test]
async fn test_abort_all_cancels_slow_request() {
    let (_browser, wire) = stack().await;

    let slow = tokio::spawn({
        let wire = wire.clone();
        async move { wire.request("GET", "/slow", RequestData::Empty, quiet()).await }
    });
    while wire.aborts().in_flight() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(wire.abort_all(), 1);
    let payload = tokio::time::timeout(Duration::from_secs(5), slow)
        .await
        .expect("aborted request should resolve promptly")
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!({}));
}

#[tokio::test]
async fn test_soft_redirect_follows_to_echo() {
    let (browser, wire) = stack().await;

    let payload = wire
        .request("POST", "/login", RequestData::Empty, Options::new())
        .await
        .unwrap();
    wire.settle().await;

    assert_eq!(payload, json!({"redirect": "/echo?from=login"}));
    let location = browser.history.current().url;
    assert_eq!(location.path(), "/echo");
    assert_eq!(location.query(), Some("from=login"));
    assert_eq!(browser.history.push_count(), 1);
}
