//! Local HTTP server speaking the partial-navigation JSON protocol

use std::time::Duration;

use axum::extract::RawQuery;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::json;
use url::Url;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<serde_json::Value> {
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "body": body,
        "requested_with": header(&headers, "x-requested-with"),
        "accept": header(&headers, "accept"),
        "content_type": header(&headers, "content-type"),
        "user_agent": header(&headers, "user-agent"),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"error": "no such page"}))) }),
        )
        .route("/broken", get(|| async { "this is not json" }))
        .route("/empty", get(|| async { StatusCode::OK.into_response() }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!({}))
            }),
        )
        .route(
            "/login",
            any(|| async { Json(json!({"redirect": "/echo?from=login"})) }),
        )
}

/// Serve [`router`] on an ephemeral port of the current runtime.
pub async fn spawn() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router()).await.expect("serve");
    });
    Url::parse(&format!("http://{addr}/")).expect("server url")
}

/// Serve [`router`] from a background thread, for callers without a runtime.
pub fn spawn_detached() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test server");
    listener.set_nonblocking(true).expect("nonblocking listener");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("server runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
            axum::serve(listener, router()).await.expect("serve");
        });
    });
    Url::parse(&format!("http://{addr}/")).expect("server url")
}
