#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TOKEN: &str = "test-token";

/// Canned YouTube Data API. Channels in `live` map to a live video ID; any
/// channel in `broken` answers the search with a 500.
#[derive(Default)]
pub struct MockYouTube {
    pub live: HashMap<String, String>,
    pub titles: HashMap<String, String>,
    pub broken: Vec<String>,
    pub searches: AtomicUsize,
}

impl MockYouTube {
    pub fn live(mut self, channel_id: &str, video_id: &str) -> Self {
        self.live.insert(channel_id.into(), video_id.into());
        self
    }

    pub fn titled(mut self, channel_id: &str, title: &str) -> Self {
        self.titles.insert(channel_id.into(), title.into());
        self
    }

    pub fn broken(mut self, channel_id: &str) -> Self {
        self.broken.push(channel_id.into());
        self
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn search(
    State(mock): State<Arc<MockYouTube>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    mock.searches.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    if query.get("eventType").map(String::as_str) != Some("live")
        || query.get("type").map(String::as_str) != Some("video")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad query"})));
    }

    let channel_id = query.get("channelId").cloned().unwrap_or_default();
    if mock.broken.contains(&channel_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "backend"})));
    }

    let items: Vec<Value> = mock
        .live
        .get(&channel_id)
        .map(|video_id| {
            json!({
                "id": { "kind": "youtube#video", "videoId": video_id },
                "snippet": {
                    "title": "Live now",
                    "channelId": channel_id,
                    "channelTitle": mock.titles.get(&channel_id).cloned().unwrap_or_default(),
                    "liveBroadcastContent": "live"
                }
            })
        })
        .into_iter()
        .collect();
    (StatusCode::OK, Json(json!({ "items": items })))
}

async fn channels(
    State(mock): State<Arc<MockYouTube>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    let channel_id = query.get("id").cloned().unwrap_or_default();
    let items: Vec<Value> = mock
        .titles
        .get(&channel_id)
        .map(|title| json!({ "snippet": { "title": title } }))
        .into_iter()
        .collect();
    (StatusCode::OK, Json(json!({ "items": items })))
}

/// Serve `mock` on an ephemeral port; returns the API base URL.
pub async fn serve(mock: Arc<MockYouTube>) -> String {
    let app = Router::new()
        .route("/youtube/v3/search", get(search))
        .route("/youtube/v3/channels", get(channels))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr: SocketAddr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}/youtube/v3")
}
