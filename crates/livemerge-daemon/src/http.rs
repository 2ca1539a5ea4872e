use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use livemerge_core::dashboard::{Snapshot, StreamView};
use livemerge_core::{InputError, SortMode, Stream, UserPreferences};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::poll::{PollHandle, PollRequest};
use crate::SharedDashboard;

#[derive(Clone)]
pub struct HttpState {
    pub dashboard: SharedDashboard,
    pub poll: PollHandle,
    /// Poll as soon as a token arrives.
    pub auto_polling: bool,
}

/// A rejected edit, answered as `400 {"error": notice}`.
struct ApiError(InputError);

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct FocusQuery {
    focus: Option<String>,
}

#[derive(Deserialize)]
struct NewStream {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct UrlUpdate {
    #[serde(default)]
    url: String,
}

#[derive(Serialize)]
struct Updated {
    updated: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortState {
    mode: SortMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_order: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowRequest {
    #[serde(default)]
    channel_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenGrant {
    token: String,
    expires_at_ms: i64,
}

pub fn router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/streams", get(list_streams).post(add_stream))
        .route("/api/streams/:id", delete(remove_stream))
        .route("/api/streams/:id/url", put(update_stream_url))
        .route("/api/preferences", get(get_preferences).put(save_preferences))
        .route("/api/sort", get(get_sort).put(set_sort))
        .route("/api/channels", get(list_channels).post(follow_channel))
        .route("/api/channels/:id", delete(unfollow_channel))
        .route("/api/channels/:id/reload", post(reload_channel))
        .route("/api/poll", post(poll_now))
        .route("/api/token", put(set_token).delete(clear_token))
        .layer(cors)
        .with_state(state)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state: HttpState,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(state);

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_state(
    State(state): State<HttpState>,
    Query(query): Query<FocusQuery>,
) -> Json<Snapshot> {
    let mut dashboard = state.dashboard.lock().await;
    Json(dashboard.snapshot(query.focus.as_deref()))
}

async fn list_streams(
    State(state): State<HttpState>,
    Query(query): Query<FocusQuery>,
) -> Json<Vec<StreamView>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.ordered_views(query.focus.as_deref()))
}

async fn add_stream(
    State(state): State<HttpState>,
    Json(body): Json<NewStream>,
) -> Result<(StatusCode, Json<Stream>), ApiError> {
    let stream = state.dashboard.lock().await.add_stream(&body.title, &body.url)?;
    info!("HTTP API: Added stream {}", stream.id);
    Ok((StatusCode::CREATED, Json(stream)))
}

async fn remove_stream(State(state): State<HttpState>, Path(id): Path<String>) -> StatusCode {
    info!("HTTP API: Remove stream {}", id);
    if state.dashboard.lock().await.remove_stream(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn update_stream_url(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Json(body): Json<UrlUpdate>,
) -> Result<Json<Updated>, ApiError> {
    let updated = state.dashboard.lock().await.update_stream_url(&id, &body.url)?;
    Ok(Json(Updated { updated }))
}

async fn get_preferences(State(state): State<HttpState>) -> Json<UserPreferences> {
    Json(state.dashboard.lock().await.preferences().clone())
}

async fn save_preferences(
    State(state): State<HttpState>,
    Json(preferences): Json<UserPreferences>,
) -> Json<UserPreferences> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.save_preferences(&preferences);
    Json(dashboard.preferences().clone())
}

async fn get_sort(State(state): State<HttpState>) -> Json<SortState> {
    let dashboard = state.dashboard.lock().await;
    Json(SortState {
        mode: dashboard.sort_mode(),
        custom_order: Some(dashboard.custom_order().to_vec()),
    })
}

async fn set_sort(State(state): State<HttpState>, Json(body): Json<SortState>) -> Json<SortState> {
    let mut dashboard = state.dashboard.lock().await;
    match body.custom_order {
        Some(order) => dashboard.apply_custom_sort(&order, body.mode),
        None => dashboard.set_sort_mode(body.mode),
    }
    info!("HTTP API: Sort mode {}", body.mode.label());
    Json(SortState {
        mode: dashboard.sort_mode(),
        custom_order: Some(dashboard.custom_order().to_vec()),
    })
}

async fn list_channels(State(state): State<HttpState>) -> Json<Vec<String>> {
    Json(state.dashboard.lock().await.channels().to_vec())
}

async fn follow_channel(
    State(state): State<HttpState>,
    Json(body): Json<FollowRequest>,
) -> Result<StatusCode, ApiError> {
    let added = state.dashboard.lock().await.follow_channel(&body.channel_id)?;
    if !added {
        return Ok(StatusCode::OK);
    }
    info!("HTTP API: Follow channel {}", body.channel_id.trim());
    state
        .poll
        .request(PollRequest::Channel(body.channel_id.trim().to_string()));
    Ok(StatusCode::CREATED)
}

async fn unfollow_channel(State(state): State<HttpState>, Path(id): Path<String>) -> StatusCode {
    let removed = state.dashboard.lock().await.unfollow_channel(&id);
    state.poll.request(PollRequest::Cancel(id.clone()));
    if removed {
        info!("HTTP API: Unfollow channel {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn reload_channel(State(state): State<HttpState>, Path(id): Path<String>) -> StatusCode {
    if !state.dashboard.lock().await.channels().contains(&id) {
        return StatusCode::NOT_FOUND;
    }
    info!("HTTP API: Reload channel {}", id);
    state.poll.request(PollRequest::Channel(id));
    StatusCode::ACCEPTED
}

async fn poll_now(State(state): State<HttpState>) -> StatusCode {
    state.poll.request(PollRequest::All { force: false });
    StatusCode::ACCEPTED
}

async fn set_token(State(state): State<HttpState>, Json(grant): Json<TokenGrant>) -> StatusCode {
    if grant.token.trim().is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    state
        .dashboard
        .lock()
        .await
        .set_token(grant.token.trim(), grant.expires_at_ms);
    if state.auto_polling {
        state.poll.request(PollRequest::All { force: false });
    }
    StatusCode::NO_CONTENT
}

async fn clear_token(State(state): State<HttpState>) -> StatusCode {
    state.dashboard.lock().await.clear_token();
    info!("HTTP API: Token cleared");
    StatusCode::NO_CONTENT
}
