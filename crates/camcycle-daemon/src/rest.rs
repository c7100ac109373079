//! HTTP REST/SSE surface for the slideshow.
//!
//! The display page is served from elsewhere, so every endpoint allows CORS.
//! Navigation and playback map onto the rotation controller; the image
//! endpoint serves whatever snapshot the refresh task captured last.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::events::SlideshowEvent;
use crate::rotation::Direction;
use crate::state::SharedState;
use crate::tasks::{self, RefreshOutcome};

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<SharedState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/cameras", get(handle_cameras))
        .route("/api/v1/current", get(handle_current))
        .route("/api/v1/current/image", get(handle_current_image))
        .route("/api/v1/next", post(handle_next))
        .route("/api/v1/prev", post(handle_prev))
        .route("/api/v1/playback", post(handle_playback))
        .route("/api/v1/refresh", post(handle_refresh))
        .route("/api/v1/events", get(events_sse))
        .layer(cors)
        .with_state(state)
}

/// Start the REST server on the given port.
pub async fn start(port: u16, state: Arc<SharedState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("REST API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_status(State(state): State<Arc<SharedState>>) -> Json<Value> {
    let show = state.slideshow.read().await;
    let current = show.current().cloned();
    let camera_count = show.len();
    let current_index = show.current_index();
    let playing = show.is_playing();
    drop(show);

    let last_refresh = state
        .last_refresh
        .read()
        .await
        .as_ref()
        .map(|t| t.to_rfc3339());

    Json(json!({
        "running": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs_f64(),
        "playing": playing,
        "camera_count": camera_count,
        "current_index": current_index,
        "current": current,
        "last_refresh": last_refresh,
    }))
}

async fn handle_cameras(State(state): State<Arc<SharedState>>) -> Json<Value> {
    let show = state.slideshow.read().await;
    Json(json!({ "cameras": show.list().records() }))
}

async fn handle_current(State(state): State<Arc<SharedState>>) -> Response {
    match state.slideshow.read().await.current() {
        Some(camera) => Json(camera.clone()).into_response(),
        None => not_found("no camera in rotation"),
    }
}

async fn handle_current_image(State(state): State<Arc<SharedState>>) -> Response {
    match state.snapshot.read().await.as_ref() {
        Some(snapshot) => (
            [
                ("content-type", snapshot.content_type.clone()),
                ("cache-control", "no-store".to_string()),
            ],
            snapshot.bytes.clone(),
        )
            .into_response(),
        None => not_found("no snapshot captured yet"),
    }
}

async fn handle_next(State(state): State<Arc<SharedState>>) -> Response {
    navigate_response(&state, Direction::Forward).await
}

async fn handle_prev(State(state): State<Arc<SharedState>>) -> Response {
    navigate_response(&state, Direction::Back).await
}

async fn navigate_response(state: &Arc<SharedState>, direction: Direction) -> Response {
    match tasks::navigate(state, direction).await {
        Some(camera) => Json(json!({ "current": camera })).into_response(),
        None => not_found("no camera in rotation"),
    }
}

#[derive(serde::Deserialize)]
struct PlaybackBody {
    playing: bool,
}

async fn handle_playback(
    State(state): State<Arc<SharedState>>,
    Json(body): Json<PlaybackBody>,
) -> Json<Value> {
    let changed = state.slideshow.write().await.set_playing(body.playing);
    if changed {
        state.events.emit(SlideshowEvent::PlaybackChanged {
            playing: body.playing,
        });
    }
    Json(json!({ "playing": body.playing }))
}

async fn handle_refresh(State(state): State<Arc<SharedState>>) -> Response {
    match tasks::refresh_list(&state).await {
        RefreshOutcome::Swapped { camera_count } => {
            Json(json!({ "refreshed": true, "camera_count": camera_count })).into_response()
        }
        RefreshOutcome::AlreadyRunning => (
            StatusCode::ACCEPTED,
            Json(json!({ "refreshed": false, "reason": "refresh already in flight" })),
        )
            .into_response(),
        RefreshOutcome::Failed { error } => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "refreshed": false, "error": error })),
        )
            .into_response(),
    }
}

/// Server-Sent Events stream of the slideshow event bus.
async fn events_sse(
    State(state): State<Arc<SharedState>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(Event::default().data(json));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some events due to slow consumer — continue
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn not_found(reason: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": reason }))).into_response()
}
