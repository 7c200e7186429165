//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::state::{AppState, DisplayState};
use super::responses::{ApiResponse, HealthResponse, StatusResponse};

/// Record the action and turn a clock result into a response
fn respond(
    state: &AppState,
    action: &str,
    message: &str,
    result: Result<DisplayState, String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    match result {
        Ok(display) => {
            state.record_action(action);
            info!("{} endpoint called - {}", action, message);
            Ok(Json(ApiResponse::for_display(message.to_string(), display)))
        }
        Err(e) => {
            error!("Failed to {}: {}", action, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /display - Return what the clock face shows
pub async fn display_handler(State(state): State<Arc<AppState>>) -> Result<Json<DisplayState>, StatusCode> {
    state.clock.display_state().map(Json).map_err(|e| {
        error!("Failed to get display state: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle POST /toggle - Start or stop the countdown
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    let result = state.clock.toggle();
    let message = match &result {
        Ok(display) if display.running => "Clock started",
        _ => "Clock stopped",
    };
    respond(&state, "toggle", message, result)
}

/// Handle POST /reset - Stop and restore defaults
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond(&state, "reset", "Clock reset to defaults", state.clock.reset())
}

/// Handle POST /break/increment
pub async fn break_increment_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond(&state, "break-increment", "Break length increased", state.clock.set_break_length(1))
}

/// Handle POST /break/decrement
pub async fn break_decrement_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond(&state, "break-decrement", "Break length decreased", state.clock.set_break_length(-1))
}

/// Handle POST /session/increment
pub async fn session_increment_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond(&state, "session-increment", "Session length increased", state.clock.set_session_length(1))
}

/// Handle POST /session/decrement
pub async fn session_decrement_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, StatusCode> {
    respond(&state, "session-decrement", "Session length decreased", state.clock.set_session_length(-1))
}

/// Handle GET /status - Return display, countdown internals and server info
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let machine = match state.clock.snapshot() {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to get clock snapshot: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        display: machine.display_state(),
        elapsed_ticks: machine.state.elapsed_ticks,
        remaining_seconds: machine.remaining_seconds(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /events - Stream clock events as server-sent events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events_rx = state.clock.subscribe_events();

    let stream = stream::unfold(events_rx, |mut events_rx| async move {
        loop {
            match events_rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            warn!("Failed to serialize clock event: {}", e);
                            continue;
                        }
                    };
                    let sse = Event::default().event(event.name()).data(data);
                    return Some((Ok::<_, Infallible>(sse), events_rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
