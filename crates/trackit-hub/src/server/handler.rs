//! Request handlers
//!
//! WebSocket upgrade, event publishing and diagnostics.

use super::auth::AuthUser;
use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::broadcast::EventKind;
use crate::hub::{Hub, HubStatsSnapshot};
use crate::pump::{run_connection, PumpConfig};
use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use trackit_common::AppError;

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Access token; browsers cannot set headers on WebSocket requests
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// GET /ws?token=<jwt>
///
/// The credential is resolved before upgrading, so rejected requests never
/// touch the hub.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: Option<WebSocketUpgrade>,
) -> ApiResult<Response> {
    let token = params
        .token
        .filter(|token| !token.is_empty())
        .or_else(|| bearer.map(|TypedHeader(Authorization(bearer))| bearer.token().to_string()))
        .ok_or(AppError::MissingAuth)?;

    let user_id = state.identity().authenticate(&token).await?;
    let ws = ws.ok_or(ApiError::UpgradeRequired)?;

    let hub_config = &state.config().hub;
    let mailbox_capacity = hub_config.mailbox_capacity;
    let pump_config = PumpConfig::from(hub_config);
    let hub = state.hub().clone();

    let response = ws
        .max_message_size(hub_config.max_message_size)
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            handle_socket(hub, user_id, socket, mailbox_capacity, pump_config)
        });

    Ok(response)
}

/// Drive an upgraded socket until either pump ends it
async fn handle_socket(
    hub: Hub,
    user_id: String,
    socket: WebSocket,
    mailbox_capacity: usize,
    config: PumpConfig,
) {
    let (sink, stream) = socket.split();

    match run_connection(hub, user_id.clone(), stream, sink, mailbox_capacity, config).await {
        Ok(reason) => {
            tracing::debug!(user_id = %user_id, reason = ?reason, "WebSocket connection closed");
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Connection refused by hub");
        }
    }
}

/// Event submitted for broadcast
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Acknowledgement for an accepted event
#[derive(Debug, Serialize)]
pub struct PublishAccepted {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Publish an event to every live connection
///
/// POST /api/events
pub async fn publish_event(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PublishAccepted>)> {
    let Json(request) = body.map_err(|e| AppError::invalid_input(e.body_text()))?;

    let kind = request.kind.trim();
    if kind.is_empty() {
        return Err(AppError::invalid_input("event type must not be empty").into());
    }

    if EventKind::from_name(kind).is_none() {
        tracing::debug!(kind = %kind, "Publishing event of unrecognized kind");
    }

    state.broadcaster().publish(kind, &request.data)?;

    tracing::info!(user_id = %auth.user_id, kind = %kind, "Event published");

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishAccepted {
            kind: kind.to_string(),
        }),
    ))
}

/// Live connection diagnostics
#[derive(Debug, Serialize)]
pub struct HubStatsResponse {
    pub connections: usize,
    pub users: Vec<String>,
    pub stats: HubStatsSnapshot,
}

/// GET /ws/stats
pub async fn hub_stats(State(state): State<AppState>) -> Json<HubStatsResponse> {
    let hub = state.hub();
    Json(HubStatsResponse {
        connections: hub.connection_count(),
        users: hub.connected_users(),
        stats: hub.stats(),
    })
}

/// Root health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /
pub async fn root() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        message: "Server is running",
    })
}

/// GET /health
pub async fn health_check() -> &'static str {
    "OK"
}
