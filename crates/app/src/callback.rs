use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use farm_helper_advice::WebhookResponse;
use farm_helper_chat::InboundNotification;
use snafu::ResultExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::error::{AppResult, ServeCallbackSnafu};

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Where the advice service posts answers.
pub const WEBHOOK_RESPONSE_PATH: &str = "/webhook-response";

#[derive(Clone)]
struct CallbackState {
    inbound: mpsc::UnboundedSender<InboundNotification>,
}

pub fn callback_routes(inbound: mpsc::UnboundedSender<InboundNotification>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(WEBHOOK_RESPONSE_PATH, post(receive_response))
        .with_state(CallbackState { inbound })
}

pub async fn serve(
    listener: TcpListener,
    inbound: mpsc::UnboundedSender<InboundNotification>,
) -> AppResult<()> {
    axum::serve(listener, callback_routes(inbound))
        .await
        .context(ServeCallbackSnafu {
            stage: "serve-callback-routes",
        })
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

// Filtering is the chat loop's job; this handler only forwards what it received.
async fn receive_response(
    State(state): State<CallbackState>,
    headers: HeaderMap,
    Json(payload): Json<WebhookResponse>,
) -> StatusCode {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    tracing::debug!(
        origin = ?origin,
        message_id = %payload.message_id,
        "answer notification received"
    );

    match state
        .inbound
        .send(InboundNotification::new(origin, payload))
    {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => {
            tracing::warn!("chat loop has stopped; answer notification dropped");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
