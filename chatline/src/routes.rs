//! HTTP routes for the chatline service.
//!
//! - `POST /webhook`: Twilio WhatsApp inbound messages, answered with TwiML
//! - `POST /send`: outbound WhatsApp message through Twilio
//! - `GET /health`, `GET /ready`: liveness and readiness

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::bridge::{Bridge, ERROR_REPLY};
use crate::traits::{MessageSender, SendResult};
use crate::twiml::TwimlReply;

// ============================================================================
// State
// ============================================================================

/// Shared state for the HTTP server.
pub struct AppState {
    /// Inbound exchange orchestration (owns the conversation store)
    pub bridge: Arc<Bridge>,
    /// Outbound sender for `/send`
    pub sender: Arc<dyn MessageSender>,
}

/// Create the shared state.
pub fn create_state(bridge: Arc<Bridge>, sender: Arc<dyn MessageSender>) -> Arc<AppState> {
    Arc::new(AppState { bridge, sender })
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversations: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct WebhookForm {
    #[serde(rename = "Body", default)]
    body: Option<String>,
    #[serde(rename = "From", default)]
    from: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

const MISSING_FIELDS: &str = "Missing 'to' or 'message' in request";

/// Largest request body accepted on any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// Health Routes
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "chatline",
        version: env!("CARGO_PKG_VERSION"),
        conversations: None,
    })
}

async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let conversations = state.bridge.store().sender_count().await;
    Json(HealthResponse {
        status: "ready",
        service: "chatline",
        version: env!("CARGO_PKG_VERSION"),
        conversations: Some(conversations),
    })
}

// ============================================================================
// WhatsApp Webhook
// ============================================================================

async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    form: Result<Form<WebhookForm>, FormRejection>,
) -> TwimlReply {
    let Form(form) = match form {
        Ok(form) => form,
        Err(e) => {
            tracing::error!(error = %e, "Error in webhook: undecodable form body");
            return TwimlReply::message(ERROR_REPLY);
        }
    };

    let text = form.body.as_deref().unwrap_or_default().trim().to_string();
    let sender = form.from.unwrap_or_default();

    let reply = Arc::clone(&state.bridge).handle_incoming(sender, text).await;
    TwimlReply::message(&reply)
}

// ============================================================================
// Send API
// ============================================================================

async fn send_message(
    State(state): State<Arc<AppState>>,
    request: Result<Json<SendRequest>, JsonRejection>,
) -> impl IntoResponse {
    let fields = match request {
        Ok(Json(SendRequest {
            to: Some(to),
            message: Some(message),
        })) if !to.trim().is_empty() && !message.is_empty() => Some((to, message)),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected send request body");
            None
        }
    };

    let Some((to, message)) = fields else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: MISSING_FIELDS.to_string(),
            }),
        )
            .into_response();
    };

    tracing::info!(channel = state.sender.name(), "Sending outbound message");

    match state.sender.send(&to, &message).await {
        SendResult::Sent { sid } => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                message_sid: Some(sid),
                error: None,
            }),
        )
            .into_response(),
        SendResult::Failed { error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendResponse {
                success: false,
                message_sid: None,
                error: Some(error),
            }),
        )
            .into_response(),
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the router for all chatline endpoints.
///
/// An oversized webhook body is a form rejection inside the handler, so
/// Twilio still gets a TwiML reply. `/send` rejects it with 413 up front.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Twilio webhook
        .route(
            "/webhook",
            post(whatsapp_webhook).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        // Send API
        .route(
            "/send",
            post(send_message).layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
