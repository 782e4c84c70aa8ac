//! TwiML reply envelope for the messaging webhook.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub const CONTENT_TYPE: &str = "application/xml";

/// Render a `<Response>` holding a single `<Message>`.
pub fn message_response(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        html_escape::encode_text(text)
    )
}

/// A TwiML message reply; always answered with 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwimlReply(pub String);

impl TwimlReply {
    pub fn message(text: &str) -> Self {
        Self(message_response(text))
    }
}

impl IntoResponse for TwimlReply {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], self.0).into_response()
    }
}
