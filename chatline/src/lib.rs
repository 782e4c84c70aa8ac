//! Chatline - WhatsApp chat bridge backed by a hosted LLM.
//!
//! Twilio posts every inbound WhatsApp message to `/webhook`; chatline
//! records it in the sender's conversation, asks the completion provider for
//! a reply using a short history window, and answers with TwiML. A separate
//! `/send` endpoint pushes an outbound message through the Twilio REST API.
//!
//! ## Architecture
//!
//! ```text
//! WhatsApp → Twilio → /webhook → Bridge → Groq
//!                         ↑          ↓
//!                         └─ TwiML ←─┘
//!
//! client → /send → TwilioChannel → Twilio → WhatsApp
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod bridge;
pub mod completion;
pub mod conversation;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod routes;
pub mod traits;
pub mod twilio;
pub mod twiml;

// Re-export commonly used types
pub use bridge::{Bridge, ERROR_REPLY};
pub use completion::{CompletionClient, CompletionOutcome, FALLBACK_REPLY};
pub use conversation::{Conversation, ConversationStore, EvictionPolicy, NeverEvict};
pub use message::{Role, Turn};
pub use provider::{ChatMessage, ChatRole, GroqProvider, Provider, ProviderError};
pub use routes::{build_router, create_state, AppState};
pub use traits::{MessageSender, SendResult};
pub use twilio::TwilioChannel;

use chatline_common::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router from config.
///
/// Returns the router together with the Twilio channel so the caller can run
/// a credential check before serving.
pub fn build_app(config: &Config) -> (axum::Router, Arc<TwilioChannel>) {
    let provider = Arc::new(GroqProvider::from_config(&config.completion));
    let completion = CompletionClient::new(provider, config.completion.model.clone());
    let store = Arc::new(ConversationStore::new());
    let bridge = Arc::new(Bridge::new(store, completion));

    let twilio = Arc::new(TwilioChannel::from_config(&config.twilio));
    let state = create_state(bridge, twilio.clone());

    let router = build_router(state).layer(TraceLayer::new_for_http());

    (router, twilio)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config.bind_address().parse()?;

    let (router, twilio) = build_app(config);

    if config.twilio.has_credentials() {
        if let Err(e) = twilio.health_check().await {
            tracing::warn!(error = %e, "Twilio credential check failed; /send will likely fail");
        }
    }

    tracing::info!("Starting Chatline on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Chatline stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
