//! Bridge between inbound WhatsApp messages and the completion provider.
//!
//! One exchange is: record the user turn, build the prompt, ask for a
//! completion, record the reply. Exchanges for the same sender are
//! serialized through the store's per-sender lock so turns never interleave;
//! different senders run in parallel.
//!
//! ```text
//! Twilio → /webhook → Bridge → ConversationStore → prompt → CompletionClient
//!                                                              ↓
//! Twilio ←──────── TwiML ←──────── reply (or fallback) ←───────┘
//! ```

use std::sync::Arc;

use chatline_common::logging::generate_trace_id;
use chatline_common::util::{mask_address, truncate_with_ellipsis};
use tracing::Instrument;

use crate::completion::{CompletionClient, CompletionOutcome};
use crate::conversation::ConversationStore;
use crate::message::Turn;
use crate::prompt;

/// Reply used when an exchange fails unexpectedly.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

pub struct Bridge {
    store: Arc<ConversationStore>,
    completion: CompletionClient,
}

impl Bridge {
    pub fn new(store: Arc<ConversationStore>, completion: CompletionClient) -> Self {
        Self { store, completion }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Run one exchange for `sender` and return the outcome.
    ///
    /// Fallback replies are returned to the caller but not written to
    /// history, so a provider outage does not leak apologies into later
    /// prompts.
    pub async fn respond(&self, sender: &str, text: &str) -> CompletionOutcome {
        let lock = self.store.sender_lock(sender).await;
        let _guard = lock.lock().await;

        let messages = prompt::build_prompt(&self.store, sender, text).await;
        let outcome = self.completion.complete(messages).await;

        match &outcome {
            CompletionOutcome::Generated(reply) => {
                self.store.append(sender, Turn::assistant(reply.as_str())).await;
            }
            CompletionOutcome::Fallback { reason } => {
                tracing::warn!(
                    model = self.completion.model(),
                    %reason,
                    "Replying with fallback; not recorded in history"
                );
            }
        }

        outcome
    }

    /// Handle an inbound message and return the text to reply with.
    ///
    /// The exchange runs on its own task; if it panics the caller still gets
    /// [`ERROR_REPLY`].
    pub async fn handle_incoming(self: Arc<Self>, sender: String, text: String) -> String {
        let trace_id = generate_trace_id();
        let span = chatline_common::channel_span!("whatsapp", trace_id, mask_address(&sender));

        tracing::info!(
            parent: &span,
            "Received message: {}",
            truncate_with_ellipsis(&text, 50)
        );

        let task = tokio::spawn(
            async move {
                let outcome = self.respond(&sender, &text).await;
                outcome.text().to_string()
            }
            .instrument(span.clone()),
        );

        match task.await {
            Ok(reply) => {
                tracing::info!(
                    parent: &span,
                    "Sending response: {}",
                    truncate_with_ellipsis(&reply, 50)
                );
                reply
            }
            Err(e) => {
                tracing::error!(parent: &span, error = %e, "Error in webhook");
                ERROR_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::FALLBACK_REPLY;
    use crate::message::Role;
    use crate::provider::{ChatRequest, ChatResponse, Provider, ProviderError, TokenUsage};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Echoes the last user message, optionally after a delay.
    struct EchoProvider {
        delay: Duration,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            tokio::time::sleep(self.delay).await;
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                provider: "echo".into(),
                model: request.model,
                content: format!("echo: {last}"),
                usage: TokenUsage::default(),
                finish_reason: None,
                latency_ms: 0,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError {
                provider: "failing".into(),
                model: request.model,
                message: "connection refused".into(),
                status_code: None,
            })
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl Provider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            panic!("provider bug");
        }
    }

    fn bridge(provider: impl Provider + 'static) -> Arc<Bridge> {
        Arc::new(Bridge::new(
            Arc::new(ConversationStore::new()),
            CompletionClient::new(Arc::new(provider), "test-model"),
        ))
    }

    #[tokio::test]
    async fn test_two_messages_record_four_turns_in_order() {
        let bridge = bridge(EchoProvider { delay: Duration::ZERO });
        let sender = "whatsapp:+15550100";

        bridge.respond(sender, "M1").await;
        bridge.respond(sender, "M2").await;

        let turns = bridge.store().recent(sender, 10).await;
        let seen: Vec<(Role, &str)> = turns.iter().map(|t| (t.role(), t.content())).collect();
        assert_eq!(
            seen,
            vec![
                (Role::User, "M1"),
                (Role::Assistant, "echo: M1"),
                (Role::User, "M2"),
                (Role::Assistant, "echo: M2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_is_not_recorded() {
        let bridge = bridge(FailingProvider);
        let sender = "whatsapp:+15550101";

        let outcome = bridge.respond(sender, "hello").await;
        assert_eq!(outcome.text(), FALLBACK_REPLY);

        let turns = bridge.store().recent(sender, 10).await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[0].content(), "hello");
    }

    #[tokio::test]
    async fn test_handle_incoming_panic_yields_error_reply() {
        let bridge = bridge(PanickingProvider);
        let reply = bridge
            .clone()
            .handle_incoming("whatsapp:+15550102".into(), "hi".into())
            .await;
        assert_eq!(reply, ERROR_REPLY);

        // The sender lock is released even though the exchange panicked.
        let lock = bridge.store().sender_lock("whatsapp:+15550102").await;
        assert!(lock.try_lock().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_sender_exchanges_do_not_interleave() {
        let bridge = bridge(EchoProvider {
            delay: Duration::from_millis(50),
        });
        let sender = "whatsapp:+15550103".to_string();

        let first = tokio::spawn(bridge.clone().handle_incoming(sender.clone(), "first".into()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tokio::spawn(bridge.clone().handle_incoming(sender.clone(), "second".into()));

        assert_eq!(first.await.unwrap(), "echo: first");
        assert_eq!(second.await.unwrap(), "echo: second");

        let roles: Vec<Role> = bridge
            .store()
            .recent(&sender, 10)
            .await
            .iter()
            .map(Turn::role)
            .collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }
}
