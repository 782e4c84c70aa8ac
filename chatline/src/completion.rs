//! Completion client: fixed generation parameters plus failure-to-fallback
//! conversion.

use std::sync::Arc;

use crate::provider::{ChatMessage, ChatRequest, Provider};

/// Reply sent when the completion provider fails.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again later.";

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: i64 = 500;
pub const TOP_P: f64 = 0.9;

/// Result of one completion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Text produced by the provider.
    Generated(String),
    /// The provider failed; `reason` is for logs only.
    Fallback { reason: String },
}

impl CompletionOutcome {
    /// Text to send back to the user.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Fallback { .. } => FALLBACK_REPLY,
        }
    }
}

/// Calls a [`Provider`] with fixed sampling parameters and never fails.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request a completion for `messages`.
    ///
    /// No retries: a failure is logged once and turned into
    /// [`CompletionOutcome::Fallback`].
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> CompletionOutcome {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
        };

        match self.provider.chat(request).await {
            Ok(response) => {
                tracing::info!(
                    provider = %response.provider,
                    model = %response.model,
                    latency_ms = response.latency_ms,
                    output_tokens = response.usage.output_tokens,
                    "Completion received"
                );
                CompletionOutcome::Generated(response.content)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error getting AI response");
                CompletionOutcome::Fallback {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatResponse, ChatRole, ProviderError, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records requests and replies with a canned result.
    struct ScriptedProvider {
        reply: Result<String, String>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(ChatResponse {
                    provider: "scripted".into(),
                    model: request.model,
                    content: text.clone(),
                    usage: TokenUsage::default(),
                    finish_reason: Some("stop".into()),
                    latency_ms: 1,
                }),
                Err(message) => Err(ProviderError {
                    provider: "scripted".into(),
                    model: request.model,
                    message: message.clone(),
                    status_code: Some(503),
                }),
            }
        }
    }

    fn client(reply: Result<String, String>) -> (CompletionClient, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (CompletionClient::new(provider.clone(), "mixtral-8x7b-32768"), provider)
    }

    #[tokio::test]
    async fn test_success_returns_generated_text() {
        let (client, _) = client(Ok("Hello from the model".into()));
        let outcome = client
            .complete(vec![ChatMessage::new(ChatRole::User, "hi")])
            .await;

        assert!(matches!(outcome, CompletionOutcome::Generated(_)));
        assert_eq!(outcome.text(), "Hello from the model");
    }

    #[tokio::test]
    async fn test_failure_returns_fallback() {
        let (client, _) = client(Err("upstream unavailable".into()));
        let outcome = client
            .complete(vec![ChatMessage::new(ChatRole::User, "hi")])
            .await;

        assert_eq!(outcome.text(), FALLBACK_REPLY);
        match outcome {
            CompletionOutcome::Fallback { reason } => assert!(reason.contains("upstream unavailable")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fixed_generation_parameters() {
        let (client, provider) = client(Ok("ok".into()));
        client
            .complete(vec![ChatMessage::new(ChatRole::User, "hi")])
            .await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "mixtral-8x7b-32768");
        assert_eq!(seen[0].temperature, Some(TEMPERATURE));
        assert_eq!(seen[0].max_tokens, Some(MAX_TOKENS));
        assert_eq!(seen[0].top_p, Some(TOP_P));
    }
}
