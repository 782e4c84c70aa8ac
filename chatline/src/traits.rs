//! Outbound channel trait.

use async_trait::async_trait;

/// Outcome of an outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResult {
    /// Accepted by the provider; `sid` is the provider's message id.
    Sent { sid: String },
    /// Rejected or unreachable; `error` describes why.
    Failed { error: String },
}

/// Something that can deliver a text message to an address.
///
/// Implementations report failures through [`SendResult::Failed`] and never
/// touch conversation history.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Get the channel name.
    fn name(&self) -> &'static str;

    /// Send `body` to `to`.
    async fn send(&self, to: &str, body: &str) -> SendResult;
}
