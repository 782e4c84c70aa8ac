//! In-memory conversation history keyed by sender.
//!
//! History lives for the lifetime of the process. Nothing is persisted and,
//! with the default [`NeverEvict`] policy, nothing is ever removed: memory
//! grows with the number of distinct senders. Swap in another
//! [`EvictionPolicy`] to bound it.

use crate::message::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Ordered, append-only sequence of turns for one sender.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Append a turn. Timestamps strictly increase: a turn stamped at or
    /// before the current tail is moved to just after it.
    pub fn push(&mut self, mut turn: Turn) {
        if let Some(last) = self.turns.last() {
            turn.ensure_after(last.created_at());
        }
        self.turns.push(turn);
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Timestamp of the newest turn.
    pub fn last_activity(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.turns.last().map(Turn::created_at)
    }
}

/// Hook run after every append; may drop whole conversations.
pub trait EvictionPolicy: Send + Sync {
    fn evict(&self, conversations: &mut HashMap<String, Conversation>);
}

/// Keeps everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn evict(&self, _conversations: &mut HashMap<String, Conversation>) {}
}

/// Process-wide conversation store.
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    /// Per-sender exclusion for a whole webhook exchange
    sender_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    eviction: Box<dyn EvictionPolicy>,
}

impl ConversationStore {
    /// Create a store that never evicts.
    pub fn new() -> Self {
        Self::with_eviction(NeverEvict)
    }

    /// Create a store with a custom eviction policy.
    pub fn with_eviction(policy: impl EvictionPolicy + 'static) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            sender_locks: Mutex::new(HashMap::new()),
            eviction: Box::new(policy),
        }
    }

    /// Append a turn to `sender`'s conversation, creating it if needed.
    pub async fn append(&self, sender: &str, turn: Turn) {
        tracing::debug!(role = turn.role().as_str(), "Appending turn");
        let mut conversations = self.conversations.write().await;
        conversations
            .entry(sender.to_string())
            .or_default()
            .push(turn);

        let before = conversations.len();
        self.eviction.evict(&mut conversations);
        let evicted = before.saturating_sub(conversations.len());

        if evicted > 0 {
            tracing::debug!(evicted, remaining = conversations.len(), "Evicted conversations");
            let mut locks = self.sender_locks.lock().await;
            locks.retain(|key, lock| {
                conversations.contains_key(key) || Arc::strong_count(lock) > 1
            });
        }
    }

    /// The last `n` turns for `sender`, oldest first. Empty for unknown senders.
    pub async fn recent(&self, sender: &str, n: usize) -> Vec<Turn> {
        let conversations = self.conversations.read().await;
        conversations
            .get(sender)
            .map(|c| c.recent(n).to_vec())
            .unwrap_or_default()
    }

    /// Number of stored turns for `sender`.
    pub async fn len(&self, sender: &str) -> usize {
        let conversations = self.conversations.read().await;
        conversations.get(sender).map_or(0, |c| c.turns.len())
    }

    /// Number of senders with a conversation.
    pub async fn sender_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Lock handle serializing exchanges for one sender.
    ///
    /// Hold the returned mutex for the whole read-complete-append sequence.
    pub async fn sender_lock(&self, sender: &str) -> Arc<Mutex<()>> {
        let mut locks = self.sender_locks.lock().await;
        locks
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
