//! Collaborator interfaces around the core
//!
//! Persistence and memory/retrieval live outside the turn engine. The HTTP
//! layer uses these traits to load history, enrich a turn before it starts,
//! and persist it once its final result resolves.

use crate::state_machine::{ChatMessage, TurnInput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conversation '{0}' not found")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Storage for conversation history
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// All messages of a conversation, oldest first
    async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Record one completed turn
    async fn append_turn(
        &self,
        conversation_id: &str,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), StoreError>;
}

/// Extra context merged into a turn before it runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidedContext {
    /// Messages placed ahead of the stored history
    pub history: Vec<ChatMessage>,
    pub preamble: Option<String>,
}

impl ProvidedContext {
    /// Fold another provider's output into this one
    pub fn merge(&mut self, other: ProvidedContext) {
        self.history.extend(other.history);
        self.preamble = match (self.preamble.take(), other.preamble) {
            (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
            (a, b) => a.or(b),
        };
    }

    /// Apply to a turn: provided messages first, preambles concatenated
    pub fn apply(self, mut input: TurnInput) -> TurnInput {
        if !self.history.is_empty() {
            let mut history = self.history;
            history.append(&mut input.history);
            input.history = history;
        }
        input.preamble = match (self.preamble, input.preamble.take()) {
            (Some(a), Some(b)) => Some(format!("{a}\n\n{b}")),
            (a, b) => a.or(b),
        };
        input
    }
}

/// Memory or retrieval source consulted before each turn
#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn provide(
        &self,
        conversation_id: &str,
        input: &str,
    ) -> Result<ProvidedContext, StoreError>;
}

/// Ask every provider in order; a failing provider is logged and skipped
pub async fn gather_context(
    providers: &[Arc<dyn ContextProvider>],
    conversation_id: &str,
    input: &str,
) -> ProvidedContext {
    let mut merged = ProvidedContext::default();
    for provider in providers {
        match provider.provide(conversation_id, input).await {
            Ok(context) => merged.merge(context),
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "Context provider failed");
            }
        }
    }
    merged
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: TurnStore + ?Sized> TurnStore for Arc<T> {
    async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        (**self).history(conversation_id).await
    }

    async fn append_turn(
        &self,
        conversation_id: &str,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), StoreError> {
        (**self).append_turn(conversation_id, user, assistant).await
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local history store
#[derive(Default)]
pub struct InMemoryTurnStore {
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_turn(
        &self,
        conversation_id: &str,
        user: ChatMessage,
        assistant: ChatMessage,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        let messages = conversations.entry(conversation_id.to_string()).or_default();
        messages.push(user);
        messages.push(assistant);
        Ok(())
    }
}
