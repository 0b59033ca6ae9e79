//! HTTP API
//!
//! A thin surface over the turn runtime: start a turn and stream its UI
//! patches as Server-Sent Events, cancel it, read stored history.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::runtime::{ContextProvider, TurnRuntime, TurnStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<TurnRuntime>,
    pub store: Arc<dyn TurnStore>,
    pub context: Arc<Vec<Arc<dyn ContextProvider>>>,
    /// Cancellation tokens of running turns, by conversation
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl AppState {
    pub fn new(runtime: TurnRuntime, store: Arc<dyn TurnStore>) -> Self {
        Self {
            runtime: Arc::new(runtime),
            store,
            context: Arc::new(Vec::new()),
            active: Arc::default(),
        }
    }

    #[must_use]
    pub fn with_context_providers(mut self, providers: Vec<Arc<dyn ContextProvider>>) -> Self {
        self.context = Arc::new(providers);
        self
    }

    /// Reserve the conversation for a new turn; `None` if one is running
    async fn begin_turn(&self, conversation_id: &str) -> Option<CancellationToken> {
        let mut active = self.active.lock().await;
        if active.contains_key(conversation_id) {
            return None;
        }
        let token = CancellationToken::new();
        active.insert(conversation_id.to_string(), token.clone());
        Some(token)
    }

    async fn end_turn(&self, conversation_id: &str) {
        self.active.lock().await.remove(conversation_id);
    }

    /// Trip the running turn's token; false if nothing is running
    async fn cancel_turn(&self, conversation_id: &str) -> bool {
        match self.active.lock().await.get(conversation_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
