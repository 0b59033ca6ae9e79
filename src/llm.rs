//! Reasoning backend abstraction
//!
//! Backends produce a streamed completion: text deltas as they arrive, then
//! any tool invocations the model proposed, then usage.

mod anthropic;
mod error;
mod sse;
mod types;

pub use anthropic::{AnthropicModel, AnthropicService};
pub use error::{LlmError, LlmErrorKind};
pub use sse::{SseEvent, SseParser};
pub use types::*;

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Start a streamed completion
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        (**self).stream(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let start = Instant::now();
        let stream = match self.inner.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    kind = e.kind.label(),
                    "LLM request failed"
                );
                return Err(e);
            }
        };

        let model_id = self.model_id.clone();
        tracing::debug!(
            model = %model_id,
            tools = request.tools.len(),
            messages = request.messages.len(),
            "LLM stream opened"
        );

        Ok(stream
            .inspect(move |chunk| match chunk {
                Ok(LlmChunk::Finished { usage }) => {
                    tracing::info!(
                        model = %model_id,
                        duration_ms = %start.elapsed().as_millis(),
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "LLM request completed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        model = %model_id,
                        duration_ms = %start.elapsed().as_millis(),
                        error = %e.message,
                        kind = e.kind.label(),
                        "LLM stream failed"
                    );
                }
                Ok(_) => {}
            })
            .boxed())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Stand-in backend used when no provider is configured
///
/// Every turn ends in an in-band error explaining the missing configuration.
pub struct UnavailableService;

#[async_trait]
impl LlmService for UnavailableService {
    async fn stream(&self, _request: &LlmRequest) -> Result<LlmStream, LlmError> {
        Err(LlmError::auth(
            "No LLM backend configured. Set ANTHROPIC_API_KEY or LLM_GATEWAY.",
        ))
    }

    fn model_id(&self) -> &'static str {
        "unavailable"
    }
}
