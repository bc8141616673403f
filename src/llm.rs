//! Chat completion provider plumbing
//!
//! Wire adapter for the completion endpoint plus the error taxonomy every
//! chat failure is classified into.

mod error;
mod openai;
mod types;

pub use error::{ChatError, ChatErrorKind};
pub use openai::{OpenAIService, DEFAULT_CHAT_URL};
pub use types::*;

use crate::credentials::Credential;
use crate::runtime::CompletionService;
use async_trait::async_trait;
use std::sync::Arc;

/// Logging wrapper for completion services
pub struct LoggingService {
    inner: Arc<dyn CompletionService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn CompletionService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionService for LoggingService {
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<CompletionResponse, ChatError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request, credential).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::warn!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    error = %e.message,
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
