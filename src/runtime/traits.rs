//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::credentials::{Credential, CredentialError};
use crate::enrich::{PriceQuote, ProviderError};
use crate::llm::{ChatError, CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Chat completion endpoint
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion. The credential is supplied per call so a key
    /// entered at runtime takes effect on the next request.
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<CompletionResponse, ChatError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Short web snippet about a query
#[async_trait]
pub trait SnippetSource: Send + Sync {
    /// `Ok(None)` means the source had nothing to say
    async fn snippet(&self, query: &str) -> Result<Option<String>, ProviderError>;
}

/// Current price of the tracked asset
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self) -> Result<PriceQuote, ProviderError>;
}

/// Persistent storage for the API key
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Credential, CredentialError>;
    fn set(&self, credential: &Credential) -> Result<(), CredentialError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(
        &self,
        request: &CompletionRequest,
        credential: &Credential,
    ) -> Result<CompletionResponse, ChatError> {
        (**self).complete(request, credential).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: SnippetSource + ?Sized> SnippetSource for Arc<T> {
    async fn snippet(&self, query: &str) -> Result<Option<String>, ProviderError> {
        (**self).snippet(query).await
    }
}

#[async_trait]
impl<T: QuoteSource + ?Sized> QuoteSource for Arc<T> {
    async fn quote(&self) -> Result<PriceQuote, ProviderError> {
        (**self).quote().await
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn get(&self) -> Result<Credential, CredentialError> {
        (**self).get()
    }

    fn set(&self, credential: &Credential) -> Result<(), CredentialError> {
        (**self).set(credential)
    }
}
