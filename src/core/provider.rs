//! Provider abstraction for completion backends
//!
//! This module defines the trait the checks run against and the error
//! taxonomy shared by every implementation.

use crate::models::completion::{CompletionChunk, CompletionRequest, CompletionResponse, ModelList};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and its (classified) body to an error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            404 => ProviderError::NotFound(message),
            429 => ProviderError::RateLimit(message),
            400 | 422 => ProviderError::BadRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }
}

/// Stream of decoded completion chunks
pub type CompletionStream =
    Pin<Box<dyn Stream<Item = Result<CompletionChunk, ProviderError>> + Send>>;

/// Trait for OpenAI-compatible completion backends
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send non-streaming completion request
    async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Send streaming completion request
    async fn create_completion_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionStream, ProviderError>;

    /// List the models the backend serves
    async fn list_models(&self) -> Result<ModelList, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
