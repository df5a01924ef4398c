//! Completions API client
//!
//! This module provides an async HTTP client for an OpenAI-compatible
//! completions server such as the GPT4All API server. It implements
//! [`CompletionProvider`] for plain and streaming completions and for model
//! listing.

use crate::conversion::stream_decoder::decode_completion_stream;
use crate::core::constants::{endpoint, header};
use crate::core::provider::{CompletionProvider, CompletionStream, ProviderError};
use crate::models::completion::{CompletionRequest, CompletionResponse, ModelList};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, error};

/// Completions API client
pub struct CompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CompletionClient {
    /// Create a new completions client
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key sent as a bearer token
    /// * `base_url` - API base URL, e.g. `http://localhost:4891/v1`
    /// * `timeout` - Request timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unexpected` if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, timeout: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| {
                ProviderError::Unexpected(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classify server errors and provide helpful messages
    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("model")
            && (error_lower.contains("not found")
                || error_lower.contains("does not exist")
                || error_lower.contains("not available"))
        {
            return "Model not found. Please check the `model` setting matches a model the server has installed.".to_string();
        }

        if error_lower.contains("invalid_api_key") || error_lower.contains("unauthorized") {
            return "Invalid API key. Please check the `api_key` setting.".to_string();
        }

        if error_lower.contains("rate_limit") || error_lower.contains("too many requests") {
            return "Rate limit exceeded. Please wait and try again.".to_string();
        }

        if error_lower.contains("context")
            && (error_lower.contains("window") || error_lower.contains("length"))
        {
            return "Prompt exceeds the model context window. Reduce `max_tokens` or the prompt."
                .to_string();
        }

        error_detail.to_string()
    }

    /// Classify transport errors
    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() || e.is_timeout() {
            ProviderError::Connection(format!(
                "{} (is the API server running at {}?)",
                e, self.base_url
            ))
        } else {
            ProviderError::Unexpected(e.to_string())
        }
    }

    /// Attach auth and a fresh request id
    fn prepare(&self, builder: RequestBuilder, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("Request {} -> {}{}", request_id, self.base_url, path);

        builder
            .bearer_auth(&self.api_key)
            .header(header::REQUEST_ID, request_id)
    }

    /// Turn a non-success response into an error
    async fn check_status(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Server returned {}: {}", status, error_text);

        Err(ProviderError::from_status(
            status.as_u16(),
            Self::classify_error(&error_text),
        ))
    }

    /// Internal method to POST a completion request
    async fn send_completion_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<Response, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint::COMPLETIONS);

        debug!(
            "Completion request: model={}, prompts={}, stream={}",
            request.model,
            request.prompt.len(),
            request.stream
        );

        let response = self
            .prepare(self.client.post(&url), endpoint::COMPLETIONS)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::check_status(response).await
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = if request.stream {
            let mut request = request.clone();
            request.stream = false;
            self.send_completion_request(&request).await?
        } else {
            self.send_completion_request(request).await?
        };

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("Failed to parse response: {}", e)))?;

        Ok(completion)
    }

    async fn create_completion_stream(
        &self,
        mut request: CompletionRequest,
    ) -> Result<CompletionStream, ProviderError> {
        request.stream = true;

        let response = self.send_completion_request(&request).await?;

        use futures::TryStreamExt;
        use tokio::io::AsyncBufReadExt;
        use tokio_stream::wrappers::LinesStream;

        let byte_stream = response.bytes_stream().map_err(std::io::Error::other);

        let reader = tokio_util::io::StreamReader::new(byte_stream);
        let buf_reader = tokio::io::BufReader::new(reader);
        let line_stream = LinesStream::new(buf_reader.lines());

        Ok(decode_completion_stream(line_stream))
    }

    async fn list_models(&self) -> Result<ModelList, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint::MODELS);

        let response = self
            .prepare(self.client.get(&url), endpoint::MODELS)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("Failed to parse model list: {}", e)))
    }

    fn provider_name(&self) -> &str {
        "GPT4All API"
    }
}
