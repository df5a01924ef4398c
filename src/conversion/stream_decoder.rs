//! Server-sent event decoding for streaming completions
//!
//! This module turns the line stream of a streaming completion response into
//! a stream of typed completion chunks.

use crate::core::constants::sse;
use crate::core::provider::{CompletionStream, ProviderError};
use crate::models::completion::CompletionChunk;
use futures::Stream;
use serde_json::Value;
use tracing::{debug, error, warn};

/// Decode SSE lines into completion chunks
///
/// Blank lines, comments and non-data fields are skipped. `data: [DONE]`
/// ends the stream, and so does an in-band `{"error": ...}` payload, which
/// is surfaced as [`ProviderError::Stream`]. Payloads that are not valid
/// chunks are logged and skipped.
pub fn decode_completion_stream<S, E>(lines: S) -> CompletionStream
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    use futures::StreamExt;

    let stream = async_stream::stream! {
        tokio::pin!(lines);

        while let Some(line_result) = lines.next().await {
            let line = match line_result {
                Ok(l) => l,
                Err(e) => {
                    error!("Stream error: {}", e);
                    yield Err(ProviderError::Stream(e.to_string()));
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(sse::COMMENT_PREFIX) {
                continue;
            }

            let payload = match trimmed.strip_prefix(sse::DATA_PREFIX) {
                Some(p) => p.trim(),
                None => continue,
            };

            if payload == sse::DONE {
                debug!("Stream finished");
                break;
            }

            let value: Value = match serde_json::from_str(payload) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Failed to parse chunk: {}, error: {}", payload, e);
                    continue;
                }
            };

            if let Some(err) = value.get("error").filter(|err| !err.is_null()) {
                let message = err
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                error!("Server reported error mid-stream: {}", message);
                yield Err(ProviderError::Stream(message));
                break;
            }

            match serde_json::from_value::<CompletionChunk>(value) {
                Ok(chunk) => yield Ok(chunk),
                Err(e) => warn!("Skipping malformed chunk: {}, error: {}", payload, e),
            }
        }
    };

    Box::pin(stream)
}
