//! Constants for endpoints, defaults and stream framing
//!
//! This module defines string and numeric constants used throughout the
//! crate: API paths, the defaults reproducing the reference check run, and
//! server-sent event markers.

/// API path constants, relative to the configured base URL
pub mod endpoint {
    /// Completions endpoint
    pub const COMPLETIONS: &str = "/completions";

    /// Model listing endpoint
    pub const MODELS: &str = "/models";
}

/// Default settings for a check run
pub mod defaults {
    /// Base URL of a local GPT4All API server
    pub const BASE_URL: &str = "http://localhost:4891/v1";

    /// API key sent to servers that do not check it
    pub const API_KEY: &str = "not needed for a local LLM";

    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT: u64 = 90;

    /// Logging level
    pub const LOG_LEVEL: &str = "info";

    /// Model identifier
    pub const MODEL: &str = "ggml-mpt-7b-chat.bin";

    /// Prompt sent by every check
    pub const PROMPT: &str = "Who is Michael Jordan?";

    pub const MAX_TOKENS: u32 = 50;
    pub const TEMPERATURE: f32 = 0.28;
    pub const TOP_P: f32 = 0.95;
    pub const N: u32 = 1;
    pub const ECHO: bool = true;

    /// Number of prompt copies sent by the batched check
    pub const BATCH_SIZE: usize = 3;
}

/// Upper bounds accepted by configuration validation
pub mod limits {
    /// Largest batch the batched check sends
    pub const MAX_BATCH_SIZE: usize = 128;

    /// Largest number of completions requested per prompt
    pub const MAX_N: u32 = 16;
}

/// Server-sent event framing constants
pub mod sse {
    /// Prefix of a data line
    pub const DATA_PREFIX: &str = "data:";

    /// Prefix of a comment line
    pub const COMMENT_PREFIX: &str = ":";

    /// Payload marking the end of a stream
    pub const DONE: &str = "[DONE]";
}

/// Header constants
pub mod header {
    /// Per-request correlation id
    pub const REQUEST_ID: &str = "X-Request-Id";
}
