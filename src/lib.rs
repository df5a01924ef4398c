//! GPT4All API checks
//!
//! A typed client for OpenAI-compatible completion servers and a set of
//! checks that verify such a server actually generates text: a plain
//! completion, a streaming completion and a batched completion.

pub mod checks;
pub mod conversion;
pub mod core;
pub mod models;

pub use crate::checks::{CheckError, CheckKind, CheckOutcome, CheckReport, CheckSettings};
pub use crate::core::client::CompletionClient;
pub use crate::core::provider::{CompletionProvider, CompletionStream, ProviderError};
