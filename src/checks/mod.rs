//! Completion checks
//!
//! This module runs scenario checks against a completion provider and
//! reports a pass/fail outcome for each. The default set exercises a plain
//! completion, a streaming completion and a batched completion.

mod scenarios;

pub use scenarios::{
    check_batched_completion, check_completion, check_models, check_streaming_completion,
};

use crate::core::provider::{CompletionProvider, ProviderError};
use crate::models::completion::{CompletionRequest, Prompt};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

/// Error types for check runs
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{check} check failed: {message}")]
    Assertion {
        check: &'static str,
        message: String,
    },
}

/// Supported checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Completion,
    Streaming,
    Batched,
    Models,
}

impl CheckKind {
    /// Checks run when none are selected
    pub const DEFAULT: [CheckKind; 3] =
        [CheckKind::Completion, CheckKind::Streaming, CheckKind::Batched];

    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Completion => "completion",
            CheckKind::Streaming => "streaming",
            CheckKind::Batched => "batched",
            CheckKind::Models => "models",
        }
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completion" => Ok(CheckKind::Completion),
            "streaming" | "stream" => Ok(CheckKind::Streaming),
            "batched" | "batch" => Ok(CheckKind::Batched),
            "models" => Ok(CheckKind::Models),
            other => Err(format!(
                "unknown check '{}' (expected completion, streaming, batched or models)",
                other
            )),
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request parameters shared by every check
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    pub echo: bool,
    pub batch_size: usize,
}

impl CheckSettings {
    /// Build a completion request for the given prompt
    pub fn request(&self, prompt: Prompt, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
            n: Some(self.n),
            echo: Some(self.echo),
            stop: None,
            stream,
        }
    }

    /// Prompt length in characters
    pub fn prompt_len(&self) -> usize {
        self.prompt.chars().count()
    }
}

/// Result of a passing check
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub kind: CheckKind,
    /// Choices, fragments or models observed
    pub items: usize,
    /// Characters of generated output inspected
    pub output_chars: usize,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
    pub summary: String,
}

/// Outcome of one check in a run
#[derive(Debug)]
pub struct CheckOutcome {
    pub kind: CheckKind,
    pub result: Result<CheckReport, CheckError>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Measurements a scenario hands back to the runner
#[derive(Debug, Clone)]
pub struct Observation {
    pub items: usize,
    pub output_chars: usize,
    pub summary: String,
}

/// Run a single check
///
/// # Errors
///
/// Returns `CheckError::Provider` when the request fails and
/// `CheckError::Assertion` when the response does not meet the check.
pub async fn run_check(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
    kind: CheckKind,
) -> Result<CheckReport, CheckError> {
    let started = Instant::now();

    let observation = match kind {
        CheckKind::Completion => check_completion(provider, settings).await?,
        CheckKind::Streaming => check_streaming_completion(provider, settings).await?,
        CheckKind::Batched => check_batched_completion(provider, settings).await?,
        CheckKind::Models => check_models(provider, settings).await?,
    };

    Ok(CheckReport {
        kind,
        items: observation.items,
        output_chars: observation.output_chars,
        elapsed: started.elapsed(),
        finished_at: Utc::now(),
        summary: observation.summary,
    })
}

/// Run checks sequentially
///
/// A failing check does not stop the ones after it.
pub async fn run_checks(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
    kinds: &[CheckKind],
) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(kinds.len());

    for &kind in kinds {
        info!("Running {} check against {}", kind, provider.provider_name());
        let result = run_check(provider, settings, kind).await;

        match &result {
            Ok(report) => info!(
                "{} check passed in {:?}: {}",
                kind, report.elapsed, report.summary
            ),
            Err(e) => error!("{} check failed: {}", kind, e),
        }

        outcomes.push(CheckOutcome { kind, result });
    }

    outcomes
}
