//! Check scenarios
//!
//! Each scenario sends one request and asserts coarse properties of the
//! reply. Lengths are measured in characters, so a completion that echoes
//! the prompt must add at least one character to pass.

use super::{CheckError, CheckSettings, Observation};
use crate::core::constants::limits;
use crate::core::provider::CompletionProvider;
use crate::models::completion::Prompt;
use futures::StreamExt;
use tracing::{debug, warn};

fn assertion(check: &'static str, message: String) -> CheckError {
    CheckError::Assertion { check, message }
}

/// Single completion: the first choice must be longer than the prompt
pub async fn check_completion(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
) -> Result<Observation, CheckError> {
    let request = settings.request(Prompt::from(settings.prompt.as_str()), false);
    let response = provider.create_completion(&request).await?;

    let choice = response
        .choices
        .first()
        .ok_or_else(|| assertion("completion", "response carried no choices".to_string()))?;

    let prompt_len = settings.prompt_len();
    let text_len = choice.text.chars().count();
    debug!("Completion text ({} chars): {:?}", text_len, choice.text);

    if text_len <= prompt_len {
        return Err(assertion(
            "completion",
            format!(
                "returned text has {} chars, expected more than the prompt's {}",
                text_len, prompt_len
            ),
        ));
    }

    Ok(Observation {
        items: response.choices.len(),
        output_chars: text_len,
        summary: format!("{} chars from a {}-char prompt", text_len, prompt_len),
    })
}

/// Streaming completion: at least one fragment, and the concatenation must
/// be longer than the prompt
pub async fn check_streaming_completion(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
) -> Result<Observation, CheckError> {
    let request = settings.request(Prompt::from(settings.prompt.as_str()), true);
    let mut stream = provider.create_completion_stream(request).await?;

    let mut fragments = 0usize;
    let mut text = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(fragment) = chunk.text() {
            fragments += 1;
            text.push_str(fragment);
        }
    }

    if fragments == 0 {
        return Err(assertion(
            "streaming",
            "stream ended without yielding any fragment".to_string(),
        ));
    }

    let prompt_len = settings.prompt_len();
    let text_len = text.chars().count();
    debug!("Streamed {} fragments ({} chars): {:?}", fragments, text_len, text);

    if text_len <= prompt_len {
        return Err(assertion(
            "streaming",
            format!(
                "{} fragments joined to {} chars, expected more than the prompt's {}",
                fragments, text_len, prompt_len
            ),
        ));
    }

    Ok(Observation {
        items: fragments,
        output_chars: text_len,
        summary: format!("{} fragments, {} chars", fragments, text_len),
    })
}

/// Batched completion: one choice per prompt copy, each longer than the prompt
pub async fn check_batched_completion(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
) -> Result<Observation, CheckError> {
    let expected = settings
        .batch_size
        .checked_mul(settings.n as usize)
        .filter(|_| settings.batch_size <= limits::MAX_BATCH_SIZE)
        .ok_or_else(|| {
            assertion(
                "batched",
                format!(
                    "batch of {} with n={} is too large (at most {} prompts)",
                    settings.batch_size,
                    settings.n,
                    limits::MAX_BATCH_SIZE
                ),
            )
        })?;

    let request = settings.request(Prompt::batch(&settings.prompt, settings.batch_size), false);
    let response = provider.create_completion(&request).await?;

    if response.choices.len() != expected {
        return Err(assertion(
            "batched",
            format!(
                "expected {} choices for a batch of {}, got {}",
                expected,
                settings.batch_size,
                response.choices.len()
            ),
        ));
    }

    let prompt_len = settings.prompt_len();
    let mut output_chars = 0;
    for (position, choice) in response.choices.iter().enumerate() {
        let text_len = choice.text.chars().count();
        if text_len <= prompt_len {
            return Err(assertion(
                "batched",
                format!(
                    "choice {} has {} chars, expected more than the prompt's {}",
                    position, text_len, prompt_len
                ),
            ));
        }
        output_chars += text_len;
    }

    Ok(Observation {
        items: response.choices.len(),
        output_chars,
        summary: format!("{} choices, {} chars total", response.choices.len(), output_chars),
    })
}

/// Model listing: the server must report at least one model
pub async fn check_models(
    provider: &dyn CompletionProvider,
    settings: &CheckSettings,
) -> Result<Observation, CheckError> {
    let models = provider.list_models().await?;

    if models.data.is_empty() {
        return Err(assertion("models", "server lists no models".to_string()));
    }

    if !models.contains(&settings.model) {
        warn!(
            "Configured model {} is not in the server's model list",
            settings.model
        );
    }

    Ok(Observation {
        items: models.data.len(),
        output_chars: 0,
        summary: format!("{} models available", models.data.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckKind, run_check, run_checks};
    use crate::core::provider::{CompletionStream, ProviderError};
    use crate::models::completion::{
        CompletionChoice, CompletionChunk, CompletionRequest, CompletionResponse, ModelInfo,
        ModelList,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory provider that echoes the prompt and appends a fixed answer
    struct FakeProvider {
        answer: String,
        drop_choice: bool,
        /// Choice index that gets the bare prompt, without the answer
        short_choice: Option<usize>,
        /// Chunks without choices sent ahead of the fragments
        empty_chunks: usize,
        stream_fragments: Vec<String>,
        stream_error: bool,
        models: Vec<String>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeProvider {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                drop_choice: false,
                short_choice: None,
                empty_chunks: 0,
                stream_fragments: vec![
                    "Who is Michael Jordan?".to_string(),
                    " A basketball".to_string(),
                    " player.".to_string(),
                ],
                stream_error: false,
                models: vec!["ggml-mpt-7b-chat.bin".to_string()],
                seen: Mutex::new(Vec::new()),
            }
        }

        fn choice(text: String, index: u32) -> CompletionChoice {
            CompletionChoice {
                text,
                index,
                logprobs: None,
                finish_reason: Some("stop".to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn create_completion(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            self.seen.lock().unwrap().push(request.clone());

            let prompts = match &request.prompt {
                Prompt::Single(p) => vec![p.clone()],
                Prompt::Batch(ps) => ps.clone(),
            };
            let mut choices: Vec<CompletionChoice> = prompts
                .into_iter()
                .enumerate()
                .map(|(i, p)| {
                    let text = if self.short_choice == Some(i) {
                        p
                    } else {
                        format!("{}{}", p, self.answer)
                    };
                    Self::choice(text, i as u32)
                })
                .collect();
            if self.drop_choice {
                choices.pop();
            }

            Ok(CompletionResponse {
                id: "cmpl-fake".to_string(),
                object: "text_completion".to_string(),
                created: 0,
                model: request.model.clone(),
                choices,
                usage: None,
            })
        }

        async fn create_completion_stream(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionStream, ProviderError> {
            self.seen.lock().unwrap().push(request);

            let chunk = |choices: Vec<CompletionChoice>| CompletionChunk {
                id: "cmpl-fake".to_string(),
                object: "text_completion".to_string(),
                created: 0,
                model: "m".to_string(),
                choices,
                usage: None,
            };

            let mut items: Vec<Result<CompletionChunk, ProviderError>> =
                (0..self.empty_chunks).map(|_| Ok(chunk(Vec::new()))).collect();
            items.extend(
                self.stream_fragments
                    .iter()
                    .map(|text| Ok(chunk(vec![Self::choice(text.clone(), 0)]))),
            );
            if self.stream_error {
                items.push(Err(ProviderError::Stream("connection reset".to_string())));
            }

            Ok(Box::pin(futures::stream::iter(items)))
        }

        async fn list_models(&self) -> Result<ModelList, ProviderError> {
            Ok(ModelList {
                object: "list".to_string(),
                data: self
                    .models
                    .iter()
                    .map(|id| ModelInfo {
                        id: id.clone(),
                        object: "model".to_string(),
                        created: None,
                        owned_by: None,
                    })
                    .collect(),
            })
        }

        fn provider_name(&self) -> &str {
            "fake"
        }
    }

    fn settings() -> CheckSettings {
        CheckSettings {
            model: "ggml-mpt-7b-chat.bin".to_string(),
            prompt: "Who is Michael Jordan?".to_string(),
            max_tokens: 50,
            temperature: 0.28,
            top_p: 0.95,
            n: 1,
            echo: true,
            batch_size: 3,
        }
    }

    #[tokio::test]
    async fn test_completion_passes_when_text_extends_prompt() {
        let provider = FakeProvider::new(" He is a basketball player.");
        let observation = check_completion(&provider, &settings()).await.unwrap();
        assert_eq!(observation.items, 1);
        assert!(observation.output_chars > 22);

        let seen = provider.seen.lock().unwrap();
        assert!(!seen[0].stream);
        assert_eq!(seen[0].prompt, Prompt::Single("Who is Michael Jordan?".to_string()));
    }

    #[tokio::test]
    async fn test_completion_fails_on_bare_echo() {
        let provider = FakeProvider::new("");
        let err = check_completion(&provider, &settings()).await.unwrap_err();
        assert!(matches!(err, CheckError::Assertion { check: "completion", .. }));
    }

    #[tokio::test]
    async fn test_completion_fails_without_choices() {
        let mut provider = FakeProvider::new("x");
        provider.drop_choice = true;
        let err = check_completion(&provider, &settings()).await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_streaming_concatenates_fragments() {
        let provider = FakeProvider::new("");
        let observation = check_streaming_completion(&provider, &settings())
            .await
            .unwrap();
        assert_eq!(observation.items, 3);
        assert_eq!(
            observation.output_chars,
            "Who is Michael Jordan? A basketball player.".chars().count()
        );
        assert!(provider.seen.lock().unwrap()[0].stream);
    }

    #[tokio::test]
    async fn test_streaming_fails_without_fragments() {
        let mut provider = FakeProvider::new("");
        provider.stream_fragments.clear();
        let err = check_streaming_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("without yielding"));
    }

    #[tokio::test]
    async fn test_streaming_ignores_chunks_without_choices() {
        let mut provider = FakeProvider::new("");
        provider.empty_chunks = 2;
        let observation = check_streaming_completion(&provider, &settings())
            .await
            .unwrap();
        assert_eq!(observation.items, 3);
    }

    #[tokio::test]
    async fn test_streaming_fails_when_no_chunk_has_choices() {
        let mut provider = FakeProvider::new("");
        provider.empty_chunks = 4;
        provider.stream_fragments.clear();
        let err = check_streaming_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("without yielding"));
    }

    #[tokio::test]
    async fn test_streaming_fails_when_too_short() {
        let mut provider = FakeProvider::new("");
        provider.stream_fragments = vec!["Who".to_string(), " is".to_string()];
        let err = check_streaming_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Assertion { check: "streaming", .. }));
    }

    #[tokio::test]
    async fn test_streaming_propagates_stream_error() {
        let mut provider = FakeProvider::new("");
        provider.stream_error = true;
        let err = check_streaming_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Provider(ProviderError::Stream(_))));
    }

    #[tokio::test]
    async fn test_batched_returns_one_choice_per_prompt() {
        let provider = FakeProvider::new(" Basketball.");
        let observation = check_batched_completion(&provider, &settings())
            .await
            .unwrap();
        assert_eq!(observation.items, 3);

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].prompt.len(), 3);
    }

    #[tokio::test]
    async fn test_batched_fails_on_choice_count_mismatch() {
        let mut provider = FakeProvider::new(" Basketball.");
        provider.drop_choice = true;
        let err = check_batched_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 3 choices"));
    }

    #[tokio::test]
    async fn test_batched_fails_when_later_choice_is_short() {
        let mut provider = FakeProvider::new(" Basketball.");
        provider.short_choice = Some(2);
        let err = check_batched_completion(&provider, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Assertion { check: "batched", .. }));
        assert!(err.to_string().contains("choice 2"), "{}", err);
    }

    #[tokio::test]
    async fn test_batched_rejects_oversized_batch_before_sending() {
        let provider = FakeProvider::new(" Basketball.");
        let mut huge = settings();
        huge.batch_size = usize::MAX / 2;
        let err = check_batched_completion(&provider, &huge).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_models_check() {
        let provider = FakeProvider::new("");
        let observation = check_models(&provider, &settings()).await.unwrap();
        assert_eq!(observation.items, 1);

        let mut empty = FakeProvider::new("");
        empty.models.clear();
        assert!(check_models(&empty, &settings()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_checks_continues_after_failure() {
        let provider = FakeProvider::new("");
        let outcomes = run_checks(&provider, &settings(), &CheckKind::DEFAULT).await;

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].passed());
        assert!(outcomes[1].passed());
        assert!(!outcomes[2].passed());
    }

    #[tokio::test]
    async fn test_run_check_builds_report() {
        let provider = FakeProvider::new(" He played for the Bulls.");
        let report = run_check(&provider, &settings(), CheckKind::Completion)
            .await
            .unwrap();
        assert_eq!(report.kind, CheckKind::Completion);
        assert!(report.summary.contains("22-char prompt"));
    }
}
