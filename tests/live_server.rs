//! Checks against a real GPT4All API server.
//!
//! Run with:
//!   GPT4ALL_API_BASE=http://localhost:4891/v1 \
//!   cargo test --test live_server -- --ignored

use gpt4all_api_check::checks::{
    CheckSettings, check_batched_completion, check_completion, check_streaming_completion,
};
use gpt4all_api_check::core::config::Config;
use gpt4all_api_check::CompletionClient;

fn live_client() -> CompletionClient {
    let base_url = std::env::var("GPT4ALL_API_BASE")
        .unwrap_or_else(|_| "http://localhost:4891/v1".to_string());

    CompletionClient::new("not needed for a local LLM".to_string(), base_url, 300)
        .expect("Failed to build completion client")
}

fn live_settings() -> CheckSettings {
    let mut settings = Config::default().check_settings();
    if let Ok(model) = std::env::var("GPT4ALL_API_MODEL") {
        settings.model = model;
    }
    settings
}

#[tokio::test]
#[ignore]
async fn test_completion() {
    let observation = check_completion(&live_client(), &live_settings())
        .await
        .expect("Completion check failed");
    assert!(observation.output_chars > live_settings().prompt_len());
}

#[tokio::test]
#[ignore]
async fn test_streaming_completion() {
    let observation = check_streaming_completion(&live_client(), &live_settings())
        .await
        .expect("Streaming check failed");
    assert!(observation.items > 0);
}

#[tokio::test]
#[ignore]
async fn test_batched_completion() {
    let observation = check_batched_completion(&live_client(), &live_settings())
        .await
        .expect("Batched check failed");
    assert_eq!(observation.items, 3);
}
