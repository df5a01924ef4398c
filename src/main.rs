//! GPT4All API checker
//!
//! This application runs completion checks against an OpenAI-compatible
//! completions server and exits non-zero when any check fails.

use clap::Parser;
use gpt4all_api_check::checks::{CheckKind, CheckOutcome, run_checks};
use gpt4all_api_check::core::client::CompletionClient;
use gpt4all_api_check::core::config::Config;
use gpt4all_api_check::core::logging::init_logging;
use gpt4all_api_check::core::provider::CompletionProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// GPT4All API checker
#[derive(Debug, Parser)]
#[command(
    name = "gpt4all-api-check",
    version,
    about = "Run completion checks against an OpenAI-compatible completions server",
    after_help = "Without CHECK arguments, completion, streaming and batched run in order.\n\
                  RUST_LOG overrides server.log_level."
)]
struct CliArgs {
    /// Path to configuration file (default: config.toml when present)
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Override server.base_url
    #[arg(long)]
    base_url: Option<String>,

    /// Override check.model
    #[arg(long)]
    model: Option<String>,

    /// Checks to run: completion, streaming, batched, models
    #[arg(value_name = "CHECK")]
    checks: Vec<CheckKind>,
}

impl CliArgs {
    /// Selected checks in order, without repeats, or the default set
    fn selected_checks(&self) -> Vec<CheckKind> {
        let mut selected = Vec::with_capacity(self.checks.len());
        for kind in &self.checks {
            if !selected.contains(kind) {
                selected.push(*kind);
            }
        }

        if selected.is_empty() {
            CheckKind::DEFAULT.to_vec()
        } else {
            selected
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let checks = args.selected_checks();

    // Load configuration
    let config = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.server.log_level);

    print_startup_banner(&config, &checks);

    let client = match CompletionClient::new(
        config.server.api_key.clone(),
        config.server.base_url.clone(),
        config.server.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Using provider: {}", client.provider_name());

    let settings = config.check_settings();
    let outcomes = run_checks(&client, &settings, &checks).await;

    print_results(&outcomes);

    if outcomes.iter().all(CheckOutcome::passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Load configuration and apply command-line overrides
fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.clone())?;

    if let Some(ref base_url) = args.base_url {
        config.server.base_url = base_url.clone();
    }
    if let Some(ref model) = args.model {
        config.check.model = model.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Print startup banner with configuration
fn print_startup_banner(config: &Config, checks: &[CheckKind]) {
    let names: Vec<&str> = checks.iter().map(CheckKind::name).collect();

    println!("🔎 GPT4All API check v{}", env!("CARGO_PKG_VERSION"));
    println!("✅ Configuration loaded successfully");
    println!("   Base URL: {}", config.server.base_url);
    println!("   Model: {}", config.check.model);
    println!("   Prompt: {:?}", config.check.prompt);
    println!(
        "   Sampling: max_tokens={}, temperature={}, top_p={}, n={}, echo={}",
        config.check.max_tokens,
        config.check.temperature,
        config.check.top_p,
        config.check.n,
        config.check.echo
    );
    println!("   Batch Size: {}", config.check.batch_size);
    println!("   Request Timeout: {}s", config.server.request_timeout);
    println!("   Checks: {}", names.join(", "));
    println!();
}

/// Print one line per check and a final tally
fn print_results(outcomes: &[CheckOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "✅ {:<10} {} ({} ms)",
                outcome.kind,
                report.summary,
                report.elapsed.as_millis()
            ),
            Err(e) => println!("❌ {:<10} {}", outcome.kind, e),
        }
    }

    let passed = outcomes.iter().filter(|o| o.passed()).count();
    println!();
    println!("{}/{} checks passed", passed, outcomes.len());
}
