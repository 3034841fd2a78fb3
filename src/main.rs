mod cli;
mod logging;

use anyhow::Context;
use background_service::{DiscordWebhook, MonitorService, MonitorSettings};
use clap::Parser;
use cli::Cli;
use history_store::HistoryStore;
use llm_interface::GeminiProvider;
use reddit_client::FeedClient;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use subwatch_core::config::DEFAULT_LOG_FILE;
use subwatch_core::{ConfigError, KeywordFilter, MonitorConfig, Secrets};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const EXIT_STARTUP_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()),
    };

    let config = MonitorConfig::load(&cli.config);
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_file.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    if let Err(e) = logging::init(&log_file) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(EXIT_STARTUP_FAILURE);
    }

    match (&cli.env_file, env_loaded) {
        (Some(path), Err(e)) => {
            error!("FATAL: could not read env file {}: {}", path.display(), e);
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
        (None, Err(_)) => info!("No .env file found, using the process environment"),
        _ => {}
    }

    info!("Starting subwatch v{}", env!("CARGO_PKG_VERSION"));

    let monitor = match build_monitor(&cli, config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("FATAL: {:#}", e);
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    if cli.once {
        run_once(&monitor).await
    } else {
        run_forever(&monitor).await
    }
}

fn build_monitor(
    cli: &Cli,
    config: Result<MonitorConfig, ConfigError>,
) -> anyhow::Result<MonitorService> {
    let mut config =
        config.with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(history) = &cli.history {
        config.history_file = history.clone();
    }

    let secrets = Secrets::from_env().context("credentials are not configured")?;

    let history = HistoryStore::open(&config.history_file)?;
    let feed = FeedClient::from_config(&config)?;
    let classifier = GeminiProvider::from_config(&config, &secrets)?;
    let notifier = DiscordWebhook::new(
        secrets.discord_webhook_url.clone(),
        format!("Gemini ({})", classifier.model()),
    )?;
    let filter = KeywordFilter::new(config.keywords.iter().cloned());

    info!(
        "Watching {} subreddits for {} keywords; scan every {}s, analysis delay {}s",
        config.subreddits.len(),
        filter.len(),
        config.sleep_time,
        config.ai_delay
    );

    Ok(MonitorService::new(
        MonitorSettings::from_config(&config),
        Arc::new(feed),
        Arc::new(history),
        filter,
        Arc::new(classifier),
        Arc::new(notifier),
    ))
}

async fn run_once(monitor: &MonitorService) -> ExitCode {
    tokio::select! {
        (report, outcomes) = monitor.run_once() => {
            info!(
                "Single run finished: {} new posts, {} analyzed, {} subreddits failed",
                report.new_posts,
                outcomes.len(),
                report.failed_subreddits.len()
            );
            ExitCode::SUCCESS
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, exiting");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run_forever(monitor: &MonitorService) -> ExitCode {
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    monitor.run(token).await;
    ExitCode::from(EXIT_INTERRUPTED)
}
