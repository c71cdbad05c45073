//! Binary entry point for feedsift.
//!
//! This binary drives the filtering engine from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use feedsift::cli;
use feedsift::config::FeedsiftConfig;
use feedsift::observability::{self, ObservabilityConfig};
use feedsift::services::{Engine, HttpMediaFetcher};
use feedsift::storage::{FilesystemStore, KeyValueStore, SettingsSource, StaticPrivacyMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Feedsift - hides duplicates and reposts in a scrolling content feed.
#[derive(Parser)]
#[command(name = "feedsift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Treat this session as a private browsing context.
    #[arg(long, global = true, env = "FEEDSIFT_PRIVATE")]
    private: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan batch files of rendered posts.
    Scan {
        /// JSON files, each an array of post records.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print one JSON report per batch.
        #[arg(long)]
        json: bool,
    },

    /// Read NDJSON post records from stdin and scan on quiet windows.
    Watch {
        /// Print decisions as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Show tracked entries and storage size.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Remove expired entries now.
    Sweep,

    /// Delete the seen-entry indices, keeping settings.
    Clear,

    /// Delete everything in storage, settings included.
    Reset,

    /// Show or change filter settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the stored settings.
    Show {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Set one setting.
    Set {
        /// Setting name, e.g. `deleteThreshold` or `hideCrossposts`.
        key: String,

        /// New value.
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let persistence: Arc<dyn KeyValueStore> = Arc::new(FilesystemStore::new(config.storage_path()));
    let settings = SettingsSource::new(persistence.clone());

    let debug_mode = settings.load_or_default().await.debug_mode;
    let expose_metrics = matches!(args.command, Commands::Watch { .. });
    let observability_config =
        ObservabilityConfig::from_config(&config, args.verbose || debug_mode, expose_metrics);
    if let Err(e) = observability::init(&observability_config) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(args, config, persistence, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<FeedsiftConfig> {
    let config = match path {
        Some(path) => FeedsiftConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => FeedsiftConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

async fn run_command(
    args: Cli,
    config: FeedsiftConfig,
    persistence: Arc<dyn KeyValueStore>,
    settings: SettingsSource,
) -> anyhow::Result<()> {
    let command = match args.command {
        Commands::Settings { action } => return run_settings(&settings, action).await,
        command => command,
    };

    let fetcher = Arc::new(HttpMediaFetcher::new(&config.media.user_agent));
    let engine = Arc::new(
        Engine::start(
            &config,
            persistence,
            fetcher,
            &StaticPrivacyMode::new(args.private),
        )
        .await,
    );

    let result = match command {
        Commands::Scan { files, json } => cli::cmd_scan(&engine, &files, json).await.map(drop),
        Commands::Watch { json } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            cli::cmd_watch(engine.clone(), stdin, config.scan.debounce, json)
                .await
                .map(drop)
        },
        Commands::Stats { json } => cli::cmd_stats(&engine, json).await.map(drop),
        Commands::Sweep => cli::cmd_sweep(&engine).await.map(drop),
        Commands::Clear => cli::cmd_clear(&engine).await,
        Commands::Reset => cli::cmd_reset(&engine).await,
        Commands::Settings { .. } => Ok(()),
    };

    // Flush pending index writes even when the command failed.
    let shutdown = match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(engine) => engine.flush().await.map(drop),
    };
    result?;
    shutdown.context("flushing seen entries")
}

async fn run_settings(settings: &SettingsSource, action: SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show { json } => {
            cli::cmd_settings_show(settings, json).await?;
        },
        SettingsAction::Set { key, value } => {
            cli::cmd_settings_set(settings, &key, &value).await?;
        },
    }
    Ok(())
}
