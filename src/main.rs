// src/main.rs - Command-line driver for batch target conversion
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use pinroute_rs::config::{ConfigError, ConverterConfig, load_config};
use pinroute_rs::pipeline::{self, Conversion};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// Unified target to board plan converter
#[derive(Parser, Debug)]
#[command(name = "pinroute", about = "Resolve flight controller targets against an MCU pin capability table.")]
struct Cli {
    /// Pin capability listing (PeripheralPins.c) for the target MCU
    #[arg(short, long)]
    pinmap: PathBuf,

    /// Path to a TOML config file (overrides defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Output directory, one `<board>.json` per target; stdout if absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resolve and print the validation summary only
    #[arg(long)]
    check: bool,

    /// Unified target config files
    #[arg(required = true)]
    targets: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum ConvertError {
    #[error("failed to access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{board} rejected with {errors} error(s)")]
    Rejected { board: String, errors: usize },
    #[error("conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("failed to encode board plan: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON document written per target.
#[derive(Serialize)]
struct PlanDocument<'a> {
    generated_at: DateTime<Utc>,
    source: String,
    accepted: bool,
    plan: &'a pinroute_rs::board::BoardPlan,
    issues: &'a pinroute_rs::resolve::IssueLog,
}

fn log_level(cli: &Cli) -> tracing::Level {
    if cli.quiet {
        return tracing::Level::WARN;
    }
    match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

async fn read_text(path: &Path) -> Result<String, ConvertError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Converts every target concurrently. Results come back in argument order.
async fn convert_all(
    targets: &[PathBuf],
    pinmap_text: Arc<String>,
    config: Arc<ConverterConfig>,
) -> Result<Vec<(PathBuf, Conversion)>, ConvertError> {
    let mut set = JoinSet::new();
    for (position, path) in targets.iter().enumerate() {
        let target_text = read_text(path).await?;
        let pinmap_text = Arc::clone(&pinmap_text);
        let config = Arc::clone(&config);
        let path = path.clone();
        set.spawn_blocking(move || {
            let conversion = pipeline::convert(&target_text, &pinmap_text, &config);
            (position, path, conversion)
        });
    }

    let mut results = Vec::with_capacity(targets.len());
    while let Some(joined) = set.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(position, _, _)| *position);
    Ok(results
        .into_iter()
        .map(|(_, path, conversion)| (path, conversion))
        .collect())
}

async fn write_plan(
    path: &Path,
    conversion: &Conversion,
    output: Option<&Path>,
) -> Result<(), ConvertError> {
    let document = PlanDocument {
        generated_at: Utc::now(),
        source: path.display().to_string(),
        accepted: conversion.is_accepted(),
        plan: &conversion.plan,
        issues: &conversion.resolved.issues,
    };
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(dir) => {
            let stem = conversion
                .target
                .board_name
                .clone()
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "board".to_string());
            let out_path = dir.join(format!("{}.json", stem));
            tokio::fs::write(&out_path, json)
                .await
                .map_err(|source| ConvertError::Io {
                    path: out_path.clone(),
                    source,
                })?;
            tracing::info!("Wrote {}", out_path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<bool, ConvertError> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => ConverterConfig::default(),
    };

    let pinmap_text = Arc::new(read_text(&cli.pinmap).await?);
    let conversions = convert_all(&cli.targets, pinmap_text, Arc::new(config)).await?;

    let output = match &cli.output {
        Some(dir) if !cli.check => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConvertError::Io {
                    path: dir.clone(),
                    source,
                })?;
            Some(dir.as_path())
        }
        _ => None,
    };

    let mut all_accepted = true;
    for (path, conversion) in &conversions {
        eprintln!("{} ({})\n{}\n", conversion.board_name(), path.display(), conversion.summary());
        if !conversion.is_accepted() {
            all_accepted = false;
            let rejected = ConvertError::Rejected {
                board: conversion.board_name().to_string(),
                errors: conversion.resolved.issues.error_count(),
            };
            tracing::error!("{}", rejected);
            continue;
        }
        if !cli.check {
            write_plan(path, conversion, output).await?;
        }
    }
    Ok(all_accepted)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(log_level(&cli))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
    }
}
