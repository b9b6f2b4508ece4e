#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing_subscriber::FmtSubscriber;

mod cli;

use cli::commands::{Cli, Commands};
use drivelink::Config;
use drivelink::activity::classify;
use drivelink::status::{NormalizeContext, PollSnapshot, RawStatus, StatusRecord, normalize};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.logging.max_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match cli.command {
        Commands::Normalize { raw, previous, park } => {
            run_normalize(&config, &raw, previous.as_deref(), park.as_deref())
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn run_normalize(
    config: &Config,
    raw: &Path,
    previous: Option<&Path>,
    park: Option<&Path>,
) -> Result<()> {
    let snapshot = PollSnapshot::new(read_json(raw)?);
    let previous: StatusRecord = previous.map(read_json).transpose()?.unwrap_or_default();
    let park: Option<StatusRecord> = park.map(read_json).transpose()?;

    let schema = RawStatus::detect(&snapshot)
        .context("Payload does not decode as any known schema")?
        .map(|raw| raw.schema_name());

    let ctx = NormalizeContext {
        previous: &previous,
        home: &config.home,
        alarms: &config.alarms,
    };
    let record = normalize(Some(&snapshot), &ctx);
    let activity = classify(&record, &previous, park.as_ref());

    let output = serde_json::json!({
        "schema": schema,
        "record": record,
        "activity": activity,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
