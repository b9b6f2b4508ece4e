use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `drivelink` - vehicle telematics bridge for home-automation hubs.
#[derive(Parser, Debug)]
#[command(name = "drivelink")]
#[command(version)]
#[command(about = "Normalize vehicle telemetry and inspect bridge configuration.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.drivelink/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a raw status payload and classify it
    Normalize {
        /// Raw payload as returned by the vehicle cloud (JSON)
        raw: PathBuf,

        /// Previous canonical record (JSON), for odometer repair and activity
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Stored park location record (JSON)
        #[arg(long)]
        park: Option<PathBuf>,
    },

    /// Print the effective configuration after env overrides and validation
    Config,
}
