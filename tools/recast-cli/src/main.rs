//! Recast CLI: compile, inspect and run export plans.
//!
//! Usage:
//!   recast export <INPUT> [OPTIONS]   Transcode a recording
//!   recast plan [OPTIONS]             Print the engine plan for some options
//!   recast check                      Check the media engine

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use recast_common::config::{config_file_path, AppConfig};

mod commands;

use commands::options::OptionArgs;

#[derive(Parser)]
#[command(
    name = "recast",
    about = "Export pipeline for the Recast screen recorder",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/recast/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode a recording
    Export {
        /// Recorded media file
        input: PathBuf,

        /// Output file path (defaults to the input name with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source duration in seconds, used for trim checks and progress
        #[arg(long)]
        duration: Option<f64>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Print the engine plan for a set of options
    Plan {
        /// Source duration in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Print the structured plan as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Check that the media engine is usable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config_file_path);
    let mut config = AppConfig::load_from(&config_path);
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    recast_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export {
            input,
            output,
            duration,
            options,
        } => commands::export::run(&config, input, output, duration, options).await,
        Commands::Plan {
            duration,
            json,
            options,
        } => commands::plan::run(&config, duration, json, options),
        Commands::Check => commands::check::run(&config, &config_path).await,
    }
}
