//! Keepsake CLI: download and organize a memories export.
//!
//! Usage:
//!   keepsake download <INPUT>   Download every memory of an export
//!   keepsake inspect <INPUT>    Summarize an export without downloading
//!   keepsake check              Check external tools and configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keepsake_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "keepsake",
    about = "Download, recombine, and organize exported memories",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every memory listed in an export document
    Download(commands::download::DownloadArgs),

    /// Summarize an export document without downloading anything
    Inspect {
        /// Export document (.html or .json)
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check external tools and configuration
    Check {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    keepsake_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Download(args) => commands::download::run(args, &config.run).await,
        Commands::Inspect { input, json } => commands::inspect::run(input, json),
        Commands::Check { write_config } => commands::check::run(&config, write_config),
    }
}
