//! Reelsmith CLI: probe media, validate and plan timeline projects, export them to video.
//!
//! Usage:
//!   reelsmith probe <FILE>                    Show what the composer sees in a media file
//!   reelsmith validate <PROJECT>              Report problems in a project file
//!   reelsmith plan <PROJECT> [--json]         Build the composition without rendering
//!   reelsmith export <PROJECT> -o <OUT>       Render a project to a video file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reelsmith_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelsmith",
    about = "Timeline composition and export for short-form video",
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
    /// Probe a media file or URL
    Probe {
        /// Path or URL of the media
        file: String,

        /// Print the probe result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a timeline project
    Validate {
        /// Path to the project file
        project: PathBuf,
    },

    /// Build the composition and print its layout
    Plan {
        /// Path to the project file
        project: PathBuf,

        /// Print the full composition result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a project to video
    Export {
        /// Path to the project file
        project: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export quality: standard|high|ultra (defaults to the configured quality)
        #[arg(long)]
        quality: Option<String>,
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
    reelsmith_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Probe { file, json } => commands::probe::run(&config, file, json).await,
        Commands::Validate { project } => commands::validate::run(project).await,
        Commands::Plan { project, json } => commands::plan::run(&config, project, json).await,
        Commands::Export {
            project,
            output,
            quality,
        } => commands::export::run(&config, project, output, quality).await,
    }
}
