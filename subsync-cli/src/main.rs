//! subsync: keep local subtitle files and YouTube caption tracks in step.
//!
//! # Usage
//!
//! ```text
//! subsync project create <name> (--channel <nickname> | --video <id>...)
//! subsync project list
//! subsync sync <project> [--dry-run] [--allow-deletes] [--no-cache] [--yes]
//! subsync process --csv <file> [--dry-run] [--no-cache] [--yes]
//! subsync export <nickname> [--output <file>] [--no-cache]
//! subsync report <nickname> [--output <file>] [--no-cache]
//! subsync upload <file>... [--video <id>] [--language <code>] [--dry-run] [--yes]
//! subsync status [<project>] [--json]
//! ```

mod commands;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    export::ExportArgs, process::ProcessArgs, project::ProjectCommand, report::ReportArgs,
    status::StatusArgs, sync::SyncArgs, upload::UploadArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "subsync",
    version,
    about = "Synchronize local subtitle files with YouTube caption tracks",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or list caption projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Reconcile a project's local files with the remote captions.
    Sync(SyncArgs),

    /// Run the UPLOAD/UPDATE/DELETE actions listed in a CSV file.
    Process(ProcessArgs),

    /// Write a channel's captions to a CSV ready for `process`.
    Export(ExportArgs),

    /// Write a wide CSV with one row per video and one column per language.
    Report(ReportArgs),

    /// Upload one or more subtitle files to a single video.
    Upload(UploadArgs),

    /// Show the recorded caption state of projects (offline).
    Status(StatusArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Project { command } => commands::project::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Process(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Report(args) => args.run(),
        Commands::Upload(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
