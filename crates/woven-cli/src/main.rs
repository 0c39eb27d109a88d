//! woven CLI tool.
//!
//! Usage:
//! ```bash
//! woven weave [OPTIONS] [PATH]
//! woven match [PATH]
//! woven aspects [PATH]
//! woven init
//! woven cache clear [PATH]
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Load-time aspect weaver for Rust source units
#[derive(Parser)]
#[command(name = "woven")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weave units and write them to the output directory
    Weave {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Weave only this unit and the modules it loads
        #[arg(short, long)]
        unit: Option<String>,

        /// Output directory (overrides `weaver.output_dir`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List join points and the aspects selecting them, without weaving
    Match {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List aspects in weaving order
    Aspects {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Manage the weave cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cache entry
    Clear {
        /// Project directory (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One line per entry.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Weave {
            path,
            unit,
            out,
            format,
        } => commands::weave::run(&path, unit.as_deref(), out, format, config),
        Commands::Match { path, format } => commands::match_units::run(&path, format, config),
        Commands::Aspects { path } => commands::aspects::run(&path, config),
        Commands::Init { force } => commands::init::run(force),
        Commands::Cache {
            action: CacheAction::Clear { path },
        } => commands::cache::clear(&path, config),
    }
}
