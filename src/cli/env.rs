use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

/// Costline - menu costing with lock-aware price propagation
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, default_value = "human")]
    pub output: crate::cli::output::OutputFormat,

    /// Store snapshot (JSON or YAML); overrides `store_path` from the config file
    #[arg(short, long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
