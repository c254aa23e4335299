//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Override;

/// Top-level CLI entry point for the rsyslog cookbook engine.
#[derive(Parser, Debug)]
#[command(
    name = "rsyslog-cookbook",
    about = "Plan, render and converge rsyslog configuration for a target platform",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Target platform name (ubuntu, debian, centos, rhel, smartos, omnios, ...)
    #[arg(long, global = true, default_value = "ubuntu")]
    pub platform: String,

    /// Target platform version (e.g. 16.04, 6.9, 5.11, 151018)
    #[arg(long = "platform-version", global = true, default_value = "16.04")]
    pub platform_version: String,

    /// TOML attribute file with an [rsyslog] table
    #[arg(short, long, global = true)]
    pub attributes: Option<PathBuf>,

    /// Override an attribute (repeatable), e.g. --set use_relp=true
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resource plan
    Plan(PlanOpts),
    /// Write every rendered file under a directory
    Render(RenderOpts),
    /// Converge a simulated host and report what changed
    Converge(ConvergeOpts),
    /// Print version information
    Version,
}

/// Output format for `plan`.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable listing.
    #[default]
    Text,
    /// JSON document.
    Json,
}

/// Options for the `plan` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct PlanOpts {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Options for the `render` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RenderOpts {
    /// Directory the rendered files are written under
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Options for the `converge` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ConvergeOpts {
    /// Number of convergence passes
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub passes: u32,
}
