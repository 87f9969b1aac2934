//! Clap derive structures for the `zonekeep` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zonekeep -- keep DNS zones in line with what they should serve
#[derive(Debug, Parser)]
#[command(
    name = "zonekeep",
    version,
    about = "Diff, apply, and check DNS zones from the command line",
    long_about = "Compute the corrections that bring a live zone to a target zone,\n\
        apply them, group records into services, and run zone checks.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "ZONEKEEP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZONEKEEP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the corrections turning a live zone into a target zone
    Diff(DiffArgs),

    /// Apply corrections and print the resulting zone
    Apply(ApplyArgs),

    /// Group a zone's records into services
    Import(ImportArgs),

    /// Run zone checks
    Check(CheckArgs),

    /// Inspect available checkers
    Checkers(CheckersArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Zone arguments ───────────────────────────────────────────────────

/// A zone file and the origin its relative names hang off.
#[derive(Debug, Args)]
pub struct ZoneSource {
    /// Zone origin (e.g. example.com)
    #[arg(long)]
    pub origin: String,

    /// TTL for records that carry none and precede any $TTL
    #[arg(long, default_value = "3600")]
    pub default_ttl: u32,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Zone file describing what is served today
    #[arg(long)]
    pub live: PathBuf,

    /// Zone file describing what should be served
    #[arg(long)]
    pub target: PathBuf,

    #[command(flatten)]
    pub zone: ZoneSource,

    /// Include DNSSEC maintenance records in the comparison
    #[arg(long)]
    pub keep_dnssec: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Zone file describing what is served today
    #[arg(long)]
    pub live: PathBuf,

    /// Zone file describing what should be served
    #[arg(long)]
    pub target: PathBuf,

    #[command(flatten)]
    pub zone: ZoneSource,

    /// Include DNSSEC maintenance records in the comparison
    #[arg(long)]
    pub keep_dnssec: bool,

    /// Leave the SOA serial alone
    #[arg(long)]
    pub keep_serial: bool,

    /// Rewrite the live file with the result
    #[arg(long)]
    pub write: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Zone file to analyze
    pub file: PathBuf,

    #[command(flatten)]
    pub zone: ZoneSource,
}

// ── Check ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(subcommand)]
    pub command: CheckCommand,
}

#[derive(Debug, Subcommand)]
pub enum CheckCommand {
    /// Run one checker against a zone file
    Run(CheckRunArgs),
}

#[derive(Debug, Args)]
pub struct CheckRunArgs {
    /// Checker id (see `zonekeep checkers list`)
    pub checker: String,

    /// Zone file to check
    #[arg(long = "zone", value_name = "FILE")]
    pub zone_file: PathBuf,

    #[command(flatten)]
    pub zone: ZoneSource,

    /// Check the service at this subdomain instead of the whole domain
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Run option as key=value (repeatable)
    #[arg(long = "opt", value_name = "KEY=VALUE")]
    pub opts: Vec<String>,

    /// Give up waiting after this long (e.g. 30s)
    #[arg(long)]
    pub wait: Option<String>,

    /// Print the checker's HTML report instead of the result
    #[arg(long)]
    pub html: bool,
}

// ── Checkers ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckersArgs {
    #[command(subcommand)]
    pub command: CheckersCommand,
}

#[derive(Debug, Subcommand)]
pub enum CheckersCommand {
    /// List registered checkers
    #[command(alias = "ls")]
    List,

    /// Show the documented options of a checker
    Options {
        /// Checker id
        checker: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
