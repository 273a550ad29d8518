//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GraphBuilder CLI - Extract knowledge graphs from text with an LLM.
#[derive(Debug, Parser)]
#[command(name = "graphbuilder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GRAPHBUILDER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Summary table (default)
    Table,
    /// Full graph documents as JSON
    Json,
    /// One line per document
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract graphs from text files
    Extract(ExtractArgs),

    /// Show the schema, output contract and prompt that extraction would use
    Schema(SchemaArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Input files; each becomes one document
    pub files: Vec<PathBuf>,

    /// Read a single document from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Comma-separated allowed node types (overrides the config)
    #[arg(short = 'n', long)]
    pub allowed_nodes: Option<String>,

    /// Comma-separated allowed relationship types (overrides the config)
    #[arg(short = 'r', long)]
    pub allowed_relationships: Option<String>,

    /// Keep results outside the allowed types
    #[arg(long)]
    pub no_strict: bool,

    /// Split inputs into overlapping word chunks before extraction
    #[arg(long)]
    pub chunk: bool,

    /// Process documents one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Write JSON results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the schema command.
#[derive(Debug, Parser)]
pub struct SchemaArgs {
    /// Comma-separated allowed node types (overrides the config)
    #[arg(short = 'n', long)]
    pub allowed_nodes: Option<String>,

    /// Comma-separated allowed relationship types (overrides the config)
    #[arg(short = 'r', long)]
    pub allowed_relationships: Option<String>,

    /// Also print the system prompt for prompt-driven extraction
    #[arg(long)]
    pub prompt: bool,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
