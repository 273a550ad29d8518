//! GraphBuilder CLI - Command-line interface for LLM graph extraction.

use clap::Parser;
use graphbuilder_cli::commands;
use graphbuilder_cli::config::OutputFormat;
use graphbuilder_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> graphbuilder_cli::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let format: Option<OutputFormat> = cli.format.map(Into::into);

    match cli.command {
        Command::Init(args) => {
            let formatter = Formatter::new(format.unwrap_or(OutputFormat::Table), !cli.no_color);
            commands::execute_init(args, &config_path, &formatter)?;
        }
        Command::Extract(args) => {
            let config = Config::load(&config_path)?;
            let formatter = Formatter::new(
                format.unwrap_or(config.settings.format),
                !cli.no_color && config.settings.color,
            );
            commands::execute_extract(args, &config, &formatter).await?;
        }
        Command::Schema(args) => {
            let config = Config::load(&config_path)?;
            commands::execute_schema(args, &config)?;
        }
    }

    Ok(())
}
