//! Turnkit CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use turnkit::cli::{Cli, Commands};
use turnkit::models::SUPPORTED_MODELS;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Chat(args) => turnkit::cli::chat::run(args).await,
        Commands::Ask(args) => turnkit::cli::ask::run(args).await,
        Commands::Models => handle_models(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn handle_models() -> turnkit::error::Result<()> {
    println!("{}", serde_json::to_string_pretty(SUPPORTED_MODELS)?);
    Ok(())
}
