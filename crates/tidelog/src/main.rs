//! tidelog CLI - write, inspect and rotate structured log streams

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    output::set_json_mode(cli.json);

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "tidelog={0},tidelog_core={0},tidelog_rotation={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();

    let stream = &cli.stream;
    let result = match cli.command {
        Commands::Write(args) => write::execute(stream, args).await,
        Commands::Show(args) => show::execute(stream, args).await,
        Commands::Search(args) => search::execute(stream, args).await,
        Commands::Clear(args) => clear::execute(stream, args).await,
        Commands::Rotate => rotate::execute(stream).await,
        Commands::Export(args) => export::execute(stream, args).await,
        Commands::Tail(args) => tail::execute(stream, args).await,
        Commands::Status => status::execute(stream).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
