// ABOUTME: Entry point for the bondi CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use bondi::config::{self, Config};
use bondi::error::Result;
use bondi::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands, DockerCommands};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(OutputMode::from_flags(cli.quiet, cli.json));

    if let Err(e) = run(cli.command, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;

    match command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Setup => {
            let config = Config::discover(&cwd)?;
            commands::setup(&config, output).await
        }
        Commands::Deploy { tag } => {
            let config = Config::discover(&cwd)?;
            let cancel = cancel_on_ctrl_c();
            commands::deploy(&config, &tag, &cancel, output).await
        }
        Commands::Status => {
            let config = Config::discover(&cwd)?;
            commands::status(&config, output).await
        }
        Commands::Docker { command } => {
            let config = Config::discover(&cwd)?;
            match command {
                DockerCommands::Ps => commands::docker_ps(&config, output).await,
                DockerCommands::Logs { container } => {
                    commands::docker_logs(&config, &container, output).await
                }
            }
        }
    }
}

/// A token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}
