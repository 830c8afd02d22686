// ABOUTME: Entry point of the agent that runs on every host.
// ABOUTME: Connects to the local engine and serves the deploy API.

use bondi::agent::{self, AgentArgs, AgentState};
use bondi::error::Result;
use bondi::runtime::BollardRuntime;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = AgentArgs::parse();

    let default = if args.verbose {
        "bondi=debug,tower_http=debug"
    } else {
        "bondi=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "agent stopped");
        std::process::exit(1);
    }
}

async fn run(args: AgentArgs) -> Result<()> {
    let engine = BollardRuntime::connect_unix(&args.socket)?;
    engine.ping().await?;
    tracing::info!(socket = %args.socket, "connected to engine");

    let shutdown = CancellationToken::new();
    let state = Arc::new(AgentState::new(
        Arc::new(engine),
        args.settings(),
        shutdown.clone(),
    ));

    let listener = TcpListener::bind(args.listen).await?;
    let signal = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutting down");
        signal.cancel();
    });

    agent::serve(listener, state, shutdown.cancelled_owned()).await?;
    Ok(())
}

/// Ctrl-C, or SIGTERM from `docker stop`.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
