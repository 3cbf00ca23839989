//! Courier entry point.
//!
//! Binary name: `courier`
//!
//! Loads configuration and credentials, then serves the LINE webhook until
//! SIGINT/SIGTERM, draining in-flight exchanges before exit.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use courier_core::maintenance::spawn_sweeper;
use courier_infra::config::load_relay_config;
use courier_infra::secret::RelaySecrets;
use courier_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_directives};

use cli::{Cli, Commands, ServeArgs};
use state::ConcreteState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(verbosity_directives(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Some(Commands::Serve(args)) => serve(args).await,
        Some(Commands::CheckConfig { config }) => check_config(&config).await,
        None => serve(cli.serve).await,
    };

    shutdown_tracing();
    result
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_relay_config(&args.config)
        .await
        .context("failed to load configuration")?;
    let secrets = RelaySecrets::from_env().context("refusing to start")?;

    let state = ConcreteState::init(&config, secrets);

    let sweeper_cancel = CancellationToken::new();
    let sweeper = spawn_sweeper(
        state.dispatcher.store().clone(),
        state.redelivery.clone(),
        config.sweep_interval(),
        sweeper_cancel.clone(),
    );

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!(
        "  {} Courier listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}/callback")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped accepting requests, draining exchanges");
    sweeper_cancel.cancel();
    state.dispatcher.shutdown().await;
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "sweeper task ended abnormally");
    }

    println!("\n  Server stopped.");
    Ok(())
}

async fn check_config(path: &std::path::Path) -> anyhow::Result<()> {
    let config = load_relay_config(path)
        .await
        .context("failed to load configuration")?;

    let check_mark = |ok: bool| {
        if ok {
            format!("{}", console::style("✓").green())
        } else {
            format!("{}", console::style("✗").red())
        }
    };

    let secrets = RelaySecrets::from_env();
    println!();
    println!("  {} Configuration ({})", check_mark(true), path.display());
    println!("      model: {}", console::style(&config.model).cyan());
    println!(
        "      workers: {} concurrent, {} pending",
        config.max_concurrent_exchanges, config.max_pending_exchanges
    );
    match &secrets {
        Ok(_) => println!("  {} Credentials present", check_mark(true)),
        Err(e) => println!("  {} {e}", check_mark(false)),
    }
    println!();

    secrets.map(|_| ()).context("credentials incomplete")
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
