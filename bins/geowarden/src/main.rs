use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use geowarden_api::ControlServer;
use geowarden_supervisor::{Supervisor, SupervisorConfig};

/// Geowarden - supervisor for a long-running geodata server process
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Port for the control API (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Launch the child process immediately instead of waiting for a start request
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = SupervisorConfig::load_from_file(&args.config)?;
    if let Some(port) = args.port {
        config.supervisor.port = port;
    }

    initialize_logging(if args.debug {
        "debug"
    } else {
        &config.supervisor.log_level
    })?;

    info!("Starting geowarden");
    info!(
        config = %args.config,
        executable = %config.process.executable_path,
        port = config.supervisor.port,
        "configuration loaded"
    );

    let supervisor = Arc::new(Supervisor::new(config.process, config.output));

    if args.autostart {
        match supervisor.start().await {
            Ok(status) => info!(state = %status.state, "child process autostarted"),
            Err(e) => warn!(error = %e, "autostart failed; waiting for a start request"),
        }
    }

    let server = ControlServer::new(Arc::clone(&supervisor), config.supervisor.port);
    server
        .run_with_shutdown(shutdown_signal())
        .await
        .context("control API server failed")?;

    info!("Shutting down; stopping child process");
    supervisor
        .shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("shutdown failed: {}", e))?;
    info!("geowarden stopped");

    Ok(())
}

fn initialize_logging(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
