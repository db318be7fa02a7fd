//! routerd - router management daemon
//!
//! Serves the router operation catalog over HTTP (`serve`) or as MCP tools
//! on stdio (`mcp`). Both front ends share one dispatcher and one session
//! manager.
//!
//! Usage:
//!   routerd [--config routerd.toml] serve [--port 8000] [--bind 0.0.0.0]
//!   routerd [--config routerd.toml] mcp

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use router_api::{create_router, AppState};
use router_core::{Dispatcher, SessionManager};
use router_mcp::McpServer;
use router_sim::SimRouter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "routerd")]
#[command(author, version, about = "Router management gateway (HTTP API and MCP tools)")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "ROUTERD_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Listen port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Listen address (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run the MCP tool server on stdin/stdout
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        port: None,
        bind: None,
    });

    // stdout carries the protocol in mcp mode
    init_logging(cli.log_json, matches!(command, Command::Mcp));

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    let dispatcher = Arc::new(build_dispatcher(&config)?);

    match command {
        Command::Serve { port, bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let port = port.unwrap_or(config.server.port);
            serve(dispatcher.clone(), &bind, port).await?;
        }
        Command::Mcp => {
            tracing::info!("Starting MCP server on stdio");
            McpServer::new(dispatcher.clone())
                .run_stdio()
                .await
                .context("MCP server failed")?;
        }
    }

    dispatcher.sessions().disconnect().await;
    tracing::info!("routerd stopped");
    Ok(())
}

fn init_logging(json: bool, to_stderr: bool) {
    let writer = || {
        if to_stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::stdout)
        }
    };
    let (plain, json) = if json {
        (None, Some(fmt::layer().json().with_writer(writer())))
    } else {
        (Some(fmt::layer().with_writer(writer())), None)
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "routerd=info,router_api=info,router_core=info,router_mcp=info".into()
        }))
        .with(plain)
        .with(json)
        .init();
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let credentials = config.credentials(|key| std::env::var(key).ok())?;
    if !config.simulator.enabled {
        bail!("No router backend available: set simulator.enabled = true");
    }

    tracing::info!(
        hostname = %credentials.hostname,
        username = %credentials.username,
        use_ssl = credentials.use_ssl,
        policy = %config.session.policy,
        "Using simulated router"
    );
    let sim = SimRouter::new(&credentials.username, &credentials.password);
    sim.set_latency(config.simulator.latency());
    sim.set_speedtest_duration(config.simulator.speedtest_duration());

    let sessions = SessionManager::new(Arc::new(sim), credentials, config.session.clone());
    Ok(Dispatcher::new(sessions, config.dispatch_config()))
}

async fn serve(dispatcher: Arc<Dispatcher>, bind: &str, port: u16) -> Result<()> {
    let app = create_router(AppState::new(dispatcher));

    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
