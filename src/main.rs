use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quillterm_api::{auth, HttpApiServer};
use quillterm_core::{Config, ControlState};
use quillterm_ipc::{IpcServer, RpcDispatcher, RpcHandler};

#[derive(Debug, Parser)]
#[command(name = "quillterm", about = "quillterm control-plane server")]
struct Args {
    /// Override socket path (default: ~/.config/quillterm/quillterm.sock)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Override HTTP API port; 0 picks a free port
    #[arg(long)]
    port: Option<u16>,

    /// Disable the HTTP API regardless of config
    #[arg(long)]
    no_api: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("quillterm v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load config
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let state = Arc::new(ControlState::new(&config));

    let socket = args.socket.unwrap_or_else(|| config.socket_path());
    let dispatcher = Arc::new(RpcDispatcher::new(state.clone()));
    let handler: RpcHandler = Arc::new(move |request| dispatcher.handle(request));
    let _ipc = IpcServer::start(&socket, handler)?;
    info!(socket = %socket.display(), "control socket ready");

    let _http = if config.api.enabled && !args.no_api {
        let token = auth::load_or_create_token(&Config::api_token_path())?;
        let port = args.port.unwrap_or(config.api.port);
        let server = HttpApiServer::start(state, port, token).await?;
        info!(url = %server.url(), "http api ready");
        Some(server)
    } else {
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
