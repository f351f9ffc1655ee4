//! HTTP server lifecycle for the companion API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use quillterm_core::ControlState;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::routes::create_router;
use crate::ApiState;

/// Handle to a running HTTP API server. Dropping the handle shuts the
/// server down.
pub struct HttpApiServer {
    addr: SocketAddr,
    token: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl HttpApiServer {
    /// Binds on localhost and starts serving. A `port` of 0 picks a free
    /// port; the bound address is available through [`addr`](Self::addr).
    pub async fn start(
        control: Arc<ControlState>,
        port: u16,
        token: String,
    ) -> Result<Self> {
        let state = Arc::new(ApiState::new(control, token.clone()));
        let router = create_router(state);

        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind http api on port {port}"))?;
        let addr = listener.local_addr().context("http api local_addr")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(error) = serve.await {
                tracing::error!(%error, "http api server exited");
            }
        });

        tracing::info!(%addr, "http api listening");
        Ok(Self {
            addr,
            token,
            shutdown: Some(shutdown_tx),
        })
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for HttpApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
