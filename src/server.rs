//! Local HTTP origin serving the compiled page.

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, info};
use url::Url;

use crate::{Result, VrtError};

/// Static file server over a directory, running until [`shutdown`].
///
/// [`shutdown`]: PageServer::shutdown
pub struct PageServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PageServer {
    /// Binds `listen` and starts serving `root`. Port 0 picks a free port.
    pub async fn start(root: &Path, listen: SocketAddr) -> Result<Self> {
        if !root.is_dir() {
            return Err(VrtError::Server(format!(
                "Page directory {} does not exist",
                root.display()
            )));
        }

        let listener = TcpListener::bind(listen)
            .await
            .map_err(|e| VrtError::Server(format!("failed to bind {listen}: {e}")))?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .fallback_service(ServeDir::new(root).append_index_html_on_directories(true));

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(err) = served {
                debug!("Page server stopped with error: {err}");
            }
        });

        info!("Serving {} on http://{addr}", root.display());
        Ok(Self {
            addr,
            cancel,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the served page.
    pub fn origin(&self) -> Result<Url> {
        Url::parse(&format!("http://{}/", self.addr))
            .map_err(|e| VrtError::Server(format!("invalid origin for {}: {e}", self.addr)))
    }

    /// Stops accepting connections and waits for the server task to end.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            debug!("Page server task ended abnormally: {err}");
        }
    }
}
