//! HTTP responder serving the metrics endpoint

use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::output::{MetricsFormatter, PrometheusFormatter};
use crate::poller::Poller;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const INDEX_PAGE: &str = "<h1>Welcome to Speedtest-Exporter.</h1>Click <a href='/metrics'>here</a> to see metrics.";

/// Shared state for request handlers
#[derive(Clone)]
pub struct ServerState {
    poller: Poller,
    formatter: Arc<PrometheusFormatter>,
    logger: Logger,
}

impl ServerState {
    pub fn new(poller: Poller, logger: Logger) -> Self {
        Self {
            poller,
            formatter: Arc::new(PrometheusFormatter::new()),
            logger,
        }
    }
}

/// Build the router: `/metrics` and the landing page
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    let snapshot = state.poller.scrape().await;

    state.logger.debug("Served metrics scrape")
        .field("up", snapshot.up())
        .field("running", snapshot.running)
        .log()
        .await;

    (
        [(header::CONTENT_TYPE, state.formatter.content_type())],
        state.formatter.format(&snapshot),
    )
}

/// Metrics HTTP server bound to a socket
pub struct MetricsServer {
    listener: TcpListener,
    state: ServerState,
}

impl MetricsServer {
    /// Bind the listening socket; port 0 picks a free port
    pub async fn bind(addr: SocketAddr, poller: Poller, logger: Logger) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::server(format!("Failed to bind {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            state: ServerState::new(poller, logger),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| AppError::server(format!("Failed to read local address: {}", e)))
    }

    /// Serve until `shutdown` resolves, then stop the poller and drain
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let poller = self.state.poller.clone();
        let logger = self.state.logger.clone();
        let app = router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                poller.shutdown();
                logger.info("Shutting down HTTP responder").log().await;
            })
            .await
            .map_err(|e| AppError::server(format!("Server error: {}", e)))
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
