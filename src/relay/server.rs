use crate::relay::handlers::{self, RelayState};
use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// HTTP relay exposing Yahoo Finance search and history to browsers.
pub struct RelayServer {
    state: Arc<RelayState>,
}

impl RelayServer {
    /// Builds a relay forwarding to `upstream`, giving up on each upstream
    /// call after `timeout`.
    pub fn new(upstream: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            state: Arc::new(RelayState {
                client,
                upstream: upstream.trim_end_matches('/').to_string(),
            }),
        })
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/yahoo/search", get(handlers::search))
            .route("/api/yahoo/history", get(handlers::history))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the relay listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Yahoo relay listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
