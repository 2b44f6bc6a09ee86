//! API Server - HTTP front of the quota ledger

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admission::Admission;
use crate::api::handlers::{self, AppState};
use crate::error::Result;

/// Quota HTTP server
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(admission: Admission) -> Self {
        Self {
            state: Arc::new(AppState { admission }),
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthcheck", get(handlers::healthcheck))
            .route("/quotas", get(handlers::list_quotas))
            .route("/user/:id", get(handlers::get_quota).put(handlers::set_quota))
            .route("/user/:id/burn", get(handlers::burn).post(handlers::burn))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listener` until `shutdown` is cancelled
    ///
    /// In-flight requests are allowed to finish.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let router = self.router();
        info!("Quota API listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Quota API stopped");
        Ok(())
    }
}
