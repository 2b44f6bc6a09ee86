//! HTTP API of the user directory

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::Result;
use crate::store::{User, UserStore};

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

fn reject(status: StatusCode, msg: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: msg.to_string(),
        }),
    )
}

fn internal(e: crate::error::UserError) -> (StatusCode, Json<ApiError>) {
    error!("User store error: {}", e);
    reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
}

/// GET /healthcheck
pub async fn healthcheck(State(store): State<UserStore>) -> Response {
    match store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy").into_response(),
        Err(e) => internal(e).into_response(),
    }
}

/// GET /users - All users, ordered by id
pub async fn list_users(
    State(store): State<UserStore>,
) -> std::result::Result<Json<Vec<User>>, (StatusCode, Json<ApiError>)> {
    store.all().await.map(Json).map_err(internal)
}

/// GET /user/:name - Look up a user by name
pub async fn get_user(
    State(store): State<UserStore>,
    Path(name): Path<String>,
) -> std::result::Result<Json<User>, (StatusCode, Json<ApiError>)> {
    match store.by_name(&name).await.map_err(internal)? {
        Some(user) => Ok(Json(user)),
        None => Err(reject(StatusCode::NOT_FOUND, "Unknown user")),
    }
}

pub fn router(store: UserStore) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/users", get(list_users))
        .route("/user/:name", get(get_user))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Serve on `listener` until `shutdown` is cancelled
pub async fn serve(
    store: UserStore,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("User API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("User API stopped");
    Ok(())
}
