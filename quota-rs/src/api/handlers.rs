//! HTTP handlers for the quota service

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::admission::{Admission, Outcome};
use crate::error::QuotaError;
use crate::ledger::{LedgerEntry, UserId};

/// Shared application state
pub struct AppState {
    pub admission: Admission,
}

/// Remaining quota of one user
#[derive(Debug, Serialize, Deserialize)]
pub struct QuotaResponse {
    pub remaining: i64,
}

/// Body of PUT /user/:id
#[derive(Debug, Deserialize)]
pub struct SetQuotaRequest {
    pub remaining: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(status: StatusCode, msg: &str) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError::new(msg)))
}

fn parse_id(raw: &str) -> Result<UserId, (StatusCode, Json<ApiError>)> {
    raw.parse()
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid user ID"))
}

fn store_error(e: QuotaError) -> (StatusCode, Json<ApiError>) {
    match e {
        QuotaError::UnknownUser(_) => reject(StatusCode::BAD_REQUEST, "Unknown user"),
        QuotaError::InvalidQuota(_) => reject(StatusCode::BAD_REQUEST, "Quota must be >= 0"),
        e => {
            error!("Quota store error: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
        }
    }
}

/// GET /healthcheck - Healthy when the ledger answers
pub async fn healthcheck(State(state): State<Arc<AppState>>) -> Response {
    match state.admission.store().ping().await {
        Ok(()) => (StatusCode::OK, "healthy").into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error").into_response()
        }
    }
}

/// GET /user/:id - Remaining quota of a user
pub async fn get_quota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<QuotaResponse> {
    let id = parse_id(&id)?;
    let remaining = state.admission.remaining(id).await.map_err(store_error)?;
    Ok(Json(QuotaResponse { remaining }))
}

/// GET|POST /user/:id/burn - Consume one unit of a user's quota
pub async fn burn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<QuotaResponse> {
    let id = parse_id(&id)?;

    match state.admission.consume(id).await {
        Outcome::Granted { remaining } => Ok(Json(QuotaResponse { remaining })),
        Outcome::Insufficient => Err(reject(StatusCode::TOO_MANY_REQUESTS, "Insufficient quota")),
        Outcome::UnknownUser => Err(reject(StatusCode::BAD_REQUEST, "Unknown user")),
        Outcome::Unavailable => Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")),
    }
}

/// GET /quotas - Every ledger entry, ordered by user id
pub async fn list_quotas(State(state): State<Arc<AppState>>) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .admission
        .store()
        .scan_all()
        .await
        .map_err(store_error)?;
    Ok(Json(entries))
}

/// PUT /user/:id - Overwrite a user's remaining quota
pub async fn set_quota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SetQuotaRequest>,
) -> ApiResult<QuotaResponse> {
    let id = parse_id(&id)?;

    state
        .admission
        .store()
        .bump(id, payload.remaining)
        .await
        .map_err(store_error)?;

    Ok(Json(QuotaResponse {
        remaining: payload.remaining,
    }))
}
