//! HTTP client for the quota service
//!
//! Used by services that spend quota on behalf of a user.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::ledger::UserId;

/// Errors reported by [`QuotaClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("insufficient quota")]
    Insufficient,

    #[error("unknown user")]
    UnknownUser,

    #[error("quota service unavailable")]
    Unavailable,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct QuotaBody {
    remaining: i64,
}

/// Client of the quota service's HTTP API
#[derive(Clone)]
pub struct QuotaClient {
    endpoint: String,
    client: reqwest::Client,
}

impl QuotaClient {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Succeeds when the service reports itself healthy
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self
            .client
            .get(format!("{}/healthcheck", self.endpoint))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::Unavailable);
        }
        Ok(())
    }

    /// Remaining quota of `id`
    pub async fn remaining(&self, id: UserId) -> Result<i64, ClientError> {
        let response = self
            .client
            .get(format!("{}/user/{}", self.endpoint, id))
            .send()
            .await?;

        let body: QuotaBody = check_status(response)?.json().await?;
        Ok(body.remaining)
    }

    /// Spend one unit of `id`'s quota, returning what is left
    pub async fn use_quota(&self, id: UserId) -> Result<i64, ClientError> {
        let response = self
            .client
            .post(format!("{}/user/{}/burn", self.endpoint, id))
            .send()
            .await?;

        let body: QuotaBody = check_status(response)?.json().await?;
        Ok(body.remaining)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => Err(ClientError::Insufficient),
        StatusCode::BAD_REQUEST => Err(ClientError::UnknownUser),
        status if !status.is_success() => Err(ClientError::Unavailable),
        _ => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service() {
        let client = QuotaClient::new(reqwest::Client::new(), "http://127.0.0.1:9/");
        assert!(matches!(
            client.health_check().await,
            Err(ClientError::Http(_))
        ));
    }
}
