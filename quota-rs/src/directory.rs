//! User directory abstraction
//!
//! The directory owns user identities; the quota service only needs the list
//! of known ids.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{QuotaError, Result};
use crate::ledger::UserId;

/// A user as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub name: String,
}

/// Source of known user ids
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Every user id currently known to the directory
    async fn all_ids(&self) -> Result<Vec<UserId>>;
}

/// Directory backed by the user service's HTTP API
pub struct HttpDirectory {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpDirectory {
    /// Create a client for the user service at `endpoint`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuotaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Full user listing, ordered by id
    pub async fn all_users(&self) -> Result<Vec<DirectoryUser>> {
        let url = format!("{}/users", self.endpoint);
        debug!("Fetching user directory: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuotaError::Directory(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl Directory for HttpDirectory {
    async fn all_ids(&self) -> Result<Vec<UserId>> {
        let users = self.all_users().await?;
        Ok(users.into_iter().map(|u| u.id).collect())
    }
}
