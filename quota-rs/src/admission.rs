//! Admission decisions
//!
//! Turns a single ledger decrement into an outcome the request layer can act
//! on. No retries happen here; retry policy belongs to the caller.

use tracing::{debug, warn};

use crate::error::{QuotaError, Result};
use crate::ledger::{LedgerStore, UserId};

/// Outcome of a consumption request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// One unit was taken; `remaining` is informational
    Granted { remaining: i64 },
    /// The user's quota is exhausted
    Insufficient,
    /// No ledger entry exists for the user
    UnknownUser,
    /// The ledger could not be reached
    Unavailable,
}

impl Outcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Outcome::Granted { .. })
    }
}

/// Admission front of the ledger
#[derive(Clone)]
pub struct Admission {
    store: LedgerStore,
}

impl Admission {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Consume one unit for `id`
    pub async fn consume(&self, id: UserId) -> Outcome {
        match self.store.try_consume(id).await {
            Ok(consumption) if consumption.consumed => Outcome::Granted {
                remaining: consumption.remaining,
            },
            Ok(_) => {
                debug!("Quota exhausted for user {}", id);
                Outcome::Insufficient
            }
            Err(QuotaError::UnknownUser(_)) => Outcome::UnknownUser,
            Err(e) => {
                warn!("Failed to consume quota for user {}: {}", id, e);
                Outcome::Unavailable
            }
        }
    }

    /// Remaining quota of `id`
    pub async fn remaining(&self, id: UserId) -> Result<i64> {
        self.store.get(id).await
    }

    /// Underlying ledger
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}
