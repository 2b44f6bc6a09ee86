use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::types::{Consumption, LedgerEntry, ReplenishPolicy, UserId};
use crate::error::{QuotaError, Result};

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_CONNECTIONS: u32 = 8;

/// SQLite-backed quota ledger
///
/// Every mutation runs as one SQLite transaction whose first statement is the
/// write, so the database write lock is held before anything is read and no
/// caller ever performs a read-modify-write pair of its own.
#[derive(Clone)]
pub struct LedgerStore {
    db: SqlitePool,
}

impl LedgerStore {
    /// Open (creating if missing) the ledger database and its table
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        // Every connection to a plain in-memory database is a separate
        // database, and recycling the only connection would wipe it
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let db = pool_options.connect_with(options).await?;
        let store = Self::with_pool(db).await?;

        info!("Quota ledger opened: {}", database_url);
        Ok(store)
    }

    /// Wrap an existing pool
    pub async fn with_pool(db: SqlitePool) -> Result<Self> {
        let store = Self { db };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quota (
                user_id INTEGER PRIMARY KEY,
                remaining INTEGER NOT NULL CHECK (remaining >= 0)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Create an entry holding `quota` for every id that has none yet
    ///
    /// Existing entries are left untouched. Returns how many were created.
    pub async fn initialize(&self, ids: &[UserId], quota: i64) -> Result<u64> {
        if quota < 0 {
            return Err(QuotaError::InvalidQuota(quota));
        }

        let mut tx = self.db.begin().await?;
        let mut created = 0;

        for id in ids {
            created += sqlx::query("INSERT OR IGNORE INTO quota (user_id, remaining) VALUES (?, ?)")
                .bind(id.get())
                .bind(quota)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;

        if created > 0 {
            debug!("Initialized {} ledger entries with quota {}", created, quota);
        }
        Ok(created)
    }

    /// Current remaining quota of a user
    pub async fn get(&self, id: UserId) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT remaining FROM quota WHERE user_id = ?")
            .bind(id.get())
            .fetch_optional(&self.db)
            .await?;

        row.map(|(remaining,)| remaining)
            .ok_or(QuotaError::UnknownUser(id))
    }

    /// Take one unit if any is left
    ///
    /// When the entry is already at zero nothing changes and the result is
    /// floored. Concurrent callers on the same entry are serialized by the
    /// write lock taken by the conditional update.
    pub async fn try_consume(&self, id: UserId) -> Result<Consumption> {
        let mut tx = self.db.begin().await?;

        let updated: Option<(i64,)> = sqlx::query_as(
            "UPDATE quota SET remaining = remaining - 1 WHERE user_id = ? AND remaining > 0 RETURNING remaining",
        )
        .bind(id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let consumption = match updated {
            Some((remaining,)) => Consumption::taken(remaining),
            None => {
                let existing: Option<(i64,)> =
                    sqlx::query_as("SELECT remaining FROM quota WHERE user_id = ?")
                        .bind(id.get())
                        .fetch_optional(&mut *tx)
                        .await?;

                match existing {
                    Some((remaining,)) => Consumption::floored(remaining),
                    None => return Err(QuotaError::UnknownUser(id)),
                }
            }
        };

        tx.commit().await?;
        Ok(consumption)
    }

    /// Unconditionally set a user's remaining quota
    pub async fn bump(&self, id: UserId, new_value: i64) -> Result<()> {
        if new_value < 0 {
            return Err(QuotaError::InvalidQuota(new_value));
        }

        let result = sqlx::query("UPDATE quota SET remaining = ? WHERE user_id = ?")
            .bind(new_value)
            .bind(id.get())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QuotaError::UnknownUser(id));
        }
        Ok(())
    }

    /// Snapshot of every entry, ordered by user id
    pub async fn scan_all(&self) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT user_id, remaining FROM quota ORDER BY user_id")
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    /// Run one replenishment tick as a single transaction
    ///
    /// Every entry below the ceiling is moved to the value given by
    /// [`ReplenishPolicy::next_value`]. Either all of them change or, on
    /// failure, none do. Returns the changed entries ordered by user id.
    pub async fn replenish(&self, policy: &ReplenishPolicy) -> Result<Vec<LedgerEntry>> {
        let sql = format!(
            "UPDATE quota SET remaining = {}(?, remaining + ?) WHERE remaining < ? RETURNING user_id, remaining",
            policy.mode.sql_fn()
        );

        let mut tx = self.db.begin().await?;

        let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
            .bind(policy.ceiling)
            .bind(policy.increment)
            .bind(policy.ceiling)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        let mut changed: Vec<LedgerEntry> = rows.into_iter().map(entry_from_row).collect();
        changed.sort_by_key(|entry| entry.user_id);
        Ok(changed)
    }

    /// Check the database answers
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

fn entry_from_row((user_id, remaining): (i64, i64)) -> LedgerEntry {
    LedgerEntry {
        user_id: UserId(user_id),
        remaining,
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
