//! User table
//!
//! Ids are assigned by SQLite in insertion order, so seeding the same roster
//! into a fresh database always yields the same ids.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::Result;

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// SQLite-backed user directory
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    /// Open (creating if missing) the user database
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // A plain in-memory database lives and dies with its single connection
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let db = pool_options.connect_with(options).await?;
        let store = Self { db };
        store.init_db().await?;

        info!("User database opened: {}", database_url);
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Insert every name not already present, keeping roster order
    pub async fn seed(&self, names: &[String]) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let mut added = 0;

        for name in names {
            added += sqlx::query("INSERT OR IGNORE INTO users (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        debug!("Seeded {} users", added);
        Ok(added)
    }

    /// Every user, ordered by id
    pub async fn all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT id, name FROM users ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    /// Look a user up by exact name
    pub async fn by_name(&self, name: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Check the database answers
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
