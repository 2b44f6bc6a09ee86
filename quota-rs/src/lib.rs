//! quota-rs: Per-user quota admission service
//!
//! Every user owns a consumable quota that is decremented on use, rejected
//! when exhausted and periodically replenished toward a ceiling.
//!
//! # Features
//!
//! - **Ledger**: SQLite table of remaining quota per user, mutated only
//!   through atomic operations (conditional decrement never goes below zero)
//! - **Replenishment**: periodic all-or-nothing ticks raising low entries
//! - **User sync**: polls the user directory and creates entries for new users
//! - **HTTP API**: health, read, consume, list and set routes
//!
//! # Example
//!
//! ```no_run
//! use quota_rs::admission::{Admission, Outcome};
//! use quota_rs::ledger::{LedgerStore, UserId};
//!
//! # async fn example() -> quota_rs::Result<()> {
//! let store = LedgerStore::open("sqlite://quota.db").await?;
//! store.initialize(&[UserId(1)], 5).await?;
//!
//! let admission = Admission::new(store);
//! match admission.consume(UserId(1)).await {
//!     Outcome::Granted { remaining } => println!("{} left", remaining),
//!     outcome => println!("rejected: {:?}", outcome),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`ledger`]: Quota store and its types
//! - [`admission`]: Consumption outcomes
//! - [`replenish`]: Replenishment loop
//! - [`sync`]: User directory sync loop
//! - [`directory`]: User directory client
//! - [`supervisor`]: Long-lived task supervision
//! - [`api`]: HTTP server
//! - [`client`]: HTTP client for this service

pub mod admission;
pub mod api;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod replenish;
pub mod supervisor;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use error::{QuotaError, Result};
