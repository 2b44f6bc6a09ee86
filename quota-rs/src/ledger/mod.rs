//! Quota ledger
//!
//! Durable table mapping each user to the number of units they may still
//! consume. All access goes through the atomic operations of [`LedgerStore`]:
//! - conditional decrement (never below zero)
//! - unconditional set
//! - idempotent bulk initialization
//! - all-or-nothing replenishment ticks

pub mod store;
pub mod types;

pub use store::LedgerStore;
pub use types::{Consumption, LedgerEntry, ReplenishMode, ReplenishPolicy, UserId};
