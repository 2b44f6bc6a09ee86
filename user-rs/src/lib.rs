//! user-rs: User directory service
//!
//! Owns the list of known users. Other services enumerate users through
//! `GET /users` and resolve names through `GET /user/:name`.

pub mod api;
pub mod config;
pub mod error;
pub mod signal;
pub mod store;

pub use config::Config;
pub use error::{Result, UserError};
pub use store::{User, UserStore};
