//! Database operations for storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Site accounts (created only after OTP verification)
//! - `otp_verifications` - One-time signup codes (10-minute expiry, single use)
//! - `contacts` - Contact form submissions
//! - `products` - Catalog entries
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and embedded via
//! `sqlx::migrate!`; they are applied at startup.
//!
//! # Store traits
//!
//! The repositories the services depend on are fronted by small traits
//! (`UserStore`, `OtpStore`) so the services can be exercised against
//! in-memory mocks. The `PostgreSQL` repositories are the production
//! implementations.

pub mod contacts;
pub mod otps;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use contacts::ContactRepository;
pub use otps::{OtpRepository, OtpStore};
pub use products::ProductRepository;
pub use users::{UserRepository, UserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
