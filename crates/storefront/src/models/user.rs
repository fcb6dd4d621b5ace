//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use solstice_core::{Email, UserId};

/// A storefront user (domain type).
///
/// Created only after the email's latest OTP record has been verified.
/// The password hash lives in the database and is never part of this type,
/// so serializing a `User` into an API response can never leak it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (normalized; immutable once created).
    pub email: Email,
    /// Display name chosen at signup.
    pub username: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub username: String,
    pub phone: Option<String>,
    /// Argon2 password hash (never the plaintext).
    pub password_hash: String,
}
