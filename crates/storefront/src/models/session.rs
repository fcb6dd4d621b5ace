//! Session-related types.

use serde::{Deserialize, Serialize};

use solstice_core::{Email, UserId};

/// Identity proven by a verified session token.
///
/// Minimal data carried in the token claims to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}
