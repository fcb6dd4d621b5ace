//! Contact form submission type.

use solstice_core::Email;

/// A validated contact form submission.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    /// Sender's name.
    pub name: String,
    /// Sender's email address (normalized).
    pub email: Email,
    /// Message body.
    pub message: String,
}
