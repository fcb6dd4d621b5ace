//! Contact form repository for database operations.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::contact::ContactMessage;

/// Repository for contact form database operations.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a contact form submission.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, message: &ContactMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO contacts (name, email, message)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(&message.name)
        .bind(message.email.as_str())
        .bind(&message.message)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
