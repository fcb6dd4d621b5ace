//! OTP verification repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use solstice_core::{Email, OtpId};

use super::RepositoryError;
use crate::models::otp::OtpRecord;

/// Storage operations for one-time code records.
pub trait OtpStore {
    /// Replace any existing codes for an email with a fresh one.
    ///
    /// Deletes all records for the email, then inserts the new record with
    /// `verified = false`. The two statements are issued independently (no
    /// transaction): with two concurrent requests for the same email the
    /// last writer wins and the loser's emailed code becomes unusable.
    fn replace(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<OtpRecord, RepositoryError>> + Send;

    /// Fetch the most recently created record for an email, if any.
    fn latest(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<OtpRecord>, RepositoryError>> + Send;

    /// Mark a record as verified.
    ///
    /// This is the sole write path that flips the flag; nothing resets it.
    fn mark_verified(&self, id: OtpId)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: i32,
    email: String,
    otp_code: String,
    expires_at: DateTime<Utc>,
    verified: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<OtpRow> for OtpRecord {
    type Error = RepositoryError;

    fn try_from(row: OtpRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: OtpId::new(row.id),
            email,
            code: row.otp_code,
            expires_at: row.expires_at,
            verified: row.verified,
            created_at: row.created_at,
        })
    }
}

/// Repository for OTP database operations.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl OtpStore for OtpRepository<'_> {
    async fn replace(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord, RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM otp_verifications
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        let row = sqlx::query_as::<_, OtpRow>(
            r"
            INSERT INTO otp_verifications (email, otp_code, expires_at, verified)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, email, otp_code, expires_at, verified, created_at
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    async fn latest(&self, email: &Email) -> Result<Option<OtpRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, OtpRow>(
            r"
            SELECT id, email, otp_code, expires_at, verified, created_at
            FROM otp_verifications
            WHERE email = $1
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn mark_verified(&self, id: OtpId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE otp_verifications
            SET verified = TRUE
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
