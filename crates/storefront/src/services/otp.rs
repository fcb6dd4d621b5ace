//! One-time code issue and verification.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::instrument;

use solstice_core::{Email, EmailError as EmailParseError};

use crate::db::{OtpStore, RepositoryError};
use crate::models::otp::OtpRecord;
use crate::services::email::{EmailError, Mailer};

/// Code lifetime in minutes.
const OTP_TTL_MINUTES: i64 = 10;

/// Errors that can occur during OTP operations.
#[derive(Debug, Error)]
pub enum OtpError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailParseError),

    /// No code exists for this email.
    #[error("no code found")]
    NotFound,

    /// Submitted code does not match the stored code.
    #[error("incorrect code")]
    CodeMismatch,

    /// Code exists but has expired.
    #[error("code has expired")]
    Expired,

    /// Code has already been consumed.
    #[error("code already used")]
    AlreadyUsed,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Email dispatch failed (the stored code is still live).
    #[error("email dispatch failed: {0}")]
    Dispatch(#[from] EmailError),
}

/// Service for issuing and verifying one-time signup codes.
pub struct OtpService<S, M> {
    store: S,
    mailer: M,
}

impl<S: OtpStore, M: Mailer> OtpService<S, M> {
    /// Create a new OTP service.
    pub const fn new(store: S, mailer: M) -> Self {
        Self { store, mailer }
    }

    /// Issue a fresh code for an email address and dispatch it.
    ///
    /// Any previous codes for the email are purged first, so at most one
    /// code is active per email at request time. The record is inserted
    /// before dispatch: if the email fails to send, the error is surfaced
    /// but the record stays (there is no compensating rollback, so a code
    /// can exist that was never delivered).
    ///
    /// # Errors
    ///
    /// Returns `OtpError::InvalidEmail` for malformed input,
    /// `OtpError::Repository` if the store fails, and `OtpError::Dispatch`
    /// if the email cannot be sent.
    #[instrument(skip(self))]
    pub async fn request(&self, raw_email: &str) -> Result<Email, OtpError> {
        let email = Email::parse_normalized(raw_email)?;

        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

        self.store.replace(&email, &code, expires_at).await?;
        tracing::info!(email = %email, "OTP issued");

        self.mailer.send_otp_code(&email, &code).await?;
        tracing::info!(email = %email, "OTP email dispatched");

        Ok(email)
    }

    /// Verify a submitted code against the latest record for the email.
    ///
    /// On success the record is marked verified; this is the only path that
    /// flips the flag.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::NotFound` if no code exists,
    /// `OtpError::CodeMismatch`/`Expired`/`AlreadyUsed` when the respective
    /// check fails, and `OtpError::Repository` on store errors.
    #[instrument(skip(self, submitted))]
    pub async fn verify(&self, raw_email: &str, submitted: &str) -> Result<Email, OtpError> {
        let email = Email::parse_normalized(raw_email)?;

        let record = self
            .store
            .latest(&email)
            .await?
            .ok_or(OtpError::NotFound)?;

        check_submission(&record, submitted, Utc::now())?;

        self.store.mark_verified(record.id).await?;
        tracing::info!(email = %email, "OTP verified");

        Ok(email)
    }

    /// Whether the latest code for this email has been verified.
    ///
    /// This is the signup gate: account creation re-checks it server-side
    /// regardless of what the client claims.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Repository` if the store fails.
    pub async fn is_email_verified(&self, email: &Email) -> Result<bool, OtpError> {
        let record = self.store.latest(email).await?;
        Ok(record.is_some_and(|r| r.verified))
    }
}

/// Generate a uniformly random six-digit code.
fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Evaluate a submitted code against a stored record.
///
/// Check order: mismatch, expiry, reuse. Exact string equality on the code.
fn check_submission(
    record: &OtpRecord,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpError> {
    if record.code != submitted {
        return Err(OtpError::CodeMismatch);
    }

    if record.is_expired(now) {
        return Err(OtpError::Expired);
    }

    if record.is_used() {
        return Err(OtpError::AlreadyUsed);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use solstice_core::OtpId;

    use super::*;
    use crate::test_support::{FailingMailer, MockOtpStore, RecordingMailer};

    fn record(code: &str, expires_in: Duration, verified: bool) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: OtpId::new(1),
            email: Email::parse("user@test.com").unwrap(),
            code: code.to_string(),
            expires_at: now + expires_in,
            verified,
            created_at: now,
        }
    }

    #[test]
    fn test_generate_code_always_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_check_submission_accepts_valid() {
        let r = record("123456", Duration::minutes(10), false);
        assert!(check_submission(&r, "123456", Utc::now()).is_ok());
    }

    #[test]
    fn test_check_submission_mismatch() {
        let r = record("123456", Duration::minutes(10), false);
        assert!(matches!(
            check_submission(&r, "654321", Utc::now()),
            Err(OtpError::CodeMismatch)
        ));
    }

    #[test]
    fn test_check_submission_expired_even_with_correct_code() {
        let r = record("123456", Duration::minutes(10), false);
        let after_expiry = r.expires_at + Duration::seconds(1);
        assert!(matches!(
            check_submission(&r, "123456", after_expiry),
            Err(OtpError::Expired)
        ));
    }

    #[test]
    fn test_check_submission_already_used() {
        let r = record("123456", Duration::minutes(10), true);
        assert!(matches!(
            check_submission(&r, "123456", Utc::now()),
            Err(OtpError::AlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_request_stores_unverified_record_with_ttl() {
        let store = MockOtpStore::new();
        let mailer = RecordingMailer::new();
        let service = OtpService::new(store.clone(), mailer.clone());

        let email = service.request("User@Test.com ").await.unwrap();
        assert_eq!(email.as_str(), "user@test.com");

        let record = store.latest_for("user@test.com").unwrap();
        assert!(!record.verified);
        let ttl = record.expires_at - record.created_at;
        assert_eq!(ttl.num_minutes(), 10);

        // The dispatched code matches the stored one
        assert_eq!(mailer.sent_codes(), vec![record.code]);
    }

    #[tokio::test]
    async fn test_request_twice_leaves_one_record_and_only_second_code_verifies() {
        let store = MockOtpStore::new();
        let mailer = RecordingMailer::new();
        let service = OtpService::new(store.clone(), mailer.clone());

        service.request("user@test.com").await.unwrap();
        let first_code = mailer.sent_codes().remove(0);
        service.request("user@test.com").await.unwrap();
        let second_code = mailer.sent_codes().remove(1);

        assert_eq!(store.count_for("user@test.com"), 1);

        // The first code was purged; only the second verifies
        if first_code != second_code {
            assert!(matches!(
                service.verify("user@test.com", &first_code).await,
                Err(OtpError::CodeMismatch)
            ));
        }
        service.verify("user@test.com", &second_code).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_twice_fails_with_already_used() {
        let store = MockOtpStore::new();
        let mailer = RecordingMailer::new();
        let service = OtpService::new(store.clone(), mailer.clone());

        service.request("user@test.com").await.unwrap();
        let code = mailer.sent_codes().remove(0);

        service.verify("user@test.com", &code).await.unwrap();
        assert!(matches!(
            service.verify("user@test.com", &code).await,
            Err(OtpError::AlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_verify_without_request_fails_not_found() {
        let service = OtpService::new(MockOtpStore::new(), RecordingMailer::new());
        assert!(matches!(
            service.verify("user@test.com", "123456").await,
            Err(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_request_invalid_email_rejected() {
        let service = OtpService::new(MockOtpStore::new(), RecordingMailer::new());
        assert!(matches!(
            service.request("not-an-email").await,
            Err(OtpError::InvalidEmail(_))
        ));
        assert!(matches!(
            service.request("   ").await,
            Err(OtpError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_failure_surfaces_error_but_record_remains() {
        let store = MockOtpStore::new();
        let service = OtpService::new(store.clone(), FailingMailer);

        let result = service.request("user@test.com").await;
        assert!(matches!(result, Err(OtpError::Dispatch(_))));

        // The record was inserted before dispatch and is not rolled back
        let record = store.latest_for("user@test.com").unwrap();
        assert!(!record.verified);
    }
}
