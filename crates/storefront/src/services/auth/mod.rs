//! Authentication service.
//!
//! Orchestrates OTP-gated signup and password login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use solstice_core::Email;

use crate::db::{OtpStore, RepositoryError, UserStore};
use crate::models::user::{NewUser, User};
use crate::services::email::Mailer;

/// Minimum number of satisfied strength rules.
const MIN_PASSWORD_SCORE: usize = 3;

/// Signup request after field-presence validation at the boundary.
#[derive(Debug)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub password: String,
    /// Confirmation, when the client supplies one; checked server-side.
    pub password_confirm: Option<String>,
}

/// Authentication service.
///
/// Handles account creation (gated on a verified OTP) and password login.
pub struct AuthService<U, O, M> {
    users: U,
    otps: O,
    mailer: M,
}

impl<U: UserStore, O: OtpStore, M: Mailer> AuthService<U, O, M> {
    /// Create a new authentication service.
    pub const fn new(users: U, otps: O, mailer: M) -> Self {
        Self { users, otps, mailer }
    }

    /// Create an account for an OTP-verified email.
    ///
    /// Local password validation (confirmation match, strength score) runs
    /// before any store access. The OTP-verified gate is re-checked here
    /// server-side: the client's step ordering is not trusted as an
    /// authorization boundary.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` / `WeakPassword` on local
    /// validation failure, `EmailNotVerified` if the email's latest OTP
    /// record is not verified, `UserAlreadyExists` on duplicate email, and
    /// `Repository` for other store failures.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<User, AuthError> {
        let email = Email::parse_normalized(&request.email)?;

        // Local validation first: these never reach the store
        if let Some(confirm) = &request.password_confirm
            && *confirm != request.password
        {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(&request.password)?;

        // Defense in depth: re-check the OTP gate server-side
        let verified = self
            .otps
            .latest(&email)
            .await
            .map_err(AuthError::Repository)?
            .is_some_and(|r| r.verified);
        if !verified {
            return Err(AuthError::EmailNotVerified);
        }

        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                username: request.username,
                phone: request.phone,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        // Fire-and-forget: a failed welcome email never fails the signup
        if let Err(e) = self.mailer.send_welcome(&user.email, &user.username).await {
            tracing::warn!(email = %user.email, error = %e, "Failed to send welcome email");
        }

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` whether the user is absent or
    /// the password is wrong; the two cases are not distinguishable.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse_normalized(email)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Score a password against the strength rules.
///
/// One point each for: length >= 8, an uppercase letter, a lowercase letter,
/// a digit, a symbol.
#[must_use]
pub fn password_strength(password: &str) -> usize {
    let rules = [
        password.len() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    rules.iter().filter(|&&ok| ok).count()
}

/// Validate password meets the minimum strength score.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let score = password_strength(password);
    if score < MIN_PASSWORD_SCORE {
        return Err(AuthError::WeakPassword(format!(
            "password must satisfy at least {MIN_PASSWORD_SCORE} of 5 strength rules (got {score})"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use solstice_core::OtpId;

    use super::*;
    use crate::models::otp::OtpRecord;
    use crate::test_support::{MockOtpStore, MockUserStore, RecordingMailer};

    fn verified_otp(email: &str) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: OtpId::new(1),
            email: Email::parse(email).unwrap(),
            code: "123456".to_string(),
            expires_at: now + Duration::minutes(10),
            verified: true,
            created_at: now,
        }
    }

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            username: "tester".to_string(),
            phone: None,
            password: password.to_string(),
            password_confirm: Some(password.to_string()),
        }
    }

    fn service(
        users: MockUserStore,
        otps: MockOtpStore,
        mailer: RecordingMailer,
    ) -> AuthService<MockUserStore, MockOtpStore, RecordingMailer> {
        AuthService::new(users, otps, mailer)
    }

    #[test]
    fn test_password_strength_scoring() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abc"), 1); // lowercase only
        assert_eq!(password_strength("abcdefgh"), 2); // + length
        assert_eq!(password_strength("Abcdefg1"), 4); // + upper + digit
        assert_eq!(password_strength("Abcdef1!"), 5); // all rules
        assert_eq!(password_strength("aB1"), 3); // short but varied
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let hash = hash_password("Sup3r-str0ng").unwrap();
        assert!(verify_password("Sup3r-str0ng", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_signup_rejects_mismatched_confirmation_before_store() {
        let users = MockUserStore::new();
        let service = service(users.clone(), MockOtpStore::new(), RecordingMailer::new());

        let mut request = signup_request("user@test.com", "Abcdef1!");
        request.password_confirm = Some("Different1!".to_string());

        assert!(matches!(
            service.signup(request).await,
            Err(AuthError::PasswordMismatch)
        ));
        assert_eq!(users.len(), 0);
    }

    #[tokio::test]
    async fn test_signup_rejects_weak_password_before_store() {
        let users = MockUserStore::new();
        let service = service(users.clone(), MockOtpStore::new(), RecordingMailer::new());

        assert!(matches!(
            service.signup(signup_request("user@test.com", "abcdefgh")).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert_eq!(users.len(), 0);
    }

    #[tokio::test]
    async fn test_signup_requires_verified_otp_regardless_of_password() {
        let otps = MockOtpStore::new();
        let service = service(MockUserStore::new(), otps.clone(), RecordingMailer::new());

        // No OTP at all
        assert!(matches!(
            service.signup(signup_request("user@test.com", "Abcdef1!")).await,
            Err(AuthError::EmailNotVerified)
        ));

        // Unverified OTP
        let mut record = verified_otp("user@test.com");
        record.verified = false;
        otps.insert_raw(record);
        assert!(matches!(
            service.signup(signup_request("user@test.com", "Abcdef1!")).await,
            Err(AuthError::EmailNotVerified)
        ));
    }

    #[tokio::test]
    async fn test_signup_creates_user_and_sends_welcome() {
        let users = MockUserStore::new();
        let otps = MockOtpStore::new();
        let mailer = RecordingMailer::new();
        otps.insert_raw(verified_otp("user@test.com"));

        let service = service(users.clone(), otps, mailer.clone());
        let user = service
            .signup(signup_request("User@Test.com", "Abcdef1!"))
            .await
            .unwrap();

        assert_eq!(user.email.as_str(), "user@test.com");
        assert_eq!(user.username, "tester");
        assert_eq!(users.len(), 1);
        assert_eq!(mailer.sent_welcomes(), vec!["tester".to_string()]);
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_fails_user_exists() {
        let users = MockUserStore::new();
        let otps = MockOtpStore::new();
        otps.insert_raw(verified_otp("user@test.com"));

        let service = service(users, otps, RecordingMailer::new());
        service
            .signup(signup_request("user@test.com", "Abcdef1!"))
            .await
            .unwrap();

        assert!(matches!(
            service.signup(signup_request("user@test.com", "Abcdef1!")).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_login_unknown_user_and_wrong_password_look_identical() {
        let users = MockUserStore::new();
        let otps = MockOtpStore::new();
        otps.insert_raw(verified_otp("user@test.com"));

        let service = service(users, otps, RecordingMailer::new());
        service
            .signup(signup_request("user@test.com", "Abcdef1!"))
            .await
            .unwrap();

        let unknown = service.login("nobody@test.com", "Abcdef1!").await;
        let wrong = service.login("user@test.com", "Wrong-pass1").await;

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_full_signup_flow_issues_matching_session_token() {
        use secrecy::SecretString;

        use crate::services::otp::OtpService;
        use crate::services::session::SessionTokenService;

        let users = MockUserStore::new();
        let otps = MockOtpStore::new();
        let mailer = RecordingMailer::new();

        // Step 1: request a code
        let otp_service = OtpService::new(otps.clone(), mailer.clone());
        otp_service.request("user@test.com").await.unwrap();
        let code = mailer.sent_codes().remove(0);

        // Step 2: verify it
        otp_service.verify("user@test.com", &code).await.unwrap();

        // Step 3: complete signup and issue a session
        let auth = service(users, otps, mailer);
        let user = auth
            .signup(signup_request("user@test.com", "Abcdef1!"))
            .await
            .unwrap();

        let tokens = SessionTokenService::new(
            &SecretString::from("k9#vLp2@xQ8!mT4$wR6^zN1&bH3*jF5%"),
            true,
        );
        let session = tokens.issue(&user).unwrap();

        let current = tokens.verify(&session.token).unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.email.as_str(), "user@test.com");
        assert!(session.cookie.starts_with("session_token="));
    }

    #[tokio::test]
    async fn test_login_success_returns_user() {
        let users = MockUserStore::new();
        let otps = MockOtpStore::new();
        otps.insert_raw(verified_otp("user@test.com"));

        let service = service(users, otps, RecordingMailer::new());
        let created = service
            .signup(signup_request("user@test.com", "Abcdef1!"))
            .await
            .unwrap();

        let logged_in = service.login("USER@test.com", "Abcdef1!").await.unwrap();
        assert_eq!(logged_in.id, created.id);
        assert_eq!(logged_in.email.as_str(), "user@test.com");
    }
}
