//! Signed session tokens.
//!
//! Sessions are stateless: identity is proven by verifying the token's
//! signature against the server secret, never by a server-side lookup.
//! The token travels in an HTTP-only cookie.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use solstice_core::{Email, UserId};

use crate::models::session::CurrentUser;
use crate::models::user::User;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Token lifetime in days.
const TOKEN_TTL_DAYS: i64 = 30;

/// Errors that can occur when issuing a token.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    /// Token encoding failed.
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User ID (standard JWT `sub` claim).
    sub: i32,
    /// User email.
    email: String,
    /// Issued at (unix timestamp).
    iat: i64,
    /// Expiry (unix timestamp).
    exp: i64,
}

/// A freshly issued session.
#[derive(Debug)]
pub struct IssuedSession {
    /// The signed token.
    pub token: String,
    /// `Set-Cookie` value carrying the token.
    pub cookie: String,
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    secure: bool,
}

impl SessionTokenService {
    /// Create a token service from the configured signing secret.
    ///
    /// `secure` controls the `Secure` cookie attribute; it follows the
    /// scheme of the configured base URL so local HTTP development keeps
    /// working.
    #[must_use]
    pub fn new(secret: &SecretString, secure: bool) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            secure,
        }
    }

    /// Issue a 30-day session token for a user plus its `Set-Cookie` value.
    ///
    /// # Errors
    ///
    /// Returns `SessionTokenError::Encoding` if signing fails.
    pub fn issue(&self, user: &User) -> Result<IssuedSession, SessionTokenError> {
        self.issue_with_ttl(user, Duration::days(TOKEN_TTL_DAYS))
    }

    fn issue_with_ttl(
        &self,
        user: &User,
        ttl: Duration,
    ) -> Result<IssuedSession, SessionTokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.as_i32(),
            email: user.email.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        let cookie = self.session_cookie(&token, ttl.num_seconds());

        Ok(IssuedSession { token, cookie })
    }

    /// Verify a raw token value from the cookie.
    ///
    /// Any failure (malformed, expired, bad signature) yields `None`:
    /// callers treat it as "not logged in", never as a request-aborting
    /// error.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<CurrentUser> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).ok()?;
        let email = Email::parse(&data.claims.email).ok()?;

        Some(CurrentUser {
            id: UserId::new(data.claims.sub),
            email,
        })
    }

    /// `Set-Cookie` value that instructs the client to drop the session.
    ///
    /// This clears the cookie only. A token that was copied elsewhere
    /// remains valid until its natural expiry; there is no server-side
    /// denylist, because token validity is never looked up server-side.
    #[must_use]
    pub fn logout_cookie(&self) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; \
             Path=/; HttpOnly; SameSite=Lax"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn session_cookie(&self, token: &str, max_age_secs: i64) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> SessionTokenService {
        SessionTokenService::new(&SecretString::from("k9#vLp2@xQ8!mT4$wR6^zN1&bH3*jF5%"), true)
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("user@test.com").unwrap(),
            username: "user".to_string(),
            phone: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify_roundtrip() {
        let service = service();
        let session = service.issue(&user()).unwrap();

        let current = service.verify(&session.token).unwrap();
        assert_eq!(current.id, UserId::new(7));
        assert_eq!(current.email.as_str(), "user@test.com");
    }

    #[test]
    fn test_expired_token_yields_no_identity() {
        let service = service();
        let session = service
            .issue_with_ttl(&user(), Duration::hours(-2))
            .unwrap();

        assert!(service.verify(&session.token).is_none());
    }

    #[test]
    fn test_garbage_token_yields_no_identity() {
        let service = service();
        assert!(service.verify("not-a-token").is_none());
        assert!(service.verify("").is_none());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let issuer =
            SessionTokenService::new(&SecretString::from("f2!uQ7@dK4#sL9$xB6^vM1&nC8*gJ3%"), true);
        let session = issuer.issue(&user()).unwrap();

        assert!(service().verify(&session.token).is_none());
    }

    #[test]
    fn test_cookie_contract() {
        let service = service();
        let session = service.issue(&user()).unwrap();

        assert!(session.cookie.starts_with("session_token="));
        assert!(session.cookie.contains("Max-Age=2592000"));
        assert!(session.cookie.contains("Path=/"));
        assert!(session.cookie.contains("HttpOnly"));
        assert!(session.cookie.contains("SameSite=Lax"));
        assert!(session.cookie.contains("Secure"));
    }

    #[test]
    fn test_insecure_base_url_drops_secure_attribute() {
        let service =
            SessionTokenService::new(&SecretString::from("k9#vLp2@xQ8!mT4$wR6^zN1&bH3*jF5%"), false);
        let session = service.issue(&user()).unwrap();
        assert!(!session.cookie.contains("Secure"));
    }

    #[test]
    fn test_logout_cookie_expires_immediately() {
        let cookie = service().logout_cookie();
        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_logout_does_not_invalidate_outstanding_tokens() {
        // Logout clears the cookie client-side only; a replayed token
        // still verifies until natural expiry.
        let service = service();
        let session = service.issue(&user()).unwrap();
        let _ = service.logout_cookie();

        assert!(service.verify(&session.token).is_some());
    }
}
