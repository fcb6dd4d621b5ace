//! One-time code records.

use chrono::{DateTime, Utc};

use solstice_core::{Email, OtpId};

/// A one-time signup code stored for one normalized email.
///
/// Multiple records may exist for an email over time; only the most recently
/// created one is authoritative. The `verified` flag transitions
/// `false -> true` exactly once and never back.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    /// Unique identifier.
    pub id: OtpId,
    /// Normalized email the code was issued for.
    pub email: Email,
    /// Six-digit numeric code.
    pub code: String,
    /// Absolute expiry (creation + 10 minutes).
    pub expires_at: DateTime<Utc>,
    /// Whether the code has been consumed.
    pub verified: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Returns true if this code has already been consumed.
    #[must_use]
    pub const fn is_used(&self) -> bool {
        self.verified
    }

    /// Returns true if this code has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(expires_in: Duration, verified: bool) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: OtpId::new(1),
            email: Email::parse("user@test.com").unwrap(),
            code: "123456".to_string(),
            expires_at: now + expires_in,
            verified,
            created_at: now,
        }
    }

    #[test]
    fn test_fresh_record_not_expired() {
        let r = record(Duration::minutes(10), false);
        assert!(!r.is_expired(Utc::now()));
        assert!(!r.is_used());
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let r = record(Duration::minutes(10), false);
        assert!(r.is_expired(r.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_exact_expiry_instant_still_valid() {
        // Expiry check is strict: now must be past expires_at
        let r = record(Duration::minutes(10), false);
        assert!(!r.is_expired(r.expires_at));
    }

    #[test]
    fn test_verified_record_is_used() {
        let r = record(Duration::minutes(10), true);
        assert!(r.is_used());
    }
}
