//! In-memory store and mailer doubles for service tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use solstice_core::{Email, OtpId, UserId};

use crate::db::{OtpStore, RepositoryError, UserStore};
use crate::models::otp::OtpRecord;
use crate::models::user::{NewUser, User};
use crate::services::email::{EmailError, Mailer};

/// In-memory [`OtpStore`]. Clones share the same records.
#[derive(Clone, Default)]
pub struct MockOtpStore {
    records: Arc<Mutex<Vec<OtpRecord>>>,
    next_id: Arc<Mutex<i32>>,
}

impl MockOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&self) -> i32 {
        let mut next = self.next_id.lock().expect("lock poisoned");
        *next += 1;
        *next
    }

    /// Latest record for an email, by insertion order.
    pub fn latest_for(&self, email: &str) -> Option<OtpRecord> {
        self.records
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|r| r.email.as_str() == email)
            .max_by_key(|r| r.id.as_i32())
            .cloned()
    }

    /// Number of records stored for an email.
    pub fn count_for(&self, email: &str) -> usize {
        self.records
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|r| r.email.as_str() == email)
            .count()
    }

    /// Insert a record directly, bypassing the replace-on-request flow.
    pub fn insert_raw(&self, record: OtpRecord) {
        self.records.lock().expect("lock poisoned").push(record);
    }
}

impl OtpStore for MockOtpStore {
    async fn replace(
        &self,
        email: &Email,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord, RepositoryError> {
        let id = self.alloc_id();
        let mut records = self.records.lock().expect("lock poisoned");
        records.retain(|r| r.email != *email);

        let record = OtpRecord {
            id: OtpId::new(id),
            email: email.clone(),
            code: code.to_string(),
            expires_at,
            verified: false,
            created_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn latest(&self, email: &Email) -> Result<Option<OtpRecord>, RepositoryError> {
        Ok(self.latest_for(email.as_str()))
    }

    async fn mark_verified(&self, id: OtpId) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("lock poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.verified = true;
        Ok(())
    }
}

/// In-memory [`UserStore`]. Clones share the same records.
#[derive(Clone, Default)]
pub struct MockUserStore {
    users: Arc<Mutex<Vec<(User, String)>>>,
    next_id: Arc<Mutex<i32>>,
}

impl MockUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.lock().expect("lock poisoned").len()
    }
}

impl UserStore for MockUserStore {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|(u, _)| u.email == *email)
            .map(|(u, _)| u.clone()))
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|(u, _)| u.email == *email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().expect("lock poisoned");
        if users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let mut next = self.next_id.lock().expect("lock poisoned");
        *next += 1;

        let created = User {
            id: UserId::new(*next),
            email: user.email,
            username: user.username,
            phone: user.phone,
            created_at: Utc::now(),
        };
        users.push((created.clone(), user.password_hash));
        Ok(created)
    }
}

/// [`Mailer`] that records what was sent instead of talking to SMTP.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    codes: Arc<Mutex<Vec<String>>>,
    welcomes: Arc<Mutex<Vec<String>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes dispatched so far, oldest first.
    pub fn sent_codes(&self) -> Vec<String> {
        self.codes.lock().expect("lock poisoned").clone()
    }

    /// Usernames welcomed so far, oldest first.
    pub fn sent_welcomes(&self) -> Vec<String> {
        self.welcomes.lock().expect("lock poisoned").clone()
    }
}

impl Mailer for RecordingMailer {
    async fn send_otp_code(&self, _to: &Email, code: &str) -> Result<(), EmailError> {
        self.codes
            .lock()
            .expect("lock poisoned")
            .push(code.to_string());
        Ok(())
    }

    async fn send_welcome(&self, _to: &Email, username: &str) -> Result<(), EmailError> {
        self.welcomes
            .lock()
            .expect("lock poisoned")
            .push(username.to_string());
        Ok(())
    }
}

/// [`Mailer`] whose dispatch always fails.
#[derive(Clone, Copy)]
pub struct FailingMailer;

impl Mailer for FailingMailer {
    async fn send_otp_code(&self, _to: &Email, _code: &str) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress("smtp unreachable".to_string()))
    }

    async fn send_welcome(&self, _to: &Email, _username: &str) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress("smtp unreachable".to_string()))
    }
}
