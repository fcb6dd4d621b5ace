//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use solstice_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::{NewUser, User};

/// Storage operations for user records.
///
/// Fronted by a trait so the auth service can be tested against an
/// in-memory implementation.
pub trait UserStore {
    /// Get a user by their normalized email address.
    fn get_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Get a user along with their password hash by normalized email.
    ///
    /// Returns `None` if the user doesn't exist.
    fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Insert a new user record.
    ///
    /// Fails with `RepositoryError::Conflict` if the email is taken.
    fn create(&self, user: NewUser) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    username: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            username: row.username,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

/// Row type that also carries the password hash.
#[derive(Debug, sqlx::FromRow)]
struct UserAuthRow {
    id: i32,
    email: String,
    username: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl TryFrom<UserAuthRow> for (User, String) {
    type Error = RepositoryError;

    fn try_from(row: UserAuthRow) -> Result<Self, Self::Error> {
        let user = User::try_from(UserRow {
            id: row.id,
            email: row.email,
            username: row.username,
            phone: row.phone,
            created_at: row.created_at,
        })?;

        Ok((user, row.password_hash))
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for UserRepository<'_> {
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, username, phone, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserAuthRow>(
            r"
            SELECT id, email, username, phone, created_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, username, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, phone, created_at
            ",
        )
        .bind(user.email.as_str())
        .bind(&user.username)
        .bind(user.phone.as_deref())
        .bind(&user.password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }
}
