use crate::domain::{NewUser, User};
use crate::error::Result;
use crate::repository::{ListQuery, Page};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Partial update for user profile fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

/// User persistence operations.
///
/// The lockout bookkeeping methods (`record_login_success`,
/// `record_login_failure`) are atomic per user: concurrent login attempts
/// for the same identity serialize inside the adapter.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. Fails `Conflict` when the email or username is
    /// already taken by a non-deleted row.
    async fn create(&self, new: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Lookup by canonicalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Apply profile changes. Uniqueness failures surface as `Conflict`.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User>;

    /// Replace the stored password verifier.
    async fn set_password_hash(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Reset `failed_attempts`, clear the lock, and stamp `last_login_at`.
    async fn record_login_success(&self, id: i64, at: DateTime<Utc>) -> Result<User>;

    /// Increment `failed_attempts`; when the counter reaches
    /// `max_attempts`, set `locked_until` to now + `lockout`. Returns the
    /// updated user.
    async fn record_login_failure(
        &self,
        id: i64,
        max_attempts: i32,
        lockout: Duration,
    ) -> Result<User>;

    async fn mark_email_verified(&self, id: i64, at: DateTime<Utc>) -> Result<User>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, query: &ListQuery) -> Result<Page<User>>;
}
