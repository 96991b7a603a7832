use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account.
///
/// `password_hash` is opaque outside the credential engine and is never
/// serialized. Email is stored canonicalized to lowercase; uniqueness of
/// email and username applies among non-deleted rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// A lock expiry in the past is equivalent to "not locked".
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the email as verified, keeping flag and timestamp consistent.
    pub fn mark_email_verified(&mut self, at: DateTime<Utc>) {
        self.email_verified = true;
        self.email_verified_at = Some(at);
    }
}

/// Canonical form of an email identifier: trimmed and lowercased.
pub fn canonicalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parameters for creating a user. The password arrives already hashed;
/// plaintext never crosses the repository boundary.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
}

impl NewUser {
    pub fn canonicalized(mut self) -> Self {
        self.email = canonicalize_email(&self.email);
        self
    }
}
