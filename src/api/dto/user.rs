use crate::api::envelope::RequestHeader;
use crate::api::dto::ListParams;
use crate::domain::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The projection of a user that leaves the service. Never carries the
/// password verifier or lockout bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_active: user.is_active,
            email_verified: user.email_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub header: RequestHeader,
    /// Absent for self-registration, required otherwise.
    #[serde(default)]
    pub token: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub last_name: String,
}

/// Lookup by exactly one of id, email, or username.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetUserRequest {
    pub header: RequestHeader,
    pub token: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 3, max = 64))]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteUserRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListUsersRequest {
    pub header: RequestHeader,
    pub token: String,
    #[serde(default)]
    #[validate]
    pub page: ListParams,
}
