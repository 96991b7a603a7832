use crate::api::dto::PublicUser;
use crate::api::envelope::RequestHeader;
use crate::security::Claims;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    pub header: RequestHeader,
    /// Email or username; email matching is case-insensitive.
    #[validate(length(min = 1, max = 255))]
    pub identifier: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds at which the access token expires.
    pub expires_at: i64,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogoutRequest {
    pub header: RequestHeader,
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    pub header: RequestHeader,
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ValidateRequest {
    pub header: RequestHeader,
    #[validate(length(min = 1))]
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub claims: Claims,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub header: RequestHeader,
    pub token: String,
    #[validate(length(min = 1, max = 1024))]
    pub current_password: String,
    #[validate(length(min = 1, max = 1024))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub header: RequestHeader,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordResponse {
    /// Delivery of the token is out of scope; the caller forwards it.
    pub reset_token: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteResetRequest {
    pub header: RequestHeader,
    #[validate(length(min = 1))]
    pub reset_token: String,
    #[validate(length(min = 1, max = 1024))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    pub header: RequestHeader,
    #[validate(length(min = 1))]
    pub verification_token: String,
}
