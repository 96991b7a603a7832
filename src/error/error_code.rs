use serde::{Deserialize, Serialize};
use std::fmt;

/// Every failure kind the service can surface.
///
/// The wire form is the SCREAMING_SNAKE_CASE string from [`ErrorCode::as_str`];
/// gateways that proxy through the identity core additionally use the numeric
/// status from [`ErrorCode::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request validation
    ValidationFailed,

    // Authentication
    InvalidCredentials,
    AccountLocked,
    AccountInactive,
    RateLimited,
    AuthenticationFailed,

    // Tokens
    TokenInvalid,
    TokenExpired,
    TokenRevoked,
    TokenKindMismatch,

    // Authorization
    PermissionDenied,
    PermissionUnknown,

    // Resources
    UserNotFound,
    OrganizationNotFound,
    RoleNotFound,
    Conflict,
    DependentRecordsExist,

    // Infrastructure
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AccountInactive => "ACCOUNT_INACTIVE",
            Self::RateLimited => "RATE_LIMITED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::TokenKindMismatch => "TOKEN_KIND_MISMATCH",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PermissionUnknown => "PERMISSION_UNKNOWN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::OrganizationNotFound => "ORGANIZATION_NOT_FOUND",
            Self::RoleNotFound => "ROLE_NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::DependentRecordsExist => "DEPENDENT_RECORDS_EXIST",
            Self::Unavailable => "UNAVAILABLE",
            Self::Internal => "INTERNAL",
        }
    }

    /// Numeric status used by gateways when translating a broker reply into
    /// an HTTP response. Token-family failures collapse to 401.
    pub fn status(&self) -> u16 {
        match self {
            Self::ValidationFailed => 400,
            Self::InvalidCredentials
            | Self::AuthenticationFailed
            | Self::TokenInvalid
            | Self::TokenExpired
            | Self::TokenRevoked
            | Self::TokenKindMismatch => 401,
            Self::AccountLocked | Self::AccountInactive | Self::PermissionDenied => 403,
            Self::UserNotFound | Self::OrganizationNotFound | Self::RoleNotFound => 404,
            Self::Conflict | Self::DependentRecordsExist => 409,
            Self::PermissionUnknown => 422,
            Self::RateLimited => 429,
            Self::Unavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Whether a client may transparently retry the failed request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Parse a wire code back into the enum. Unknown strings map to
    /// `Internal` so a newer server cannot crash an older client.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "VALIDATION_FAILED" => Self::ValidationFailed,
            "INVALID_CREDENTIALS" => Self::InvalidCredentials,
            "ACCOUNT_LOCKED" => Self::AccountLocked,
            "ACCOUNT_INACTIVE" => Self::AccountInactive,
            "RATE_LIMITED" => Self::RateLimited,
            "AUTHENTICATION_FAILED" => Self::AuthenticationFailed,
            "TOKEN_INVALID" => Self::TokenInvalid,
            "TOKEN_EXPIRED" => Self::TokenExpired,
            "TOKEN_REVOKED" => Self::TokenRevoked,
            "TOKEN_KIND_MISMATCH" => Self::TokenKindMismatch,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "PERMISSION_UNKNOWN" => Self::PermissionUnknown,
            "USER_NOT_FOUND" => Self::UserNotFound,
            "ORGANIZATION_NOT_FOUND" => Self::OrganizationNotFound,
            "ROLE_NOT_FOUND" => Self::RoleNotFound,
            "CONFLICT" => Self::Conflict,
            "DEPENDENT_RECORDS_EXIST" => Self::DependentRecordsExist,
            "UNAVAILABLE" => Self::Unavailable,
            _ => Self::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
