use super::{ErrorCode, ErrorContext};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// The single error type every service layer returns.
///
/// Carries a closed [`ErrorCode`], a short human message, and an
/// [`ErrorContext`] whose `details` map is the only part allowed onto the
/// wire. Stack traces and lower-layer errors are absorbed at construction.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(flatten)]
    pub context: ErrorContext,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, context: ErrorContext) -> Self {
        Self {
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a validation error with a machine-readable detail map
    pub fn validation(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        let context = match details {
            Some(details) => ErrorContext::new().with_details(details),
            None => ErrorContext::new(),
        };
        Self::new(ErrorCode::ValidationFailed, message, context)
    }

    /// Creates a validation error with prebuilt context
    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::new(ErrorCode::ValidationFailed, message, context)
    }

    /// Generic credential failure. The same error is returned whether the
    /// account exists or not.
    pub fn invalid_credentials() -> Self {
        Self::new(
            ErrorCode::InvalidCredentials,
            "Invalid credentials",
            ErrorContext::new(),
        )
    }

    pub fn account_locked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccountLocked, message, ErrorContext::new())
    }

    pub fn account_inactive() -> Self {
        Self::new(
            ErrorCode::AccountInactive,
            "Account is inactive",
            ErrorContext::new(),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            ErrorCode::RateLimited,
            "Too many requests",
            ErrorContext::new(),
        )
    }

    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationFailed, message, ErrorContext::new())
    }

    /// Permission rejection naming the required permission and scope
    pub fn permission_denied(permission: &str, scope: Option<i64>) -> Self {
        let message = match scope {
            Some(org) => format!("Permission '{}' required in organization {}", permission, org),
            None => format!("Permission '{}' required", permission),
        };
        Self::new(
            ErrorCode::PermissionDenied,
            message,
            ErrorContext::new().with_details(serde_json::json!({
                "permission": permission,
                "scope": scope,
            })),
        )
    }

    pub fn permission_unknown(permission: &str) -> Self {
        Self::new(
            ErrorCode::PermissionUnknown,
            format!("Unknown permission '{}'", permission),
            ErrorContext::new(),
        )
    }

    pub fn user_not_found() -> Self {
        Self::new(ErrorCode::UserNotFound, "User not found", ErrorContext::new())
    }

    pub fn organization_not_found() -> Self {
        Self::new(
            ErrorCode::OrganizationNotFound,
            "Organization not found",
            ErrorContext::new(),
        )
    }

    pub fn role_not_found() -> Self {
        Self::new(ErrorCode::RoleNotFound, "Role not found", ErrorContext::new())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message, ErrorContext::new())
    }

    pub fn dependent_records(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DependentRecordsExist, message, ErrorContext::new())
    }

    /// Repository or downstream outage. Logged at warn since the caller may
    /// retry at the repository boundary.
    pub fn unavailable(message: impl Into<String>) -> Self {
        let err = Self::new(ErrorCode::Unavailable, message, ErrorContext::new());
        warn!(error_code = %err.code, error_message = %err.message, "Dependency unavailable");
        err
    }

    /// Internal failure. The wire message stays generic; the cause goes to
    /// the log only.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error_cause = %cause, "Internal error occurred");
        Self::new(ErrorCode::Internal, "Internal error", ErrorContext::new())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = Some(details);
        self
    }

    /// The subset of the error that is safe to put on the wire.
    pub fn wire_detail(&self) -> Option<serde_json::Value> {
        match self.code {
            ErrorCode::ValidationFailed | ErrorCode::PermissionDenied => {
                self.context.details.clone()
            }
            _ => None,
        }
    }
}
