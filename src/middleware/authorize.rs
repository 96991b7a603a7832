use crate::audit::{AuditEvent, AuditEventType, SharedAuditSink};
use crate::error::{ApiError, ErrorCode, Result};
use crate::rbac::RbacEngine;
use crate::security::{Claims, TokenEngine, TokenKind};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// The authenticated principal attached to a request on its way into a
/// handler.
#[derive(Debug, Clone)]
pub struct SubjectContext {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub organizations: Vec<i64>,
    /// Effective permissions for the scope the request was authorized in.
    pub permissions: HashSet<String>,
    pub scope: Option<i64>,
    pub request_id: String,
    pub client_id: String,
}

impl SubjectContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Composable gate applied to handler operations.
///
/// `authenticate` only validates the token; `authorize` additionally
/// requires a permission in a scope. Token-family failures surface as
/// `AuthenticationFailed`, missing permissions as `PermissionDenied`.
pub struct AuthorizationGate {
    tokens: Arc<TokenEngine>,
    rbac: Arc<RbacEngine>,
    audit: SharedAuditSink,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenEngine>, rbac: Arc<RbacEngine>, audit: SharedAuditSink) -> Self {
        Self {
            tokens,
            rbac,
            audit,
        }
    }

    fn validate_token(&self, token: &str) -> Result<Claims> {
        self.tokens.validate(token, TokenKind::Access).map_err(|e| {
            self.audit.emit(AuditEvent::failure(
                AuditEventType::TokenValidationFailed,
                e.code.as_str(),
            ));
            ApiError::new(
                ErrorCode::AuthenticationFailed,
                "Authentication failed",
                e.context,
            )
        })
    }

    /// Validate the bearer token and build a subject context without a
    /// permission requirement.
    #[instrument(skip_all, fields(request_id = %request_id))]
    pub async fn authenticate(
        &self,
        token: &str,
        request_id: &str,
        client_id: &str,
    ) -> Result<SubjectContext> {
        let claims = self.validate_token(token)?;
        let permissions = self.rbac.effective_permissions(claims.sub, None).await?;
        Ok(self.context(claims, permissions, None, request_id, client_id))
    }

    /// Validate the bearer token, then require a permission in the given
    /// scope. On success the subject context carries the effective set for
    /// that scope.
    #[instrument(skip_all, fields(request_id = %request_id, permission))]
    pub async fn authorize(
        &self,
        token: &str,
        permission: &str,
        scope: Option<i64>,
        request_id: &str,
        client_id: &str,
    ) -> Result<SubjectContext> {
        let claims = self.validate_token(token)?;

        if !self.rbac.has_permission(claims.sub, permission, scope).await? {
            self.audit.emit(
                AuditEvent::failure(AuditEventType::PermissionDenied, permission)
                    .with_user(claims.sub)
                    .with_email(&claims.email)
                    .with_metadata(serde_json::json!({
                        "permission": permission,
                        "scope": scope,
                    })),
            );
            return Err(ApiError::permission_denied(permission, scope));
        }
        let permissions = self.rbac.effective_permissions(claims.sub, scope).await?;

        self.audit.emit(
            AuditEvent::success(AuditEventType::PermissionGranted)
                .with_user(claims.sub)
                .with_metadata(serde_json::json!({
                    "permission": permission,
                    "scope": scope,
                })),
        );
        Ok(self.context(claims, permissions, scope, request_id, client_id))
    }

    fn context(
        &self,
        claims: Claims,
        permissions: HashSet<String>,
        scope: Option<i64>,
        request_id: &str,
        client_id: &str,
    ) -> SubjectContext {
        SubjectContext {
            user_id: claims.sub,
            email: claims.email,
            username: claims.username,
            organizations: claims.organizations,
            permissions,
            scope,
            request_id: request_id.to_string(),
            client_id: client_id.to_string(),
        }
    }
}
