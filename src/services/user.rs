use crate::audit::{AuditEvent, AuditEventType, SharedAuditSink};
use crate::domain::{NewUser, User};
use crate::error::{ApiError, Result};
use crate::rbac::RbacEngine;
use crate::repository::{ListQuery, Page, Repositories, UserChanges};
use crate::security::{PasswordHasher, TokenEngine};
use std::sync::Arc;
use tracing::instrument;

/// What a registration request carries. The password is hashed before it
/// touches the repository.
#[derive(Debug, Clone)]
pub struct RegisterUserInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// User lifecycle operations.
pub struct UserService {
    repos: Repositories,
    hasher: PasswordHasher,
    tokens: Arc<TokenEngine>,
    rbac: Arc<RbacEngine>,
    audit: SharedAuditSink,
    allow_self_registration: bool,
    require_email_verification: bool,
}

impl UserService {
    pub fn new(
        repos: Repositories,
        hasher: PasswordHasher,
        tokens: Arc<TokenEngine>,
        rbac: Arc<RbacEngine>,
        audit: SharedAuditSink,
        allow_self_registration: bool,
        require_email_verification: bool,
    ) -> Self {
        Self {
            repos,
            hasher,
            tokens,
            rbac,
            audit,
            allow_self_registration,
            require_email_verification,
        }
    }

    pub fn allow_self_registration(&self) -> bool {
        self.allow_self_registration
    }

    /// Create a user from a registration request. Enforces the password
    /// policy; the account starts unverified when verification is required.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn create(&self, input: RegisterUserInput) -> Result<User> {
        let hasher = self.hasher.clone();
        let password = input.password.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hasher.hash(&password))
                .await
                .map_err(|e| ApiError::internal(format!("hashing task: {}", e)))??;

        let user = self
            .repos
            .users
            .create(NewUser {
                email: input.email,
                username: input.username,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                email_verified: !self.require_email_verification,
            })
            .await?;

        self.audit.emit(
            AuditEvent::success(AuditEventType::UserCreated)
                .with_user(user.id)
                .with_email(&user.email),
        );
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<User> {
        self.repos
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User> {
        self.repos
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.repos
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(ApiError::user_not_found)
    }

    /// Apply profile changes. Deactivation immediately drops the subject's
    /// cached permissions.
    #[instrument(skip_all, fields(user_id = id))]
    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<User> {
        let deactivating = changes.is_active == Some(false);
        let user = self.repos.users.update(id, changes).await?;

        if deactivating {
            self.rbac.invalidate_user(id);
            self.tokens.revoke_all_for_user(id);
        }

        self.audit.emit(
            AuditEvent::success(AuditEventType::UserUpdated)
                .with_user(user.id)
                .with_email(&user.email),
        );
        Ok(user)
    }

    /// Soft delete. Outstanding tokens stop validating.
    #[instrument(skip_all, fields(user_id = id))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let user = self.get_by_id(id).await?;
        self.repos.users.soft_delete(id).await?;
        self.rbac.invalidate_user(id);
        self.tokens.revoke_all_for_user(id);

        self.audit.emit(
            AuditEvent::success(AuditEventType::UserDeleted)
                .with_user(id)
                .with_email(&user.email),
        );
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<User>> {
        self.repos.users.list(query).await
    }
}
