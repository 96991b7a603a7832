use crate::audit::{AuditEvent, AuditEventType, SharedAuditSink};
use crate::config::SecurityConfig;
use crate::domain::User;
use crate::error::{ApiError, Result};
use crate::rbac::RbacEngine;
use crate::repository::Repositories;
use crate::security::{
    Claims, IssuedToken, PasswordHasher, RateLimiter, TokenEngine, TokenKind, TokenSubject,
};
use chrono::{Duration, Utc};
use metrics::increment_counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Who is knocking: the rate-limit key plus audit fields.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub client_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_ip(ip: impl Into<String>) -> Self {
        let ip = ip.into();
        Self {
            client_id: ip.clone(),
            ip: Some(ip),
            user_agent: None,
        }
    }
}

/// What a successful login hands back.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub user: User,
}

/// Login, logout, refresh, and credential lifecycle, with lockout and
/// rate-limit abuse controls.
pub struct AuthService {
    repos: Repositories,
    hasher: PasswordHasher,
    tokens: Arc<TokenEngine>,
    rbac: Arc<RbacEngine>,
    rate_limiter: Arc<RateLimiter>,
    audit: SharedAuditSink,
    max_failed_attempts: i32,
    lockout_duration: Duration,
    require_email_verification: bool,
    email_verification_ttl: i64,
    // Serializes the verify-and-update window per user so lockout
    // bookkeeping has a single writer.
    login_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl AuthService {
    pub fn new(
        config: &SecurityConfig,
        repos: Repositories,
        hasher: PasswordHasher,
        tokens: Arc<TokenEngine>,
        rbac: Arc<RbacEngine>,
        rate_limiter: Arc<RateLimiter>,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            repos,
            hasher,
            tokens,
            rbac,
            rate_limiter,
            audit,
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration: Duration::minutes(config.lockout_duration_minutes),
            require_email_verification: config.require_email_verification,
            email_verification_ttl: config.email_verification_expiry_hours * 3600,
            login_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenEngine> {
        &self.tokens
    }

    pub fn password_hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn require_email_verification(&self) -> bool {
        self.require_email_verification
    }

    fn user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.login_locks
            .lock()
            .entry(user_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Full argon2 comparison on a blocking thread. Runs against the dummy
    /// verifier when the account does not exist, so response time does not
    /// reveal account existence.
    async fn verify_password(&self, password: &str, stored: Option<&str>) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored = stored.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || hasher.verify_or_dummy(&password, stored.as_deref()))
            .await
            .map_err(|e| ApiError::internal(format!("verification task: {}", e)))?
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::internal(format!("hashing task: {}", e)))?
    }

    async fn lookup_identifier(&self, identifier: &str) -> Result<Option<User>> {
        if identifier.contains('@') {
            self.repos.users.find_by_email(identifier).await
        } else {
            self.repos.users.find_by_username(identifier).await
        }
    }

    /// Aggregate the identity snapshot a token is minted from.
    async fn token_subject(&self, user: &User) -> Result<TokenSubject> {
        let organizations = self.repos.organizations.organizations_of(user.id).await?;
        let roles = self.rbac.role_names_of(user.id).await?;
        let mut permissions: Vec<String> = self
            .rbac
            .all_permissions_of(user.id)
            .await?
            .into_iter()
            .collect();
        permissions.sort();
        Ok(TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            organizations,
            roles,
            permissions,
            email_verified: user.email_verified,
            is_active: user.is_active,
            last_login: user.last_login_at,
        })
    }

    /// Authenticate an identifier/password pair and issue a token pair.
    #[instrument(skip_all, fields(client = %client.client_id))]
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<LoginOutcome> {
        // Abuse control runs before any repository access
        if !self.rate_limiter.try_acquire(&client.client_id) {
            self.audit.emit(
                AuditEvent::failure(AuditEventType::RateLimited, "rate limit exceeded")
                    .with_client(client.ip.clone(), client.user_agent.clone()),
            );
            return Err(ApiError::rate_limited());
        }

        let user = self.lookup_identifier(identifier).await?;

        if let Some(user) = &user {
            if user.is_locked() {
                self.audit.emit(
                    AuditEvent::failure(AuditEventType::LoginFailure, "account locked")
                        .with_user(user.id)
                        .with_email(&user.email)
                        .with_client(client.ip.clone(), client.user_agent.clone()),
                );
                return Err(ApiError::account_locked("Account temporarily locked"));
            }
        }

        // Verification and lockout bookkeeping serialize per user
        let guard = user.as_ref().map(|u| self.user_lock(u.id));
        let _held = match &guard {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let verified = self
            .verify_password(password, user.as_ref().map(|u| u.password_hash.as_str()))
            .await?;

        let user = match (user, verified) {
            (Some(user), true) => user,
            (Some(user), false) => {
                let updated = self
                    .repos
                    .users
                    .record_login_failure(user.id, self.max_failed_attempts, self.lockout_duration)
                    .await?;
                if updated.is_locked() {
                    warn!(user_id = updated.id, "account locked after repeated failures");
                    increment_counter!("account_lockouts_total");
                    self.audit.emit(
                        AuditEvent::failure(AuditEventType::AccountLocked, "threshold reached")
                            .with_user(updated.id)
                            .with_email(&updated.email)
                            .with_client(client.ip.clone(), client.user_agent.clone()),
                    );
                }
                self.audit.emit(
                    AuditEvent::failure(AuditEventType::LoginFailure, "invalid password")
                        .with_user(updated.id)
                        .with_email(&updated.email)
                        .with_client(client.ip.clone(), client.user_agent.clone()),
                );
                increment_counter!("logins_total", "result" => "failure");
                return Err(ApiError::invalid_credentials());
            }
            (None, _) => {
                self.audit.emit(
                    AuditEvent::failure(AuditEventType::LoginFailure, "unknown identifier")
                        .with_client(client.ip.clone(), client.user_agent.clone()),
                );
                increment_counter!("logins_total", "result" => "failure");
                return Err(ApiError::invalid_credentials());
            }
        };

        if !user.is_active {
            self.audit.emit(
                AuditEvent::failure(AuditEventType::LoginFailure, "account inactive")
                    .with_user(user.id)
                    .with_email(&user.email)
                    .with_client(client.ip.clone(), client.user_agent.clone()),
            );
            return Err(ApiError::account_inactive());
        }

        let user = self
            .repos
            .users
            .record_login_success(user.id, Utc::now())
            .await?;

        let subject = self.token_subject(&user).await?;
        let (access, refresh) = self.tokens.issue_pair(&subject)?;

        info!(user_id = user.id, "login succeeded");
        increment_counter!("logins_total", "result" => "success");
        self.audit.emit(
            AuditEvent::success(AuditEventType::LoginSuccess)
                .with_user(user.id)
                .with_email(&user.email)
                .with_client(client.ip.clone(), client.user_agent.clone()),
        );

        Ok(LoginOutcome {
            access,
            refresh,
            user,
        })
    }

    /// Validate an access token and return its claims.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        self.tokens.validate(token, TokenKind::Access)
    }

    /// Mint a fresh access token and rotate the refresh token. The old
    /// refresh token joins the revocation set.
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<(IssuedToken, IssuedToken)> {
        let claims = self.tokens.validate(refresh_token, TokenKind::Refresh)?;

        let user = self
            .repos
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::authentication_failed("Unknown subject"))?;
        if !user.is_active {
            return Err(ApiError::account_inactive());
        }
        if user.is_locked() {
            return Err(ApiError::account_locked("Account temporarily locked"));
        }

        // Rotation: the presented token is spent from here on
        self.tokens.revoke(&claims);

        let subject = self.token_subject(&user).await?;
        let (access, refresh) = self.tokens.issue_pair(&subject)?;

        self.audit.emit(
            AuditEvent::success(AuditEventType::TokenRefreshed)
                .with_user(user.id)
                .with_email(&user.email)
                .with_client(client.ip.clone(), client.user_agent.clone()),
        );

        Ok((access, refresh))
    }

    /// Revoke an access token. Idempotent, and the token does not have to
    /// still be valid.
    pub fn logout(&self, access_token: &str, client: &ClientInfo) {
        let claims = self.tokens.revoke_token(access_token, TokenKind::Access);
        let mut event = AuditEvent::success(AuditEventType::Logout)
            .with_client(client.ip.clone(), client.user_agent.clone());
        if let Some(claims) = &claims {
            event = event.with_user(claims.sub).with_email(&claims.email);
        }
        self.audit.emit(event);
    }

    /// Change a password, verifying the current one first. Every
    /// outstanding token of the subject stops validating.
    #[instrument(skip_all, fields(user_id))]
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        client: &ClientInfo,
    ) -> Result<()> {
        let user = self
            .repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        if !self
            .verify_password(current_password, Some(&user.password_hash))
            .await?
        {
            self.audit.emit(
                AuditEvent::failure(AuditEventType::PasswordChanged, "current password mismatch")
                    .with_user(user.id)
                    .with_email(&user.email)
                    .with_client(client.ip.clone(), client.user_agent.clone()),
            );
            return Err(ApiError::invalid_credentials());
        }

        let hash = self.hash_password(new_password).await?;
        self.repos.users.set_password_hash(user.id, &hash).await?;

        let revoked = self.tokens.revoke_all_for_user(user.id);
        self.audit.emit(
            AuditEvent::success(AuditEventType::PasswordChanged)
                .with_user(user.id)
                .with_email(&user.email)
                .with_client(client.ip.clone(), client.user_agent.clone())
                .with_metadata(serde_json::json!({ "tokens_revoked": revoked })),
        );
        Ok(())
    }

    /// Issue a single-use reset token for the account.
    #[instrument(skip_all)]
    pub async fn initiate_password_reset(
        &self,
        email: &str,
        client: &ClientInfo,
    ) -> Result<IssuedToken> {
        let user = self
            .repos
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        let subject = self.token_subject(&user).await?;
        let reset = self.tokens.issue(&subject, TokenKind::Reset)?;

        self.audit.emit(
            AuditEvent::success(AuditEventType::PasswordResetInitiated)
                .with_user(user.id)
                .with_email(&user.email)
                .with_client(client.ip.clone(), client.user_agent.clone())
                .with_metadata(serde_json::json!({ "token_id": reset.claims.jti })),
        );
        Ok(reset)
    }

    /// Complete a reset with a valid, unused reset token. The token is
    /// revoked on use, along with every other outstanding token of the
    /// subject.
    #[instrument(skip_all)]
    pub async fn complete_password_reset(
        &self,
        reset_token: &str,
        new_password: &str,
        client: &ClientInfo,
    ) -> Result<()> {
        let claims = self.tokens.validate(reset_token, TokenKind::Reset)?;

        let hash = self.hash_password(new_password).await?;
        self.repos.users.set_password_hash(claims.sub, &hash).await?;

        // Single use: spend the reset token, then everything else
        self.tokens.revoke(&claims);
        self.tokens.revoke_all_for_user(claims.sub);

        self.audit.emit(
            AuditEvent::success(AuditEventType::PasswordResetCompleted)
                .with_user(claims.sub)
                .with_email(&claims.email)
                .with_client(client.ip.clone(), client.user_agent.clone()),
        );
        Ok(())
    }

    /// Issue an email-verification token (reset kind, its own lifetime).
    pub async fn initiate_email_verification(&self, user: &User) -> Result<IssuedToken> {
        let subject = self.token_subject(user).await?;
        self.tokens
            .issue_with_ttl(&subject, TokenKind::Reset, self.email_verification_ttl)
    }

    /// Mark the subject's email verified and spend the token.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str, client: &ClientInfo) -> Result<User> {
        let claims = self.tokens.validate(token, TokenKind::Reset)?;
        let user = self
            .repos
            .users
            .mark_email_verified(claims.sub, Utc::now())
            .await?;
        self.tokens.revoke(&claims);

        self.audit.emit(
            AuditEvent::success(AuditEventType::EmailVerified)
                .with_user(user.id)
                .with_email(&user.email)
                .with_client(client.ip.clone(), client.user_agent.clone()),
        );
        Ok(user)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lockout_duration", &self.lockout_duration)
            .finish_non_exhaustive()
    }
}
