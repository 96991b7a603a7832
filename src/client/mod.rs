//! Typed client over the broker envelope
//!
//! Marshals request structures, sends one request on a broker connection,
//! awaits one reply within the configured timeout, and surfaces either the
//! typed response or an error carrying the service's wire code. The broker
//! transport itself is abstract.

use crate::api::dto::{ListParams, PublicUser};
use crate::api::envelope::RequestHeader;
use crate::domain::{Organization, Role, RoleScope};
use crate::error::{ApiError, ErrorCode, ErrorContext, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// One request, one reply, bounded by a deadline. Implementations wrap the
/// actual broker socket.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn request(
        &self,
        service: &str,
        operation: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value>;
}

/// Tokens the client holds on behalf of its user. Persisted by the caller
/// with owner-only permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenProfile {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds at which the access token expires.
    pub expires_at: i64,
    pub email: String,
    pub endpoint: String,
}

impl TokenProfile {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const SERVICE: &str = "identity";

/// Typed wrapper over the identity operations.
pub struct IdentityClient<C> {
    connection: C,
    endpoint: String,
    timeout: Duration,
    profile: RwLock<Option<TokenProfile>>,
}

impl<C: BrokerConnection> IdentityClient<C> {
    pub fn new(connection: C, endpoint: impl Into<String>) -> Self {
        Self {
            connection,
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            profile: RwLock::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profile(&self) -> Option<TokenProfile> {
        self.profile.read().clone()
    }

    pub fn set_profile(&self, profile: TokenProfile) {
        *self.profile.write() = Some(profile);
    }

    fn access_token(&self) -> Result<String> {
        self.profile
            .read()
            .as_ref()
            .map(|p| p.access_token.clone())
            .ok_or_else(|| ApiError::authentication_failed("Client holds no token profile"))
    }

    fn header() -> Value {
        serde_json::to_value(RequestHeader::new(Uuid::new_v4().to_string()))
            .unwrap_or_else(|_| json!({}))
    }

    /// Send one operation and unwrap the response envelope. Transient
    /// `UNAVAILABLE` replies are retried once; business failures never are.
    async fn call(&self, operation: &str, mut payload: Value) -> Result<Value> {
        payload["header"] = Self::header();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .connection
                .request(SERVICE, operation, payload.clone(), self.timeout)
                .await?;
            match Self::unwrap_envelope(response) {
                Err(err) if err.code.is_retryable() && attempt < 2 => continue,
                other => return other,
            }
        }
    }

    fn unwrap_envelope(response: Value) -> Result<Value> {
        let header = response.get("header").cloned().unwrap_or(Value::Null);
        let success = header
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if success {
            return Ok(response);
        }

        let code = header
            .get("error_code")
            .and_then(Value::as_str)
            .map(ErrorCode::from_wire)
            .unwrap_or(ErrorCode::Internal);
        let message = header
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        let mut context = ErrorContext::new();
        if let Some(detail) = header.get("detail") {
            context = context.with_details(detail.clone());
        }
        Err(ApiError::new(code, message, context))
    }

    fn field<T: serde::de::DeserializeOwned>(response: &Value, key: &str) -> Result<T> {
        serde_json::from_value(
            response
                .get(key)
                .cloned()
                .ok_or_else(|| ApiError::internal(format!("response missing '{}'", key)))?,
        )
        .map_err(|e| ApiError::internal(format!("response field '{}': {}", key, e)))
    }

    // --- auth ---

    /// Log in and store the resulting token profile.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<PublicUser> {
        let response = self
            .call(
                "auth.login",
                json!({ "identifier": identifier, "password": password }),
            )
            .await?;

        let user: PublicUser = Self::field(&response, "user")?;
        let profile = TokenProfile {
            access_token: Self::field(&response, "access_token")?,
            refresh_token: Self::field(&response, "refresh_token")?,
            expires_at: Self::field(&response, "expires_at")?,
            email: user.email.clone(),
            endpoint: self.endpoint.clone(),
        };
        self.set_profile(profile);
        Ok(user)
    }

    /// Revoke the held access token and drop the profile.
    pub async fn logout(&self) -> Result<()> {
        let token = self.access_token()?;
        self.call("auth.logout", json!({ "token": token })).await?;
        *self.profile.write() = None;
        Ok(())
    }

    /// Rotate the refresh token and replace the held pair.
    pub async fn refresh(&self) -> Result<()> {
        let refresh_token = self
            .profile
            .read()
            .as_ref()
            .map(|p| p.refresh_token.clone())
            .ok_or_else(|| ApiError::authentication_failed("Client holds no token profile"))?;

        let response = self
            .call("auth.refresh", json!({ "refresh_token": refresh_token }))
            .await?;

        let mut profile = self.profile.write();
        if let Some(profile) = profile.as_mut() {
            profile.access_token = Self::field(&response, "access_token")?;
            profile.refresh_token = Self::field(&response, "refresh_token")?;
            profile.expires_at = Self::field(&response, "expires_at")?;
        }
        Ok(())
    }

    /// Ask the service to validate an arbitrary access token.
    pub async fn validate(&self, token: &str) -> Result<Value> {
        let response = self
            .call("auth.validate", json!({ "token": token }))
            .await?;
        Self::field(&response, "claims")
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        let token = self.access_token()?;
        self.call(
            "auth.change_password",
            json!({
                "token": token,
                "current_password": current,
                "new_password": new,
            }),
        )
        .await?;
        Ok(())
    }

    // --- user ---

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<PublicUser> {
        let response = self
            .call(
                "user.create",
                json!({ "email": email, "username": username, "password": password }),
            )
            .await?;
        Self::field(&response, "user")
    }

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<PublicUser> {
        let token = self.access_token()?;
        let response = self
            .call(
                "user.create",
                json!({
                    "token": token,
                    "email": email,
                    "username": username,
                    "password": password,
                }),
            )
            .await?;
        Self::field(&response, "user")
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<PublicUser> {
        let token = self.access_token()?;
        let response = self
            .call("user.get", json!({ "token": token, "id": id }))
            .await?;
        Self::field(&response, "user")
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<PublicUser> {
        let token = self.access_token()?;
        let response = self
            .call("user.get", json!({ "token": token, "email": email }))
            .await?;
        Self::field(&response, "user")
    }

    pub async fn list_users(&self, page: &ListParams) -> Result<Vec<PublicUser>> {
        let token = self.access_token()?;
        let response = self
            .call(
                "user.list",
                json!({ "token": token, "page": page }),
            )
            .await?;
        Self::field(&response, "users")
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let token = self.access_token()?;
        self.call("user.delete", json!({ "token": token, "id": id }))
            .await?;
        Ok(())
    }

    // --- organization ---

    pub async fn create_organization(
        &self,
        name: &str,
        slug: Option<&str>,
        description: &str,
    ) -> Result<Organization> {
        let token = self.access_token()?;
        let response = self
            .call(
                "organization.create",
                json!({
                    "token": token,
                    "name": name,
                    "slug": slug,
                    "description": description,
                }),
            )
            .await?;
        Self::field(&response, "organization")
    }

    pub async fn get_organization(&self, id: i64) -> Result<Organization> {
        let token = self.access_token()?;
        let response = self
            .call("organization.get", json!({ "token": token, "id": id }))
            .await?;
        Self::field(&response, "organization")
    }

    pub async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        let token = self.access_token()?;
        self.call(
            "organization.add_member",
            json!({
                "token": token,
                "organization_id": organization_id,
                "user_id": user_id,
            }),
        )
        .await?;
        Ok(())
    }

    // --- role ---

    pub async fn create_role(
        &self,
        name: &str,
        permissions: &[&str],
        scope: RoleScope,
    ) -> Result<Role> {
        let token = self.access_token()?;
        let response = self
            .call(
                "role.create",
                json!({
                    "token": token,
                    "name": name,
                    "permissions": permissions,
                    "scope": scope,
                }),
            )
            .await?;
        Self::field(&response, "role")
    }

    pub async fn assign_role(
        &self,
        user_id: i64,
        role_id: i64,
        organization_id: Option<i64>,
    ) -> Result<()> {
        let token = self.access_token()?;
        self.call(
            "role.assign",
            json!({
                "token": token,
                "user_id": user_id,
                "role_id": role_id,
                "organization_id": organization_id,
            }),
        )
        .await?;
        Ok(())
    }

    // --- health ---

    pub async fn health_check(&self) -> Result<Value> {
        self.call("health.check", json!({})).await
    }
}
