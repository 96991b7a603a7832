use super::defaults::*;
use crate::error::{ApiError, Result};
use serde::Deserialize;

/// Sample keys shipped in development material. A service configured with
/// one of these must refuse to start.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "",
    "secret",
    "changeme",
    "your-secret-key",
    "your-super-secret-key-for-development",
];

/// Security section of the process configuration.
///
/// Loaded from the environment under the `SECURITY_` prefix, so
/// `security.jwt_secret` is read from `SECURITY_JWT_SECRET` and so on.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: i64,
    #[serde(default = "default_refresh_expiration")]
    pub refresh_expiration: i64,
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,
    /// Work factor for the password hash. The key name is kept for
    /// compatibility with existing deployments; it feeds the argon2 time
    /// cost.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    #[serde(default = "default_password_max_length")]
    pub password_max_length: usize,
    #[serde(default = "default_true")]
    pub password_require_uppercase: bool,
    #[serde(default = "default_true")]
    pub password_require_lowercase: bool,
    #[serde(default = "default_true")]
    pub password_require_numbers: bool,
    #[serde(default = "default_false")]
    pub password_require_special_chars: bool,
    #[serde(default = "default_password_min_score")]
    pub password_min_score: u8,
    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: f64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: i32,
    #[serde(default = "default_lockout_duration_minutes")]
    pub lockout_duration_minutes: i64,
    #[serde(default = "default_true")]
    pub allow_self_registration: bool,
    #[serde(default = "default_false")]
    pub require_email_verification: bool,
    #[serde(default = "default_email_verification_expiry_hours")]
    pub email_verification_expiry_hours: i64,
    #[serde(default = "default_password_reset_expiry_hours")]
    pub password_reset_expiry_hours: i64,
    #[serde(default = "default_permission_cache_ttl_seconds")]
    pub permission_cache_ttl_seconds: u64,
}

impl SecurityConfig {
    /// Load and validate from the environment.
    pub fn load() -> Result<Self> {
        let config: SecurityConfig = envy::prefixed("SECURITY_")
            .from_env()
            .map_err(|e| ApiError::internal(format!("security configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation. Rejects empty or sample signing keys and
    /// nonsensical numeric settings.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("SECURITY_JWT_SECRET", &self.jwt_secret),
            ("SECURITY_JWT_REFRESH_SECRET", &self.jwt_refresh_secret),
        ] {
            if PLACEHOLDER_SECRETS.contains(&value.as_str()) {
                return Err(ApiError::internal(format!(
                    "{} is empty or a sample key; refusing to start",
                    name
                )));
            }
        }
        if self.jwt_secret == self.jwt_refresh_secret {
            return Err(ApiError::internal(
                "access and refresh signing keys must differ",
            ));
        }
        if self.jwt_expiration <= 0 || self.refresh_expiration <= 0 {
            return Err(ApiError::internal("token lifetimes must be positive"));
        }
        if self.password_min_length == 0 || self.password_min_length > self.password_max_length {
            return Err(ApiError::internal("invalid password length bounds"));
        }
        if self.password_min_score > 100 {
            return Err(ApiError::internal("password_min_score is a 0-100 scale"));
        }
        if self.rate_limit_rps <= 0.0 || self.rate_limit_burst == 0 {
            return Err(ApiError::internal("invalid rate limit settings"));
        }
        if self.max_failed_attempts <= 0 || self.lockout_duration_minutes <= 0 {
            return Err(ApiError::internal("invalid lockout settings"));
        }
        Ok(())
    }
}

impl Default for SecurityConfig {
    /// Test and example defaults. The secrets here are deliberately not in
    /// the placeholder list so the struct validates in tests; production
    /// loads real keys from the environment.
    fn default() -> Self {
        Self {
            jwt_secret: "0f9c1d38a4e1b2f69d5b3f7aa2c46d18".to_string(),
            jwt_refresh_secret: "7b44e9c2d0a35f18c6e2db90f1a7c523".to_string(),
            jwt_expiration: default_jwt_expiration(),
            refresh_expiration: default_refresh_expiration(),
            jwt_issuer: default_jwt_issuer(),
            jwt_audience: default_jwt_audience(),
            bcrypt_cost: default_bcrypt_cost(),
            password_min_length: default_password_min_length(),
            password_max_length: default_password_max_length(),
            password_require_uppercase: true,
            password_require_lowercase: true,
            password_require_numbers: true,
            password_require_special_chars: false,
            password_min_score: default_password_min_score(),
            rate_limit_rps: default_rate_limit_rps(),
            rate_limit_burst: default_rate_limit_burst(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_duration_minutes: default_lockout_duration_minutes(),
            allow_self_registration: true,
            require_email_verification: false,
            email_verification_expiry_hours: default_email_verification_expiry_hours(),
            password_reset_expiry_hours: default_password_reset_expiry_hours(),
            permission_cache_ttl_seconds: default_permission_cache_ttl_seconds(),
        }
    }
}
