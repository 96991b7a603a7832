use super::defaults::default_environment;
use super::security::SecurityConfig;
use crate::error::Result;
use serde::Deserialize;
use std::fmt;

/// Deployment stage the process runs in. Drives the default log level and
/// the service name telemetry reports under.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Log level applied when `LOG_LEVEL` is not set explicitly.
    /// Production stays at `info`; everything else gets `debug`.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Production => "info",
            Environment::Development | Environment::Staging => "debug",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        write!(f, "{}", name)
    }
}

/// Top-level process configuration.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: Environment,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(skip)]
    pub security: Option<SecurityConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config: AppConfig = envy::from_env()
            .map_err(|e| crate::error::ApiError::internal(format!("configuration: {}", e)))?;
        config.security = Some(SecurityConfig::load()?);
        Ok(config)
    }

    /// Explicit `LOG_LEVEL`, or the environment's default.
    pub fn log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or_else(|| self.environment.default_log_level())
    }

    pub fn security(&self) -> &SecurityConfig {
        self.security
            .as_ref()
            .expect("security configuration is loaded at startup")
    }
}
