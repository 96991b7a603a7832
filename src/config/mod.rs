//! Process-wide configuration
//!
//! Configuration is loaded once at startup from the environment (with an
//! optional `.env` file in development) and is immutable afterwards. The
//! security section refuses to load with missing, empty, or sample signing
//! keys.

mod app;
mod defaults;
mod security;

pub use self::app::{AppConfig, Environment};
pub use self::security::SecurityConfig;
