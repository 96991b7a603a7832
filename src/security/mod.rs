//! Credential and token machinery
//!
//! Password hashing and policy, signed bearer tokens, the revocation set,
//! and the login rate limiter. Signing keys live here and are never logged.

mod password;
mod rate_limit;
mod revocation;
mod token;

pub use password::{PasswordHasher, PasswordPolicy, PasswordPolicyViolation};
pub use rate_limit::RateLimiter;
pub use revocation::{spawn_sweeper, RevocationSet};
pub use token::{Claims, IssuedToken, TokenEngine, TokenKind, TokenSubject};
