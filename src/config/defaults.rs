use super::app::Environment;

pub fn default_environment() -> Environment {
    Environment::Development
}

pub fn default_jwt_expiration() -> i64 {
    900 // 15 minutes
}

pub fn default_refresh_expiration() -> i64 {
    604_800 // 7 days
}

pub fn default_jwt_issuer() -> String {
    "identity-service".to_string()
}

pub fn default_jwt_audience() -> String {
    "platform-services".to_string()
}

pub fn default_bcrypt_cost() -> u32 {
    12
}

pub fn default_password_min_length() -> usize {
    8
}

pub fn default_password_max_length() -> usize {
    128
}

pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

pub fn default_password_min_score() -> u8 {
    50
}

pub fn default_rate_limit_rps() -> f64 {
    10.0
}

pub fn default_rate_limit_burst() -> u32 {
    5
}

pub fn default_max_failed_attempts() -> i32 {
    5
}

pub fn default_lockout_duration_minutes() -> i64 {
    15
}

pub fn default_email_verification_expiry_hours() -> i64 {
    24
}

pub fn default_password_reset_expiry_hours() -> i64 {
    2
}

pub fn default_permission_cache_ttl_seconds() -> u64 {
    300
}
