use crate::config::SecurityConfig;
use crate::error::{ApiError, ErrorContext, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::error;

/// Curated dictionary of passwords that always score as weak.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "passw0rd", "password1", "123456", "12345678", "123456789",
    "qwerty", "qwertyuiop", "letmein", "welcome", "admin", "iloveyou",
    "monkey", "dragon", "master", "login", "abc123", "football", "baseball",
    "sunshine", "princess", "trustno1",
];

/// Reasons a password fails policy, in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PasswordPolicyViolation {
    TooShort,
    TooLong,
    MissingUppercase,
    MissingLowercase,
    MissingNumber,
    MissingSpecialChar,
    SequentialCharacters,
    RepeatedCharacters,
    CommonPassword,
    ScoreTooLow,
}

/// Password policy parameters, configured at startup.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub min_score: u8,
}

impl PasswordPolicy {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            min_length: config.password_min_length,
            max_length: config.password_max_length,
            require_uppercase: config.password_require_uppercase,
            require_lowercase: config.password_require_lowercase,
            require_numbers: config.password_require_numbers,
            require_special_chars: config.password_require_special_chars,
            min_score: config.password_min_score,
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

struct CharacterClasses {
    uppercase: bool,
    lowercase: bool,
    digits: bool,
    special: bool,
}

impl CharacterClasses {
    fn of(password: &str) -> Self {
        Self {
            uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
            digits: password.chars().any(|c| c.is_ascii_digit()),
            special: password.chars().any(|c| !c.is_ascii_alphanumeric()),
        }
    }

    fn count(&self) -> u32 {
        [self.uppercase, self.lowercase, self.digits, self.special]
            .iter()
            .filter(|present| **present)
            .count() as u32
    }
}

/// Weak-pattern matchers: sequential runs, repeated runs, dictionary hits.
fn weak_patterns(password: &str) -> Vec<PasswordPolicyViolation> {
    let mut violations = Vec::new();
    let lowered = password.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();

    let sequential = chars.windows(3).any(|w| {
        let (a, b, c) = (w[0] as i32, w[1] as i32, w[2] as i32);
        (b == a + 1 && c == b + 1) || (b == a - 1 && c == b - 1)
    });
    if sequential {
        violations.push(PasswordPolicyViolation::SequentialCharacters);
    }

    if chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
        violations.push(PasswordPolicyViolation::RepeatedCharacters);
    }

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        violations.push(PasswordPolicyViolation::CommonPassword);
    }

    violations
}

/// Strength score on a 0-100 scale.
///
/// Length contributes 25/15/10 at the 8/12/16 thresholds, each present
/// character class 10, three classes a further 10, all four another 10.
/// Any weak-pattern match costs 20.
pub fn strength_score(password: &str) -> u8 {
    let mut score: i32 = 0;
    let length = password.chars().count();

    if length >= 8 {
        score += 25;
    }
    if length >= 12 {
        score += 15;
    }
    if length >= 16 {
        score += 10;
    }

    let classes = CharacterClasses::of(password);
    score += classes.count() as i32 * 10;
    if classes.count() >= 3 {
        score += 10;
    }
    if classes.count() == 4 {
        score += 10;
    }

    if !weak_patterns(password).is_empty() {
        score -= 20;
    }

    score.clamp(0, 100) as u8
}

/// A verifier hashed from a fixed phrase. Used when the account does not
/// exist so that verification time does not reveal account existence.
static DUMMY_VERIFIER: Lazy<String> = Lazy::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"timing-equalizer-dummy-credential", &salt)
        .map(|hash| hash.to_string())
        .expect("hashing a fixed phrase with default parameters cannot fail")
});

/// Password hashing and verification with policy enforcement.
///
/// Hashing uses argon2id in PHC string format; the configured work factor
/// feeds the time cost. Instances are cheap to clone and safe to move onto
/// a blocking thread for the hash itself.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
}

impl PasswordHasher {
    pub fn new(policy: PasswordPolicy, work_factor: u32) -> Result<Self> {
        let params = Params::new(Params::DEFAULT_M_COST, work_factor.max(1), 1, None)
            .map_err(|e| ApiError::internal(format!("argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            policy,
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        Self::new(PasswordPolicy::from_config(config), config.bcrypt_cost)
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Enforce the configured policy against a candidate password.
    pub fn check_policy(&self, password: &str) -> Result<()> {
        let length = password.chars().count();
        if length < self.policy.min_length {
            return Err(policy_error(
                "Password too short",
                vec![PasswordPolicyViolation::TooShort],
                None,
            ));
        }
        if length > self.policy.max_length {
            return Err(policy_error(
                "Password too long",
                vec![PasswordPolicyViolation::TooLong],
                None,
            ));
        }

        let classes = CharacterClasses::of(password);
        let mut violations = Vec::new();
        if self.policy.require_uppercase && !classes.uppercase {
            violations.push(PasswordPolicyViolation::MissingUppercase);
        }
        if self.policy.require_lowercase && !classes.lowercase {
            violations.push(PasswordPolicyViolation::MissingLowercase);
        }
        if self.policy.require_numbers && !classes.digits {
            violations.push(PasswordPolicyViolation::MissingNumber);
        }
        if self.policy.require_special_chars && !classes.special {
            violations.push(PasswordPolicyViolation::MissingSpecialChar);
        }
        if !violations.is_empty() {
            return Err(policy_error(
                "Password is missing required character classes",
                violations,
                None,
            ));
        }

        let score = strength_score(password);
        if score < self.policy.min_score {
            let mut violations = weak_patterns(password);
            violations.push(PasswordPolicyViolation::ScoreTooLow);
            return Err(policy_error("Password too weak", violations, Some(score)));
        }

        Ok(())
    }

    /// Hash a password for storage. Enforces policy first.
    pub fn hash(&self, password: &str) -> Result<String> {
        self.check_policy(password)?;
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("failed to hash password: {}", e);
                ApiError::internal("password hashing failed")
            })
    }

    /// Verify a candidate against a stored verifier.
    pub fn verify(&self, password: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored).map_err(|e| {
            error!("failed to parse stored password hash: {}", e);
            ApiError::internal("stored verifier is malformed")
        })?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Verify against the stored verifier, or against the dummy verifier
    /// when the account does not exist. Always performs the full
    /// comparison; returns false for a missing account.
    pub fn verify_or_dummy(&self, password: &str, stored: Option<&str>) -> Result<bool> {
        match stored {
            Some(stored) => self.verify(password, stored),
            None => {
                let _ = self.verify(password, DUMMY_VERIFIER.as_str())?;
                Ok(false)
            }
        }
    }
}

fn policy_error(
    message: &str,
    violations: Vec<PasswordPolicyViolation>,
    score: Option<u8>,
) -> ApiError {
    let mut details = serde_json::json!({
        "field": "password",
        "reasons": violations,
    });
    if let Some(score) = score {
        details["score"] = score.into();
    }
    ApiError::validation_with_context(message, ErrorContext::new().with_details(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hasher() -> PasswordHasher {
        // Low work factor keeps the tests fast
        PasswordHasher::new(PasswordPolicy::default(), 1).unwrap()
    }

    #[test]
    fn scoring_thresholds() {
        // 8 chars, 4 classes: 25 + 40 + 10 + 10 = 85
        assert_eq!(strength_score("aB3$wkpm"), 85);
        // 12 chars, 4 classes: 25 + 15 + 40 + 10 + 10 = 100
        assert_eq!(strength_score("aB3$wkpmqzrt"), 100);
        // dictionary hit: 25 + 20 - 20 = 25
        assert_eq!(strength_score("password1"), 25);
        assert_eq!(strength_score(""), 0);
    }

    #[test]
    fn weak_pattern_detection() {
        assert!(weak_patterns("abc").contains(&PasswordPolicyViolation::SequentialCharacters));
        assert!(weak_patterns("cba").contains(&PasswordPolicyViolation::SequentialCharacters));
        assert!(weak_patterns("aaab").contains(&PasswordPolicyViolation::RepeatedCharacters));
        assert!(weak_patterns("qwerty").contains(&PasswordPolicyViolation::CommonPassword));
        assert!(weak_patterns("aB3$efgh").is_empty());
    }

    #[test]
    fn boundary_lengths() {
        let hasher = hasher();
        // Exactly min_length with all required classes passes
        assert!(hasher.check_policy("aB3dwkph").is_ok());
        // One below min_length is rejected
        let err = hasher.check_policy("aB3dwkp").unwrap_err();
        let details = err.context.details.unwrap();
        assert_eq!(details["reasons"][0], "TOO_SHORT");
    }

    #[test]
    fn missing_classes_are_enumerated() {
        let err = hasher().check_policy("alllowercase").unwrap_err();
        let reasons = err.context.details.unwrap()["reasons"].clone();
        let reasons: Vec<String> =
            serde_json::from_value(reasons).unwrap();
        assert!(reasons.contains(&"MISSING_UPPERCASE".to_string()));
        assert!(reasons.contains(&"MISSING_NUMBER".to_string()));
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash("Correct!Horse9").unwrap();
        assert_ne!(hash, "Correct!Horse9");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Correct!Horse9", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn dummy_verification_returns_false() {
        let hasher = hasher();
        assert!(!hasher.verify_or_dummy("anything", None).unwrap());
    }
}
