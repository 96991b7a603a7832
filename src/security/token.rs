use crate::config::SecurityConfig;
use crate::error::{ApiError, ErrorCode, ErrorContext, Result};
use crate::security::revocation::RevocationSet;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Discriminates what a bearer token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::Reset => "reset",
        }
    }
}

/// Claims carried by every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub username: String,
    pub organizations: Vec<i64>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_kind: TokenKind,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<i64>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
}

/// Identity snapshot a token is minted from, aggregated at issue time.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub organizations: Vec<i64>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

/// Issues, validates, and revokes signed bearer tokens.
///
/// Access and reset tokens are signed with the access secret, refresh
/// tokens with the refresh secret (HMAC-SHA256). The validation pipeline
/// runs signature, temporal, issuer, audience, and kind checks before
/// consulting the revocation set.
pub struct TokenEngine {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: i64,
    refresh_ttl: i64,
    reset_ttl: i64,
    revocations: Arc<RevocationSet>,
}

impl TokenEngine {
    /// Build from configuration. Refuses empty or placeholder keys.
    pub fn new(config: &SecurityConfig, revocations: Arc<RevocationSet>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            access_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_ttl: config.jwt_expiration,
            refresh_ttl: config.refresh_expiration,
            reset_ttl: config.password_reset_expiry_hours * 3600,
            revocations,
        })
    }

    pub fn revocations(&self) -> &Arc<RevocationSet> {
        &self.revocations
    }

    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    fn ttl_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Reset => self.reset_ttl,
        }
    }

    fn encoding_key_for(&self, kind: TokenKind) -> &EncodingKey {
        match kind {
            TokenKind::Access | TokenKind::Reset => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        }
    }

    fn decoding_key_for(&self, kind: TokenKind) -> &DecodingKey {
        match kind {
            TokenKind::Access | TokenKind::Reset => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        }
    }

    fn other_decoding_key(&self, kind: TokenKind) -> &DecodingKey {
        match kind {
            TokenKind::Access | TokenKind::Reset => &self.refresh_decoding,
            TokenKind::Refresh => &self.access_decoding,
        }
    }

    /// Issue a token of the given kind, with a custom lifetime when the
    /// caller needs one (email verification reuses the reset kind with its
    /// own expiry).
    pub fn issue_with_ttl(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl_seconds: i64,
    ) -> Result<IssuedToken> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            username: subject.username.clone(),
            organizations: subject.organizations.clone(),
            roles: subject.roles.clone(),
            permissions: subject.permissions.clone(),
            token_kind: kind,
            email_verified: subject.email_verified,
            is_active: subject.is_active,
            last_login: subject.last_login.map(|t| t.timestamp()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp: now + ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, self.encoding_key_for(kind))
            .map_err(|e| ApiError::internal(format!("token encoding: {}", e)))?;

        self.revocations
            .record_issued(subject.user_id, &claims.jti, claims.exp);
        increment_counter!("tokens_issued_total", "kind" => kind.as_str());

        Ok(IssuedToken { token, claims })
    }

    pub fn issue(&self, subject: &TokenSubject, kind: TokenKind) -> Result<IssuedToken> {
        self.issue_with_ttl(subject, kind, self.ttl_for(kind))
    }

    /// Issue the access+refresh pair handed out by login.
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<(IssuedToken, IssuedToken)> {
        let access = self.issue(subject, TokenKind::Access)?;
        let refresh = self.issue(subject, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    /// Validate a token of the expected kind and return its claims.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        self.validate_at(token, expected, Utc::now().timestamp())
    }

    /// Validation pipeline with an injected clock, for deterministic
    /// boundary tests.
    pub(crate) fn validate_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: i64,
    ) -> Result<Claims> {
        // 1. Signature, with the kind-appropriate key
        let claims = match self.decode_unchecked(token, self.decoding_key_for(expected)) {
            Ok(claims) => claims,
            Err(_) => {
                // A signature valid under the other key means the caller
                // presented the wrong kind of token, not a forged one.
                let err = if self.decode_unchecked(token, self.other_decoding_key(expected)).is_ok()
                {
                    token_error(ErrorCode::TokenKindMismatch, expected)
                } else {
                    token_error(ErrorCode::TokenInvalid, expected)
                };
                increment_counter!("token_validation_failures_total");
                return Err(err);
            }
        };

        // 2. Temporal, issuer, audience, and kind checks
        let failure = if claims.exp <= now {
            Some(ErrorCode::TokenExpired)
        } else if claims.nbf > now || claims.iss != self.issuer || claims.aud != self.audience {
            Some(ErrorCode::TokenInvalid)
        } else if claims.token_kind != expected {
            Some(ErrorCode::TokenKindMismatch)
        } else {
            None
        };
        if let Some(code) = failure {
            increment_counter!("token_validation_failures_total");
            return Err(token_error(code, expected));
        }

        // 3. Revocation
        if self.revocations.is_revoked(&claims.jti) {
            increment_counter!("token_validation_failures_total");
            return Err(token_error(ErrorCode::TokenRevoked, expected));
        }

        // 4. Parsed claims
        increment_counter!("token_validations_total");
        Ok(claims)
    }

    fn decode_unchecked(&self, token: &str, key: &DecodingKey) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::new(ErrorCode::TokenInvalid, "Invalid token", ErrorContext::new()))
    }

    /// Put a token's id into the revocation set.
    pub fn revoke(&self, claims: &Claims) {
        self.revocations.revoke(&claims.jti, claims.exp);
    }

    /// Best-effort revocation for logout: the token does not have to still
    /// be valid, only to carry a verifiable signature. Returns the claims
    /// when an id was revoked.
    pub fn revoke_token(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        let claims = self
            .decode_unchecked(token, self.decoding_key_for(kind))
            .ok()?;
        self.revocations.revoke(&claims.jti, claims.exp);
        Some(claims)
    }

    /// Invalidate every outstanding token of a user.
    pub fn revoke_all_for_user(&self, user_id: i64) -> usize {
        self.revocations.revoke_all_for_user(user_id)
    }
}

fn token_error(code: ErrorCode, expected: TokenKind) -> ApiError {
    let message = match code {
        ErrorCode::TokenExpired => "Token expired",
        ErrorCode::TokenRevoked => "Token revoked",
        ErrorCode::TokenKindMismatch => "Wrong token kind for this operation",
        _ => "Invalid token",
    };
    ApiError::new(
        code,
        message,
        ErrorContext::new().with_metadata("expected_kind", expected.as_str()),
    )
}
