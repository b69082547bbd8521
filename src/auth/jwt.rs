//! JWT issuance and validation for stateless bearer authentication.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url)
//! signed with HMAC-SHA256 under a single server-held secret. Signature
//! verification, subject extraction and expiry are separately callable so
//! the authentication gate can tell "needs refresh" (valid signature,
//! expired) apart from "reject outright" (bad signature, malformed).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::models::AuthError;
use crate::config::AuthConfig;
use crate::errors::{Error, Result};

/// JWT claims structure. Refresh tokens may carry extra flat claims; access
/// tokens issued through [`TokenService::issue_access_token`] never do.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Service for issuing and validating access and refresh tokens.
///
/// Holds the symmetric signing key, which is read-only after construction;
/// the service is cheaply shareable behind an `Arc`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Clock,
}

impl TokenService {
    /// Create a new token service from the auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(Utc::now))
    }

    /// Create a token service with an injected clock. Production code uses
    /// [`TokenService::new`]; tests use this to cross expiry boundaries.
    pub fn with_clock(config: &AuthConfig, clock: Clock) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(config.access_ttl_seconds as i64),
            refresh_ttl: Duration::seconds(config.refresh_ttl_seconds as i64),
            clock,
        }
    }

    /// Issue a short-lived access token for the given subject. No extra
    /// claims beyond `sub`, `iat` and `exp`.
    pub fn issue_access_token(&self, subject: &str) -> Result<String> {
        self.issue(subject, self.access_ttl, Map::new())
    }

    /// Issue an access token carrying extra flat claims. Used only when the
    /// gate is configured to read roles from token claims.
    pub fn issue_access_token_with_claims(
        &self,
        subject: &str,
        extra: Map<String, Value>,
    ) -> Result<String> {
        self.issue(subject, self.access_ttl, extra)
    }

    /// Issue a refresh token. Caller-supplied claims are flattened verbatim
    /// into the payload.
    pub fn issue_refresh_token(&self, subject: &str, extra: Map<String, Value>) -> Result<String> {
        self.issue(subject, self.refresh_ttl, extra)
    }

    fn issue(&self, subject: &str, ttl: Duration, extra: Map<String, Value>) -> Result<String> {
        let now = (self.clock)();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            extra,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| Error::internal(format!("Failed to sign token: {}", err)))
    }

    /// Decode and signature-verify a token, returning its claims. Expiry is
    /// deliberately not checked here.
    pub fn parse_claims(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => AuthError::TokenSignatureInvalid,
                _ => AuthError::TokenMalformed,
            })
    }

    /// Extract the subject from a signature-verified token.
    pub fn parse_subject(&self, token: &str) -> std::result::Result<String, AuthError> {
        Ok(self.parse_claims(token)?.sub)
    }

    /// Whether the token's expiry has passed. Does not re-verify the
    /// signature; that is a separate concern.
    pub fn is_expired(&self, token: &str) -> std::result::Result<bool, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::TokenMalformed)?;

        Ok((self.clock)().timestamp() >= claims.exp)
    }

    /// Validation predicate: true iff the signature verifies, the subject
    /// matches exactly (case-sensitive) and the token is unexpired. Never
    /// raises; callers branch on the result.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        match self.parse_subject(token) {
            Ok(subject) => {
                subject == expected_subject && !self.is_expired(token).unwrap_or(true)
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleSource;
    use serde_json::json;

    fn test_config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            access_ttl_seconds: 3600,
            refresh_ttl_seconds: 7200,
            role_source: RoleSource::Store,
        }
    }

    fn fixed_clock(at: DateTime<Utc>) -> Clock {
        Arc::new(move || at)
    }

    const SECRET: &str = "unit-test-signing-secret-of-sufficient-length";

    #[test]
    fn fresh_access_token_validates_for_its_subject() {
        let service = TokenService::new(&test_config(SECRET));
        let token = service.issue_access_token("alice@example.com").unwrap();
        assert!(service.validate(&token, "alice@example.com"));
    }

    #[test]
    fn parse_subject_returns_exact_subject() {
        let service = TokenService::new(&test_config(SECRET));
        let token = service.issue_access_token("alice@example.com").unwrap();
        assert_eq!(service.parse_subject(&token).unwrap(), "alice@example.com");
    }

    #[test]
    fn subject_comparison_is_case_sensitive() {
        let service = TokenService::new(&test_config(SECRET));
        let token = service.issue_access_token("alice@example.com").unwrap();
        assert!(!service.validate(&token, "Alice@example.com"));
    }

    #[test]
    fn expiry_invalidates_but_does_not_corrupt() {
        let issued_at = Utc::now();
        let config = test_config(SECRET);
        let issuer = TokenService::with_clock(&config, fixed_clock(issued_at));
        let token = issuer.issue_access_token("alice@example.com").unwrap();

        // Same key, clock advanced two hours: past the 1h access TTL.
        let later = TokenService::with_clock(&config, fixed_clock(issued_at + Duration::hours(2)));
        assert!(!later.validate(&token, "alice@example.com"));
        assert!(later.is_expired(&token).unwrap());
        // Structure and signature are still intact.
        assert_eq!(later.parse_subject(&token).unwrap(), "alice@example.com");
    }

    #[test]
    fn one_hour_token_rejected_after_sixty_one_minutes() {
        let issued_at = Utc::now();
        let config = test_config(SECRET);
        let issuer = TokenService::with_clock(&config, fixed_clock(issued_at));
        let token = issuer.issue_access_token("bob@example.com").unwrap();
        assert!(issuer.validate(&token, "bob@example.com"));

        let later =
            TokenService::with_clock(&config, fixed_clock(issued_at + Duration::minutes(61)));
        assert!(!later.validate(&token, "bob@example.com"));
    }

    #[test]
    fn token_signed_with_other_key_fails_before_expiry() {
        let issuer =
            TokenService::new(&test_config("a-completely-different-signing-secret-k2"));
        let token = issuer.issue_access_token("alice@example.com").unwrap();

        let verifier = TokenService::new(&test_config(SECRET));
        assert!(!verifier.validate(&token, "alice@example.com"));
        assert!(matches!(
            verifier.parse_subject(&token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn garbage_token_is_malformed() {
        let service = TokenService::new(&test_config(SECRET));
        assert!(matches!(
            service.parse_subject("not-even-a-jwt"),
            Err(AuthError::TokenMalformed)
        ));
        assert!(!service.validate("not-even-a-jwt", "alice@example.com"));
    }

    #[test]
    fn refresh_token_carries_extra_claims_verbatim() {
        let service = TokenService::new(&test_config(SECRET));
        let mut extra = Map::new();
        extra.insert("tenant".to_string(), json!("acme"));
        let token = service.issue_refresh_token("alice@example.com", extra).unwrap();

        let claims = service.parse_claims(&token).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.extra.get("tenant"), Some(&json!("acme")));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_ttl_outlives_access_ttl() {
        let at = Utc::now();
        let service = TokenService::with_clock(&test_config(SECRET), fixed_clock(at));
        let access = service.issue_access_token("alice@example.com").unwrap();
        let refresh = service.issue_refresh_token("alice@example.com", Map::new()).unwrap();

        let access_exp = service.parse_claims(&access).unwrap().exp;
        let refresh_exp = service.parse_claims(&refresh).unwrap().exp;
        assert!(refresh_exp > access_exp);
    }
}
