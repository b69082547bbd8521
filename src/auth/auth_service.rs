//! Credential and refresh lifecycle: register, login, token refresh.
//!
//! Login moves a caller from Anonymous to Authenticated (access + refresh
//! pair); an expired access token is recovered through refresh, which
//! rotates the pair; an expired refresh token drops the caller back to
//! Anonymous with no automatic recovery.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::jwt::TokenService;
use crate::auth::models::{AuthError, NewPrincipal, Principal, RoleName};
use crate::auth::validation::{SignInRequest, SignUpRequest};
use crate::auth::hashing;
use crate::config::RoleSource;
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::storage::UserRepository;

/// Pre-computed dummy hash for timing-safe user enumeration prevention.
/// When a non-existent email is used, we still run Argon2 verification
/// against this hash so the response time matches real verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=768,t=1,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

/// Access/refresh token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Service for email/password authentication and token refresh.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    role_source: RoleSource,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        role_source: RoleSource,
    ) -> Self {
        Self { users, tokens, role_source }
    }

    /// Register a new principal. Defaults to the USER role when the request
    /// names none.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: SignUpRequest) -> Result<Principal> {
        request.validate()?;

        if self.users.exists_by_email(&request.email).await? {
            return Err(Error::conflict(format!(
                "User already exists with email {}",
                request.email
            )));
        }

        let password_hash = hashing::hash_password(&request.password)?;
        let roles = match request.roles {
            Some(roles) if !roles.is_empty() => roles,
            _ => HashSet::from([RoleName::User]),
        };

        let principal = self
            .users
            .create(NewPrincipal {
                email: request.email,
                first_name: capitalize_name(&request.first_name),
                last_name: capitalize_name(&request.last_name),
                password_hash,
                enabled: true,
                roles,
            })
            .await?;

        info!(user_id = %principal.id, "registered new user");
        Ok(principal)
    }

    /// Authenticate with email and password, returning a fresh token pair.
    ///
    /// All failure modes (unknown email, wrong password, disabled account)
    /// collapse into [`AuthError::InvalidCredentials`] so responses carry no
    /// oracle about which part failed.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &SignInRequest) -> std::result::Result<TokenPair, AuthError> {
        let Some((principal, password_hash)) = self.users.find_by_email(&request.email).await?
        else {
            // Prevent timing-based user enumeration: perform dummy hash
            // verification so response time matches real verification.
            if let Err(err) = hashing::verify_password(&request.password, &DUMMY_HASH) {
                warn!(error = %err, "dummy hash verification failed unexpectedly");
            }
            warn!(email = %request.email, "login attempt for non-existent user");
            metrics::record_authentication("invalid_credentials").await;
            return Err(AuthError::InvalidCredentials);
        };

        if !hashing::verify_password(&request.password, &password_hash)? {
            warn!(user_id = %principal.id, "login attempt with incorrect password");
            metrics::record_authentication("invalid_credentials").await;
            return Err(AuthError::InvalidCredentials);
        }

        if !principal.enabled {
            warn!(user_id = %principal.id, "login attempt for disabled user");
            metrics::record_authentication("account_disabled").await;
            return Err(AuthError::InvalidCredentials);
        }

        metrics::record_authentication("login_success").await;
        info!(user_id = %principal.id, "user logged in");
        self.issue_pair(&principal)
    }

    /// Exchange a valid refresh token for a new access/refresh pair.
    ///
    /// Rotation issues a brand-new pair; with no server-side token store the
    /// old refresh token stays independently valid until its own expiry.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> std::result::Result<TokenPair, AuthError> {
        let subject = self.tokens.parse_subject(refresh_token)?;

        let Some((principal, _)) = self.users.find_by_email(&subject).await? else {
            metrics::record_authentication("refresh_unknown_subject").await;
            return Err(AuthError::PrincipalNotFound);
        };

        if !principal.enabled {
            metrics::record_authentication("refresh_disabled").await;
            return Err(AuthError::InvalidCredentials);
        }

        if self.tokens.is_expired(refresh_token)? {
            metrics::record_authentication("refresh_expired").await;
            return Err(AuthError::TokenExpired);
        }

        // A store may resolve emails more loosely than the token's exact
        // subject; the comparison stays case-sensitive.
        if principal.email != subject {
            metrics::record_authentication("refresh_subject_mismatch").await;
            return Err(AuthError::SubjectMismatch);
        }

        if !self.tokens.validate(refresh_token, &principal.email) {
            metrics::record_authentication("refresh_invalid").await;
            return Err(AuthError::InvalidCredentials);
        }

        metrics::record_authentication("refresh_success").await;
        info!(user_id = %principal.id, "token pair rotated");
        self.issue_pair(&principal)
    }

    /// Seed a superadmin principal when the store is empty, so a fresh
    /// deployment has a way in. Returns the created principal, or `None`
    /// when the store already has users.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn ensure_bootstrap_superadmin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>> {
        if self.users.count().await? > 0 {
            return Ok(None);
        }

        let principal = self
            .users
            .create(NewPrincipal {
                email: email.to_string(),
                first_name: "Super".to_string(),
                last_name: "Admin".to_string(),
                password_hash: hashing::hash_password(password)?,
                enabled: true,
                roles: HashSet::from([RoleName::SuperAdmin]),
            })
            .await?;

        info!(user_id = %principal.id, "bootstrap superadmin seeded from environment");
        Ok(Some(principal))
    }

    fn issue_pair(&self, principal: &Principal) -> std::result::Result<TokenPair, AuthError> {
        let access_token = match self.role_source {
            RoleSource::Store => self.tokens.issue_access_token(&principal.email)?,
            RoleSource::Claims => {
                let mut extra = Map::new();
                let mut roles: Vec<&str> =
                    principal.roles.iter().map(|role| role.as_str()).collect();
                roles.sort_unstable();
                extra.insert("roles".to_string(), json!(roles));
                extra.insert("uid".to_string(), json!(principal.id.as_str()));
                self.tokens.issue_access_token_with_claims(&principal.email, extra)?
            }
        };
        let refresh_token = self.tokens.issue_refresh_token(&principal.email, Map::new())?;
        Ok(TokenPair { access_token, refresh_token })
    }
}

/// Normalize a name the way the user management flow stores them: first
/// letter upper-cased, the rest lowered.
fn capitalize_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::storage::InMemoryUserRepository;

    fn service(role_source: RoleSource) -> AuthService {
        let config = AuthConfig {
            jwt_secret: "auth-service-test-secret-of-sufficient-length".to_string(),
            access_ttl_seconds: 3600,
            refresh_ttl_seconds: 7200,
            role_source,
        };
        AuthService::new(
            InMemoryUserRepository::shared(),
            Arc::new(TokenService::new(&config)),
            role_source,
        )
    }

    fn sign_up(email: &str) -> SignUpRequest {
        SignUpRequest {
            first_name: "alice".to_string(),
            last_name: "SMITH".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            roles: None,
        }
    }

    #[tokio::test]
    async fn register_defaults_to_user_role_and_normalizes_names() {
        let service = service(RoleSource::Store);
        let principal = service.register(sign_up("alice@example.com")).await.unwrap();

        assert_eq!(principal.first_name, "Alice");
        assert_eq!(principal.last_name, "Smith");
        assert_eq!(principal.full_name(), "Alice Smith");
        assert!(principal.enabled);
        assert!(principal.has_role(RoleName::User));
        assert_eq!(principal.roles.len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let service = service(RoleSource::Store);
        service.register(sign_up("alice@example.com")).await.unwrap();

        let err = service.register(sign_up("alice@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let service = service(RoleSource::Store);
        let mut request = sign_up("alice@example.com");
        request.password = "short".to_string();

        let err = service.register(request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn login_returns_pair_that_validates() {
        let service = service(RoleSource::Store);
        service.register(sign_up("alice@example.com")).await.unwrap();

        let pair = service
            .login(&SignInRequest {
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();
        assert!(service.tokens.validate(&pair.access_token, "alice@example.com"));
        assert!(service.tokens.validate(&pair.refresh_token, "alice@example.com"));
    }

    #[tokio::test]
    async fn login_failures_collapse_to_invalid_credentials() {
        let service = service(RoleSource::Store);
        service.register(sign_up("alice@example.com")).await.unwrap();

        let wrong_password = service
            .login(&SignInRequest {
                email: "alice@example.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));

        let unknown_email = service
            .login(&SignInRequest {
                email: "nobody@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn refresh_rotates_pair_and_keeps_old_refresh_valid() {
        let service = service(RoleSource::Store);
        service.register(sign_up("alice@example.com")).await.unwrap();

        let original = service
            .login(&SignInRequest {
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        let rotated = service.refresh(&original.refresh_token).await.unwrap();
        assert!(service.tokens.validate(&rotated.access_token, "alice@example.com"));

        // Stateless design: the pre-rotation refresh token is still usable
        // until its own expiry. Intentional; there is no revocation list.
        assert!(service.tokens.validate(&original.refresh_token, "alice@example.com"));
        assert!(service.refresh(&original.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_and_unknown_subjects() {
        let service = service(RoleSource::Store);

        let garbage = service.refresh("garbage-token").await.unwrap_err();
        assert!(matches!(garbage, AuthError::TokenMalformed));

        // Well-signed token for a subject the store has never seen.
        let token = service.tokens.issue_refresh_token("ghost@example.com", Map::new()).unwrap();
        let unknown = service.refresh(&token).await.unwrap_err();
        assert!(matches!(unknown, AuthError::PrincipalNotFound));
    }

    #[tokio::test]
    async fn claims_mode_embeds_roles_in_access_token() {
        let service = service(RoleSource::Claims);
        let mut request = sign_up("admin@example.com");
        request.roles = Some([RoleName::Admin, RoleName::User].into_iter().collect());
        service.register(request).await.unwrap();

        let pair = service
            .login(&SignInRequest {
                email: "admin@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        let claims = service.tokens.parse_claims(&pair.access_token).unwrap();
        let roles = claims.extra.get("roles").and_then(|value| value.as_array()).unwrap();
        assert!(roles.iter().any(|role| role == "ADMIN"));
        assert!(claims.extra.contains_key("uid"));
    }

    #[tokio::test]
    async fn bootstrap_seeds_only_into_an_empty_store() {
        let service = service(RoleSource::Store);

        let seeded = service
            .ensure_bootstrap_superadmin("root@example.com", "bootstrap-password")
            .await
            .unwrap()
            .unwrap();
        assert!(seeded.has_role(RoleName::SuperAdmin));

        let second = service
            .ensure_bootstrap_superadmin("other@example.com", "bootstrap-password")
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn capitalize_name_handles_edge_cases() {
        assert_eq!(capitalize_name("alice"), "Alice");
        assert_eq!(capitalize_name("SMITH"), "Smith");
        assert_eq!(capitalize_name(""), "");
    }
}
