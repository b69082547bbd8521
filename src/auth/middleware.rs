//! Axum middleware for authentication and authorization.
//!
//! `authenticate` is the per-request authentication gate: it never rejects a
//! request itself. Structural token problems are absorbed into an empty
//! [`SecurityContext`] so public routes keep working; the route policy layer
//! downstream turns a missing or insufficient context into 401/403.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info_span, warn};

use crate::api::error::ApiError;
use crate::auth::jwt::TokenService;
use crate::auth::models::{AuthenticatedPrincipal, RoleName, SecurityContext};
use crate::auth::policy::RoutePolicy;
use crate::config::RoleSource;
use crate::domain::UserId;
use crate::observability::metrics;
use crate::storage::UserRepository;

pub type GateState = Arc<AuthenticationGate>;
pub type PolicyState = Arc<RoutePolicy>;

const BEARER_PREFIX: &str = "Bearer ";

/// Resolves an `Authorization` header into a [`SecurityContext`].
pub struct AuthenticationGate {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepository>,
    role_source: RoleSource,
}

impl AuthenticationGate {
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserRepository>,
        role_source: RoleSource,
    ) -> Self {
        Self { tokens, users, role_source }
    }

    /// Resolve a bearer header into a security context. Every failure mode
    /// yields the anonymous context; this function never errors.
    pub async fn resolve(&self, header: Option<&str>) -> SecurityContext {
        let Some(token) = header.and_then(|value| value.strip_prefix(BEARER_PREFIX)) else {
            return SecurityContext::anonymous();
        };

        let subject = match self.tokens.parse_subject(token) {
            Ok(subject) => subject,
            Err(err) => {
                debug!(error = %err, "bearer token rejected");
                metrics::record_authentication("invalid_token").await;
                return SecurityContext::anonymous();
            }
        };

        match self.role_source {
            RoleSource::Store => self.resolve_from_store(token, &subject).await,
            RoleSource::Claims => self.resolve_from_claims(token, subject).await,
        }
    }

    /// Re-derive the principal and its role set from the store. Grants and
    /// revocations take effect on the very next request.
    async fn resolve_from_store(&self, token: &str, subject: &str) -> SecurityContext {
        let principal = match self.users.find_by_email(subject).await {
            Ok(Some((principal, _))) => principal,
            Ok(None) => {
                metrics::record_authentication("unknown_subject").await;
                return SecurityContext::anonymous();
            }
            Err(err) => {
                warn!(error = %err, "principal store lookup failed during authentication");
                return SecurityContext::anonymous();
            }
        };

        if !principal.enabled {
            metrics::record_authentication("account_disabled").await;
            return SecurityContext::anonymous();
        }

        if !self.tokens.validate(token, &principal.email) {
            metrics::record_authentication("invalid").await;
            return SecurityContext::anonymous();
        }

        metrics::record_authentication("success").await;
        SecurityContext::authenticated(AuthenticatedPrincipal::from_principal(&principal))
    }

    /// Trust the role snapshot embedded in the token at issuance. No store
    /// round trip; staleness is bounded by the access TTL.
    async fn resolve_from_claims(&self, token: &str, subject: String) -> SecurityContext {
        if !self.tokens.validate(token, &subject) {
            return SecurityContext::anonymous();
        }

        let Ok(claims) = self.tokens.parse_claims(token) else {
            return SecurityContext::anonymous();
        };

        let roles: HashSet<RoleName> = claims
            .extra
            .get("roles")
            .and_then(|value| value.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| value.as_str())
                    .filter_map(|name| RoleName::from_str(name).ok())
                    .collect()
            })
            .unwrap_or_default();

        let Some(user_id) = claims
            .extra
            .get("uid")
            .and_then(|value| value.as_str())
            .and_then(|id| UserId::parse(id).ok())
        else {
            debug!("access token missing uid claim in claims mode");
            return SecurityContext::anonymous();
        };

        metrics::record_authentication("success").await;
        SecurityContext::authenticated(AuthenticatedPrincipal::new(user_id, subject, roles))
    }
}

/// Middleware entry point that authenticates requests using the configured
/// [`AuthenticationGate`]. Runs at most once per request: a context already
/// present in the extensions is left untouched.
pub async fn authenticate(
    State(gate): State<GateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.extensions().get::<SecurityContext>().is_some() {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %method,
        http.path = %path,
        correlation_id = %correlation_id
    );
    let _guard = span.enter();

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let context = gate.resolve(header.as_deref()).await;
    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Middleware entry point that enforces the route-prefix policy against the
/// context populated by [`authenticate`].
pub async fn enforce_route_policy(
    State(policy): State<PolicyState>,
    Extension(context): Extension<SecurityContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if let Err(err) = policy.authorize(path, &context) {
        warn!(http.path = %path, error = %err, "route policy denied request");
        return Err(ApiError::from(err));
    }
    Ok(next.run(request).await)
}
