//! Router assembly: routes, authentication gate and route policy layers.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::auth_service::AuthService;
use crate::auth::admin_service::AdminService;
use crate::auth::jwt::TokenService;
use crate::auth::middleware::{
    authenticate, enforce_route_policy, AuthenticationGate, GateState, PolicyState,
};
use crate::auth::policy::RoutePolicy;
use crate::config::Config;
use crate::storage::UserRepository;

use super::docs;
use super::error::ApiError;
use super::handlers::{
    grant_admin_handler, health_handler, list_users_handler, login_handler, me_handler,
    refresh_handler, register_handler, revoke_admin_handler,
};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserRepository>,
    pub auth_service: Arc<AuthService>,
    pub admin_service: Arc<AdminService>,
}

impl ApiState {
    /// Wire the full service stack for the given configuration and store.
    pub fn new(config: &Config, users: Arc<dyn UserRepository>) -> Self {
        let tokens = Arc::new(TokenService::new(&config.auth));
        let auth_service =
            Arc::new(AuthService::new(users.clone(), tokens.clone(), config.auth.role_source));
        let admin_service = Arc::new(AdminService::new(users.clone()));
        Self { tokens, users, auth_service, admin_service }
    }
}

/// Build the application router.
///
/// Layer order matters: the authentication gate runs first and populates
/// the request's security context, then the route policy renders its
/// allow/deny decision before any handler executes.
pub fn build_router(config: &Config, state: ApiState) -> Router {
    let gate: GateState = Arc::new(AuthenticationGate::new(
        state.tokens.clone(),
        state.users.clone(),
        config.auth.role_source,
    ));
    let policy: PolicyState = Arc::new(RoutePolicy::standard());

    let auth_layer = middleware::from_fn_with_state(gate, authenticate);
    let policy_layer = middleware::from_fn_with_state(policy, enforce_route_policy);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/refresh", post(refresh_handler))
        .route("/api/v1/users", get(list_users_handler))
        .route("/api/v1/users/me", get(me_handler))
        .route("/api/v1/superadmin/admins", post(grant_admin_handler))
        .route("/api/v1/superadmin/admins/{user_id}", delete(revoke_admin_handler))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(policy_layer)
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .merge(docs::docs_router())
}

/// Explicit fallback so unmatched paths still pass through the gate and the
/// route policy before producing a 404.
async fn not_found_handler() -> ApiError {
    ApiError::NotFound("No route for path".to_string())
}
