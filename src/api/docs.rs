//! OpenAPI documentation for the Tollgate API.

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::auth::register_handler,
        crate::api::handlers::auth::login_handler,
        crate::api::handlers::auth::refresh_handler,
        crate::api::handlers::users::list_users_handler,
        crate::api::handlers::users::me_handler,
        crate::api::handlers::admin::grant_admin_handler,
        crate::api::handlers::admin::revoke_admin_handler,
    ),
    components(schemas(
        crate::api::handlers::health::HealthResponse,
        crate::auth::auth_service::TokenPair,
        crate::auth::admin_service::GrantAdminRequest,
        crate::auth::models::Principal,
        crate::auth::models::Role,
        crate::auth::models::RoleName,
        crate::auth::validation::RefreshTokenRequest,
        crate::auth::validation::SignInRequest,
        crate::auth::validation::SignUpRequest,
        crate::domain::UserId,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Login, registration and token refresh"),
        (name = "users", description = "User listing and self lookup"),
        (name = "superadmin", description = "Role administration"),
        (name = "health", description = "Liveness probes")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build(),
                ),
            );
        }
    }
}

/// Swagger UI plus the raw OpenAPI document. Mounted outside the auth
/// layers; the documentation itself is public.
pub fn docs_router() -> Router {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()).into()
}
