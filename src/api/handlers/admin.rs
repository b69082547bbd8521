//! Superadmin endpoints for granting and revoking the ADMIN role.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::admin_service::GrantAdminRequest;
use crate::auth::models::{Principal, SecurityContext};
use crate::domain::UserId;
use crate::errors::Error;

#[utoipa::path(
    post,
    path = "/api/v1/superadmin/admins",
    request_body = GrantAdminRequest,
    responses(
        (status = 200, description = "Admin role granted", body = Principal),
        (status = 400, description = "Email does not match the target user"),
        (status = 403, description = "Caller is not a superadmin"),
        (status = 404, description = "Target user not found"),
        (status = 409, description = "User already has the admin role")
    ),
    security(("bearerAuth" = [])),
    tag = "superadmin"
)]
pub async fn grant_admin_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<SecurityContext>,
    Json(payload): Json<GrantAdminRequest>,
) -> Result<Json<Principal>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let updated =
        state.admin_service.grant_admin(&context, &payload).await.map_err(ApiError::from)?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/superadmin/admins/{user_id}",
    params(("user_id" = String, Path, description = "Target user identifier")),
    responses(
        (status = 200, description = "Admin role revoked", body = Principal),
        (status = 400, description = "Malformed user id"),
        (status = 403, description = "Caller is not a superadmin"),
        (status = 404, description = "Target user not found or not an admin")
    ),
    security(("bearerAuth" = [])),
    tag = "superadmin"
)]
pub async fn revoke_admin_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<SecurityContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Principal>, ApiError> {
    let user_id = UserId::parse(&user_id)
        .map_err(|_| ApiError::bad_request(format!("Invalid user id: {}", user_id)))?;

    let updated =
        state.admin_service.revoke_admin(&context, &user_id).await.map_err(ApiError::from)?;
    Ok(Json(updated))
}
