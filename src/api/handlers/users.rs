//! User listing and self-lookup endpoints.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::{Principal, SecurityContext};

#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users list", body = [Principal]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Insufficient role")
    ),
    security(("bearerAuth" = [])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<ApiState>,
    Query(params): Query<ListUsersQuery>,
) -> Result<Json<Vec<Principal>>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 1000) as usize;
    let offset = params.offset.unwrap_or(0).max(0) as usize;

    let users = state.users.list(limit, offset).await.map_err(ApiError::from)?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "The authenticated principal", body = Principal),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "users"
)]
pub async fn me_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<SecurityContext>,
) -> Result<Json<Principal>, ApiError> {
    let principal = context
        .principal()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: authentication required"))?;

    // Serve the stored record rather than the snapshot so the response
    // reflects role changes made since the token was issued.
    let stored = state
        .users
        .find_by_email(&principal.subject)
        .await
        .map_err(ApiError::from)?
        .map(|(principal, _)| principal)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized: authentication required"))?;

    Ok(Json(stored))
}
