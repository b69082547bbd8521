//! Authentication endpoints: register, login, refresh.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::auth_service::TokenPair;
use crate::auth::models::Principal;
use crate::auth::validation::{RefreshTokenRequest, SignInRequest, SignUpRequest};
use crate::errors::Error;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User registered", body = Principal),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Principal>), ApiError> {
    let principal = state.auth_service.register(payload).await.map_err(ApiError::from)?;
    Ok((StatusCode::CREATED, Json(principal)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let pair = state.auth_service.login(&payload).await.map_err(ApiError::from)?;
    Ok(Json(pair))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    payload.validate().map_err(|err| ApiError::from(Error::from(err)))?;

    let pair =
        state.auth_service.refresh(&payload.refresh_token).await.map_err(ApiError::from)?;
    Ok(Json(pair))
}
