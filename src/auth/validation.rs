//! Request payloads for the authentication endpoints.

use std::collections::HashSet;

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::RoleName;

/// Registration payload. Roles default to USER when omitted.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password should be at least 8 characters long"))]
    pub password: String,
    pub roles: Option<HashSet<RoleName>>,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Refresh payload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_request_rejects_short_password() {
        let request = SignUpRequest {
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: "alice@example.com".into(),
            password: "short".into(),
            roles: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn sign_in_request_rejects_bad_email() {
        let request =
            SignInRequest { email: "not-an-email".into(), password: "password123".into() };
        assert!(request.validate().is_err());
    }
}
