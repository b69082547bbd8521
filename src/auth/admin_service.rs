//! Superadmin-only role administration: granting and revoking ADMIN.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::{AuthError, Principal, RoleName, SecurityContext};
use crate::auth::policy::require_any_role;
use crate::domain::UserId;
use crate::errors::Error;
use crate::storage::UserRepository;

/// Grant-admin payload. The email must match the target user's stored
/// email; the double key guards against granting by a stale id.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantAdminRequest {
    pub user_id: UserId,
    #[validate(email)]
    pub email: String,
}

/// Service for the superadmin role-administration workflow. Callers pass
/// the request's [`SecurityContext`] explicitly; the SUPERADMIN requirement
/// is checked against its role snapshot, not against storage.
#[derive(Clone)]
pub struct AdminService {
    users: Arc<dyn UserRepository>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Add the ADMIN role to an existing user.
    #[instrument(skip(self, context), fields(target = %request.user_id))]
    pub async fn grant_admin(
        &self,
        context: &SecurityContext,
        request: &GrantAdminRequest,
    ) -> Result<Principal, AuthError> {
        require_any_role(context, &[RoleName::SuperAdmin])?;

        let user = self
            .users
            .find_by_id(&request.user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User not found with id {}", request.user_id)))?;

        if user.email != request.email {
            return Err(AuthError::Storage(Error::validation(
                "Email not matching with the user email",
            )));
        }

        if user.has_role(RoleName::Admin) {
            return Err(AuthError::Storage(Error::conflict("User already has the admin role")));
        }

        let mut roles = user.roles.clone();
        roles.insert(RoleName::Admin);
        let updated = self.users.update_roles(&user.id, roles).await?;

        info!(target = %updated.id, "admin role granted");
        Ok(updated)
    }

    /// Remove the ADMIN role from an existing user.
    #[instrument(skip(self, context), fields(target = %user_id))]
    pub async fn revoke_admin(
        &self,
        context: &SecurityContext,
        user_id: &UserId,
    ) -> Result<Principal, AuthError> {
        require_any_role(context, &[RoleName::SuperAdmin])?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User not found with id {}", user_id)))?;

        if !user.has_role(RoleName::Admin) {
            return Err(AuthError::Storage(Error::not_found(
                "User does not have the admin role",
            )));
        }

        let mut roles = user.roles.clone();
        roles.remove(&RoleName::Admin);
        let updated = self.users.update_roles(&user.id, roles).await?;

        info!(target = %updated.id, "admin role revoked");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{AuthenticatedPrincipal, NewPrincipal};
    use crate::storage::InMemoryUserRepository;
    use std::collections::HashSet;

    fn superadmin_context() -> SecurityContext {
        SecurityContext::authenticated(AuthenticatedPrincipal::new(
            UserId::new(),
            "root@example.com".into(),
            [RoleName::SuperAdmin].into_iter().collect(),
        ))
    }

    fn admin_context() -> SecurityContext {
        SecurityContext::authenticated(AuthenticatedPrincipal::new(
            UserId::new(),
            "admin@example.com".into(),
            [RoleName::Admin].into_iter().collect(),
        ))
    }

    async fn seeded_service() -> (AdminService, Principal) {
        let repo = InMemoryUserRepository::shared();
        let user = repo
            .create(NewPrincipal {
                email: "carol@example.com".into(),
                first_name: "Carol".into(),
                last_name: "Jones".into(),
                password_hash: "$argon2id$stub".into(),
                enabled: true,
                roles: HashSet::from([RoleName::User]),
            })
            .await
            .unwrap();
        (AdminService::new(repo), user)
    }

    #[tokio::test]
    async fn grant_and_revoke_round_trip() {
        let (service, user) = seeded_service().await;
        let ctx = superadmin_context();
        let request = GrantAdminRequest { user_id: user.id.clone(), email: user.email.clone() };

        let granted = service.grant_admin(&ctx, &request).await.unwrap();
        assert!(granted.has_role(RoleName::Admin));
        assert!(granted.has_role(RoleName::User));

        let revoked = service.revoke_admin(&ctx, &user.id).await.unwrap();
        assert!(!revoked.has_role(RoleName::Admin));
    }

    #[tokio::test]
    async fn only_superadmin_may_grant() {
        let (service, user) = seeded_service().await;
        let request = GrantAdminRequest { user_id: user.id.clone(), email: user.email.clone() };

        let err = service.grant_admin(&admin_context(), &request).await.unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole));

        let err = service
            .grant_admin(&SecurityContext::anonymous(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn grant_requires_matching_email() {
        let (service, user) = seeded_service().await;
        let request =
            GrantAdminRequest { user_id: user.id.clone(), email: "other@example.com".into() };

        let err = service.grant_admin(&superadmin_context(), &request).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(Error::Validation(_))));
    }

    #[tokio::test]
    async fn double_grant_is_a_conflict_and_blind_revoke_is_not_found() {
        let (service, user) = seeded_service().await;
        let ctx = superadmin_context();
        let request = GrantAdminRequest { user_id: user.id.clone(), email: user.email.clone() };

        let err = service.revoke_admin(&ctx, &user.id).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(Error::NotFound(_))));

        service.grant_admin(&ctx, &request).await.unwrap();
        let err = service.grant_admin(&ctx, &request).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let (service, _) = seeded_service().await;
        let request =
            GrantAdminRequest { user_id: UserId::new(), email: "ghost@example.com".into() };

        let err = service.grant_admin(&superadmin_context(), &request).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(Error::NotFound(_))));
    }
}
