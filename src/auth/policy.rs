//! Route- and operation-level access policy.
//!
//! The engine is a static table from route prefix to required access,
//! consulted after the authentication gate has populated the request's
//! [`SecurityContext`]. Deny decisions keep their cause: an unauthenticated
//! request maps to 401, an authenticated principal without a qualifying
//! role maps to 403.

use crate::auth::models::{AuthError, RoleName, SecurityContext};

/// Access requirement for a route prefix or operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No authentication required.
    Public,
    /// Any authenticated principal.
    Authenticated,
    /// Any principal holding at least one of these roles.
    AnyOf(&'static [RoleName]),
}

/// Ordered prefix table; the longest matching prefix wins. Routes with no
/// matching entry fall back to requiring authentication.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<(&'static str, Access)>,
    fallback: Access,
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self { rules: Vec::new(), fallback: Access::Authenticated }
    }

    /// The standard policy table for this backend.
    pub fn standard() -> Self {
        Self::new()
            .with_rule("/health", Access::Public)
            .with_rule("/api/v1/auth", Access::Public)
            .with_rule(
                "/api/v1/users",
                Access::AnyOf(&[RoleName::SuperAdmin, RoleName::Admin, RoleName::Sales]),
            )
            .with_rule("/api/v1/users/me", Access::Authenticated)
            .with_rule("/api/v1/superadmin", Access::AnyOf(&[RoleName::SuperAdmin]))
    }

    pub fn with_rule(mut self, prefix: &'static str, access: Access) -> Self {
        self.rules.push((prefix, access));
        self
    }

    /// Resolve the access requirement for a request path.
    pub fn access_for(&self, path: &str) -> &Access {
        self.rules
            .iter()
            .filter(|(prefix, _)| path_matches_prefix(path, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, access)| access)
            .unwrap_or(&self.fallback)
    }

    /// Render the allow/deny decision for a path against a context.
    pub fn authorize(
        &self,
        path: &str,
        context: &SecurityContext,
    ) -> Result<(), AuthError> {
        match self.access_for(path) {
            Access::Public => Ok(()),
            Access::Authenticated => {
                if context.is_authenticated() {
                    Ok(())
                } else {
                    Err(AuthError::NotAuthenticated)
                }
            }
            Access::AnyOf(roles) => {
                if !context.is_authenticated() {
                    Err(AuthError::NotAuthenticated)
                } else if context.has_any_role(roles) {
                    Ok(())
                } else {
                    Err(AuthError::InsufficientRole)
                }
            }
        }
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Prefix match on path-segment boundaries: `/api/v1/users` matches
/// `/api/v1/users` and `/api/v1/users/me` but not `/api/v1/users-export`.
fn path_matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Fine-grained per-operation check against the context's role snapshot.
/// Used at call sites that need a stricter requirement than their route
/// prefix carries (e.g. admin grants).
pub fn require_any_role(
    context: &SecurityContext,
    roles: &[RoleName],
) -> Result<(), AuthError> {
    if !context.is_authenticated() {
        Err(AuthError::NotAuthenticated)
    } else if context.has_any_role(roles) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::AuthenticatedPrincipal;
    use crate::domain::UserId;

    fn context_with_roles(roles: &[RoleName]) -> SecurityContext {
        SecurityContext::authenticated(AuthenticatedPrincipal::new(
            UserId::new(),
            "user@example.com".into(),
            roles.iter().copied().collect(),
        ))
    }

    #[test]
    fn public_route_allows_anonymous() {
        let policy = RoutePolicy::standard();
        assert!(policy.authorize("/api/v1/auth/login", &SecurityContext::anonymous()).is_ok());
        assert!(policy.authorize("/health", &SecurityContext::anonymous()).is_ok());
    }

    #[test]
    fn unmatched_route_requires_authentication() {
        let policy = RoutePolicy::standard();
        let err = policy.authorize("/api/v1/reports", &SecurityContext::anonymous()).unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
        assert!(policy.authorize("/api/v1/reports", &context_with_roles(&[RoleName::User])).is_ok());
    }

    #[test]
    fn admin_is_denied_where_superadmin_is_required() {
        let policy = RoutePolicy::standard();
        let err = policy
            .authorize("/api/v1/superadmin/admins", &context_with_roles(&[RoleName::Admin]))
            .unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole));

        assert!(policy
            .authorize("/api/v1/superadmin/admins", &context_with_roles(&[RoleName::SuperAdmin]))
            .is_ok());
    }

    #[test]
    fn users_prefix_accepts_any_staff_role() {
        let policy = RoutePolicy::standard();
        for role in [RoleName::SuperAdmin, RoleName::Admin, RoleName::Sales] {
            assert!(policy.authorize("/api/v1/users", &context_with_roles(&[role])).is_ok());
        }
        let err =
            policy.authorize("/api/v1/users", &context_with_roles(&[RoleName::User])).unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole));
    }

    #[test]
    fn longest_prefix_wins() {
        // /api/v1/users/me is reachable by any authenticated principal even
        // though /api/v1/users requires a staff role.
        let policy = RoutePolicy::standard();
        assert!(policy
            .authorize("/api/v1/users/me", &context_with_roles(&[RoleName::User]))
            .is_ok());
    }

    #[test]
    fn prefix_match_respects_segment_boundaries() {
        assert!(path_matches_prefix("/api/v1/users", "/api/v1/users"));
        assert!(path_matches_prefix("/api/v1/users/me", "/api/v1/users"));
        assert!(!path_matches_prefix("/api/v1/users-export", "/api/v1/users"));
    }

    #[test]
    fn deny_causes_are_distinguishable() {
        let err = require_any_role(&SecurityContext::anonymous(), &[RoleName::Admin]).unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));

        let err = require_any_role(&context_with_roles(&[RoleName::User]), &[RoleName::Admin])
            .unwrap_err();
        assert!(matches!(err, AuthError::InsufficientRole));

        assert!(require_any_role(&context_with_roles(&[RoleName::Admin]), &[RoleName::Admin])
            .is_ok());
    }
}
