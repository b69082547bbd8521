//! Data models for principals, roles and the request security context.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::UserId;
use crate::errors::Error;

/// Closed role enumeration. Role names are globally unique by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RoleName {
    #[serde(rename = "SUPERADMIN")]
    SuperAdmin,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "SALES")]
    Sales,
    #[serde(rename = "USER")]
    User,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "SUPERADMIN",
            RoleName::Admin => "ADMIN",
            RoleName::Sales => "SALES",
            RoleName::User => "USER",
        }
    }

    /// Stable numeric identity for the role record.
    pub fn id(&self) -> i64 {
        match self {
            RoleName::SuperAdmin => 1,
            RoleName::Admin => 2,
            RoleName::Sales => 3,
            RoleName::User => 4,
        }
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUPERADMIN" => Ok(RoleName::SuperAdmin),
            "ADMIN" => Ok(RoleName::Admin),
            "SALES" => Ok(RoleName::Sales),
            "USER" => Ok(RoleName::User),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Error returned when role name parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid role name: {0}")]
pub struct RoleParseError(pub String);

/// A role record: stable id plus its name from the closed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: RoleName,
}

impl Role {
    pub fn new(name: RoleName) -> Self {
        Self { id: name.id(), name }
    }
}

/// Stored representation of a user principal. The credential hash is kept
/// out of this type and travels separately through the repository API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    /// Unique, case-sensitive subject; an email address.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    pub roles: HashSet<RoleName>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// New principal payload handed to the store.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: HashSet<RoleName>,
}

/// The authenticated identity carried by a [`SecurityContext`]: subject,
/// user id and an immutable role snapshot captured once by the gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub user_id: UserId,
    pub subject: String,
    roles: HashSet<RoleName>,
}

impl AuthenticatedPrincipal {
    pub fn new(user_id: UserId, subject: String, roles: HashSet<RoleName>) -> Self {
        Self { user_id, subject, roles }
    }

    /// Snapshot a principal loaded from the store.
    pub fn from_principal(principal: &Principal) -> Self {
        Self::new(principal.id.clone(), principal.email.clone(), principal.roles.clone())
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[RoleName]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleName> {
        self.roles.iter()
    }
}

/// Request-scoped security context. Created once per request by the
/// authentication gate and dropped with the request; never shared across
/// requests or stashed in globals.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<AuthenticatedPrincipal>,
}

impl SecurityContext {
    /// An empty context for an unauthenticated request.
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    /// A context carrying a validated principal.
    pub fn authenticated(principal: AuthenticatedPrincipal) -> Self {
        Self { principal: Some(principal) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        self.principal.as_ref()
    }

    pub fn has_any_role(&self, roles: &[RoleName]) -> bool {
        self.principal.as_ref().is_some_and(|principal| principal.has_any_role(roles))
    }
}

/// Errors returned by the authentication and authorization stack.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: malformed token")]
    TokenMalformed,
    #[error("unauthorized: token signature invalid")]
    TokenSignatureInvalid,
    #[error("unauthorized: token expired")]
    TokenExpired,
    #[error("unauthorized: token subject mismatch")]
    SubjectMismatch,
    #[error("unauthorized: principal not found")]
    PrincipalNotFound,
    #[error("unauthorized: invalid email or password")]
    InvalidCredentials,
    #[error("unauthorized: authentication required")]
    NotAuthenticated,
    #[error("forbidden: insufficient role")]
    InsufficientRole,
    #[error(transparent)]
    Storage(#[from] Error),
}
