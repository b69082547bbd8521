//! Principal store abstraction and the in-memory reference implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::auth::models::{NewPrincipal, Principal, RoleName};
use crate::domain::UserId;
use crate::errors::{Error, Result};

/// Narrow interface to the principal store. Lookup is by email (the token
/// subject) and by id; role membership is read fresh from here whenever the
/// gate is configured for per-request role lookup.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Load a principal and its stored credential hash by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<(Principal, String)>>;

    /// Load a principal by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Principal>>;

    /// Whether a principal with this email exists.
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Persist a new principal. Fails with a conflict if the email is taken.
    async fn create(&self, new_user: NewPrincipal) -> Result<Principal>;

    /// Replace a principal's role set.
    async fn update_roles(&self, id: &UserId, roles: HashSet<RoleName>) -> Result<Principal>;

    /// List principals ordered by creation time.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Principal>>;

    /// Number of stored principals.
    async fn count(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct StoredUser {
    principal: Principal,
    password_hash: String,
}

/// In-memory principal store for local runs and tests. Interior
/// synchronization via `DashMap`; a secondary index maps email to id.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, StoredUser>,
    by_email: DashMap<String, String>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for wiring into `Arc<dyn UserRepository>`.
    pub fn shared() -> Arc<dyn UserRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<(Principal, String)>> {
        let Some(id) = self.by_email.get(email).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&id)
            .map(|entry| (entry.principal.clone(), entry.password_hash.clone())))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<Principal>> {
        Ok(self.users.get(id.as_str()).map(|entry| entry.principal.clone()))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(self.by_email.contains_key(email))
    }

    async fn create(&self, new_user: NewPrincipal) -> Result<Principal> {
        if self.by_email.contains_key(&new_user.email) {
            return Err(Error::conflict(format!(
                "User already exists with email {}",
                new_user.email
            )));
        }

        let now = Utc::now();
        let principal = Principal {
            id: UserId::new(),
            email: new_user.email.clone(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            enabled: new_user.enabled,
            roles: new_user.roles,
            created_at: now,
            updated_at: now,
        };

        self.by_email.insert(new_user.email, principal.id.as_str().to_string());
        self.users.insert(
            principal.id.as_str().to_string(),
            StoredUser { principal: principal.clone(), password_hash: new_user.password_hash },
        );

        Ok(principal)
    }

    async fn update_roles(&self, id: &UserId, roles: HashSet<RoleName>) -> Result<Principal> {
        let mut entry = self
            .users
            .get_mut(id.as_str())
            .ok_or_else(|| Error::not_found(format!("User not found with id {}", id)))?;

        entry.principal.roles = roles;
        entry.principal.updated_at = Utc::now();
        Ok(entry.principal.clone())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Principal>> {
        let mut principals: Vec<Principal> =
            self.users.iter().map(|entry| entry.principal.clone()).collect();
        principals.sort_by(|a, b| {
            a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email))
        });
        Ok(principals.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.users.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewPrincipal {
        NewPrincipal {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            enabled: true,
            roles: [RoleName::User].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("alice@example.com")).await.unwrap();

        let (found, hash) = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(hash, "$argon2id$stub");

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice@example.com")).await.unwrap();

        let err = repo.create(new_user("alice@example.com")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("alice@example.com")).await.unwrap();
        assert!(repo.find_by_email("Alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_roles_replaces_the_set() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("alice@example.com")).await.unwrap();

        let updated = repo
            .update_roles(&created.id, [RoleName::User, RoleName::Admin].into_iter().collect())
            .await
            .unwrap();
        assert!(updated.has_role(RoleName::Admin));
        assert!(updated.updated_at >= created.updated_at);

        let missing = repo
            .update_roles(&UserId::new(), [RoleName::User].into_iter().collect())
            .await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound(_)));
    }

    #[tokio::test]
    async fn list_pages_in_creation_order() {
        let repo = InMemoryUserRepository::new();
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            repo.create(new_user(email)).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);
        let page = repo.list(2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
    }
}
