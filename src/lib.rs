//! # Tollgate
//!
//! Tollgate is a multi-tenant authentication backend built around a
//! stateless bearer-token scheme: it issues, verifies and refreshes
//! HMAC-signed JWTs, gates every inbound request through an authentication
//! check, and enforces per-route and per-operation role policies.
//!
//! ## Architecture
//!
//! The system follows a layered architecture pattern:
//!
//! ```text
//! REST API Layer → Authentication Gate → Access Policy Engine → Handlers
//!      ↓                   ↓                      ↓
//! Error Mapping      Token Service         Principal Store
//! ```
//!
//! ## Core Components
//!
//! - **Token Service**: issues and validates access/refresh JWTs under a
//!   single symmetric key
//! - **Authentication Gate**: per-request middleware that resolves a bearer
//!   token into a request-scoped security context
//! - **Access Policy Engine**: static route-prefix policy plus per-operation
//!   role checks with distinguishable deny causes
//! - **Principal Store**: narrow repository interface; durable persistence
//!   is an external collaborator
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tollgate::{api, storage::InMemoryUserRepository, Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let users = InMemoryUserRepository::shared();
//!     let state = api::ApiState::new(&config, users);
//!     let router = api::build_router(&config, state);
//!     api::start_api_server(config.api.clone(), router).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use config::Config;
pub use errors::{Error, Result};
pub use observability::init_tracing;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
