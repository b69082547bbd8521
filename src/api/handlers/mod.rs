//! HTTP handlers for the Tollgate API.

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

pub use admin::{grant_admin_handler, revoke_admin_handler};
pub use auth::{login_handler, refresh_handler, register_handler};
pub use health::health_handler;
pub use users::{list_users_handler, me_handler};
