//! # Configuration Management
//!
//! Environment-sourced configuration for the Tollgate backend: API server
//! binding, token signing parameters, and observability settings.

mod settings;

pub use settings::{ApiServerConfig, AuthConfig, Config, ObservabilityConfig, RoleSource};
