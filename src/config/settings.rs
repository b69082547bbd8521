//! # Configuration Settings
//!
//! Defines the configuration structure for the Tollgate backend.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct Config {
    /// HTTP API server configuration
    #[validate(nested)]
    pub api: ApiServerConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            api: ApiServerConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            observability: ObservabilityConfig::from_env(),
        };
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(Error::validation("JWT secret must be at least 32 characters long"));
        }

        if self.auth.refresh_ttl_seconds <= self.auth.access_ttl_seconds {
            return Err(Error::validation(
                "Refresh token TTL must be strictly greater than access token TTL",
            ));
        }

        Ok(())
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Bind address cannot be empty"))]
    pub bind_address: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 8080 }
    }
}

impl ApiServerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_address =
            std::env::var("TOLLGATE_API_BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("TOLLGATE_API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| Error::config(format!("Invalid API port: {}", e)))?;

        Ok(Self { bind_address, port })
    }
}

/// Where the authentication gate sources role membership from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoleSource {
    /// Re-fetch roles from the principal store on every authenticated
    /// request. Grants and revocations take effect immediately at the cost
    /// of one store lookup per request.
    #[default]
    Store,
    /// Read roles from the access token's claims. No store round trip;
    /// role changes are invisible until the token expires.
    Claims,
}

impl FromStr for RoleSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "store" => Ok(RoleSource::Store),
            "claims" => Ok(RoleSource::Claims),
            other => Err(Error::config(format!("Invalid role source: {}", other))),
        }
    }
}

/// Authentication and authorization configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Symmetric secret used to sign and verify JWTs
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// Access token TTL in seconds
    #[validate(range(
        min = 60,
        max = 86400,
        message = "Access token TTL must be between 1 minute and 24 hours"
    ))]
    pub access_ttl_seconds: u64,

    /// Refresh token TTL in seconds; must exceed the access TTL
    #[validate(range(
        min = 120,
        max = 2592000,
        message = "Refresh token TTL must be between 2 minutes and 30 days"
    ))]
    pub refresh_ttl_seconds: u64,

    /// Role membership source for the authentication gate
    pub role_source: RoleSource,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "tollgate-default-secret-please-change-in-production".to_string(),
            access_ttl_seconds: 3600,     // 1 hour
            refresh_ttl_seconds: 604_800, // 7 days
            role_source: RoleSource::Store,
        }
    }
}

impl AuthConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let jwt_secret =
            std::env::var("TOLLGATE_JWT_SECRET").unwrap_or_else(|_| defaults.jwt_secret.clone());
        let access_ttl_seconds = env_u64("TOLLGATE_ACCESS_TTL_SECS", defaults.access_ttl_seconds)?;
        let refresh_ttl_seconds =
            env_u64("TOLLGATE_REFRESH_TTL_SECS", defaults.refresh_ttl_seconds)?;
        let role_source = match std::env::var("TOLLGATE_ROLE_SOURCE") {
            Ok(value) => value.parse()?,
            Err(_) => RoleSource::Store,
        };

        Ok(Self { jwt_secret, access_ttl_seconds, refresh_ttl_seconds, role_source })
    }

    /// Get access token TTL as Duration
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_seconds)
    }

    /// Get refresh token TTL as Duration
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_seconds)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (e.g. "info", "tollgate=debug")
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable text
    pub json_logging: bool,

    /// Enable the Prometheus metrics exporter
    pub enable_metrics: bool,

    /// Metrics exporter port (0 disables the exporter)
    pub metrics_port: u16,

    /// Service name attached to exported metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "tollgate".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("TOLLGATE_LOG_LEVEL")
                .unwrap_or_else(|_| defaults.log_level.clone()),
            json_logging: env_bool("TOLLGATE_JSON_LOGGING", defaults.json_logging),
            enable_metrics: env_bool("TOLLGATE_ENABLE_METRICS", defaults.enable_metrics),
            metrics_port: std::env::var("TOLLGATE_METRICS_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.metrics_port),
            service_name: defaults.service_name,
        }
    }

    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => {
            value.parse().map_err(|e| Error::config(format!("Invalid {}: {}", name, e)))
        }
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map(|value| value == "1" || value.eq_ignore_ascii_case("true")).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut config = Config::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn refresh_ttl_must_exceed_access_ttl() {
        let mut config = Config::default();
        config.auth.access_ttl_seconds = 3600;
        config.auth.refresh_ttl_seconds = 3600;
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn role_source_parses_known_values() {
        assert_eq!("store".parse::<RoleSource>().unwrap(), RoleSource::Store);
        assert_eq!("CLAIMS".parse::<RoleSource>().unwrap(), RoleSource::Claims);
        assert!("database".parse::<RoleSource>().is_err());
    }

    #[test]
    fn auth_config_ttl_accessors() {
        let config = AuthConfig { access_ttl_seconds: 7200, ..Default::default() };
        assert_eq!(config.access_ttl(), Duration::from_secs(7200));
    }

    #[test]
    fn metrics_bind_address_respects_zero_port() {
        let config = ObservabilityConfig { metrics_port: 0, ..Default::default() };
        assert_eq!(config.metrics_bind_address(), None);

        let config = ObservabilityConfig { metrics_port: 9100, ..Default::default() };
        assert_eq!(config.metrics_bind_address(), Some("0.0.0.0:9100".to_string()));
    }
}
