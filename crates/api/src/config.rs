//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use gatehouse_auth::permissions::admin_group;
use gatehouse_auth::token::DEFAULT_TOKEN_VALIDITY_HOURS;
use gatehouse_core::GroupName;

/// Secret used when `JWT_SECRET` is unset. Never suitable outside development.
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    /// Listener for `/auth/createadmin`; keep it on loopback.
    pub admin_bind_addr: SocketAddr,
    pub token_validity: Duration,
    pub super_group: GroupName,
    pub log_file: Option<PathBuf>,
}

impl ApiConfig {
    /// Defaults for everything except the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            admin_bind_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            token_validity: Duration::hours(DEFAULT_TOKEN_VALIDITY_HOURS),
            super_group: admin_group(),
            log_file: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let mut config = Self::new(jwt_secret);

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = parse_addr("BIND_ADDR", &addr)?;
        }
        if let Some(addr) = lookup("ADMIN_BIND_ADDR") {
            config.admin_bind_addr = parse_addr("ADMIN_BIND_ADDR", &addr)?;
        }
        if let Some(hours) = lookup("TOKEN_TTL_HOURS") {
            let hours: i64 = hours.parse().map_err(|e| invalid("TOKEN_TTL_HOURS", e))?;
            if hours <= 0 {
                return Err(invalid("TOKEN_TTL_HOURS", "must be positive"));
            }
            config.token_validity = Duration::hours(hours);
        }
        if let Some(group) = lookup("SUPER_GROUP") {
            config.super_group = GroupName::new(group).map_err(|e| invalid("SUPER_GROUP", e))?;
        }
        config.log_file = lookup("LOG_FILE").filter(|p| !p.is_empty()).map(PathBuf::from);

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_addr(var: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|e| invalid(var, e))
}

fn invalid(var: &'static str, err: impl core::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        var,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();

        assert!(config.uses_dev_secret());
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.admin_bind_addr.to_string(), "127.0.0.1:8081");
        assert_eq!(config.token_validity, Duration::hours(24));
        assert_eq!(config.super_group.as_str(), "admin");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("TOKEN_TTL_HOURS", "2"),
            ("SUPER_GROUP", "root"),
            ("LOG_FILE", "/tmp/gatehouse.log"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.token_validity, Duration::hours(2));
        assert_eq!(config.super_group.as_str(), "root");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/gatehouse.log")));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(ApiConfig::from_lookup(lookup(&[("BIND_ADDR", "nope")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("TOKEN_TTL_HOURS", "0")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("SUPER_GROUP", " padded")])).is_err());
    }
}
