//! Configuration module for Sockldap
//!
//! This module provides configuration types and parsing for the
//! authenticator, the directory client and the connection pool.

mod auth;
mod ldap;
mod pool;

pub use auth::AuthConfig;
pub use ldap::LdapConfig;
pub use pool::PoolConfig;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Authenticator selection
    #[serde(default)]
    pub auth: AuthConfig,

    /// Directory service settings, required for `method = "ldap"`
    #[serde(default)]
    pub ldap: Option<LdapConfig>,

    /// Directory connection pool
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Config {
    /// Validate the whole configuration
    pub fn validate(&self) -> Result<(), String> {
        self.auth.validate()?;
        if self.auth == AuthConfig::Ldap {
            let ldap = self
                .ldap
                .as_ref()
                .ok_or_else(|| "LDAP authentication requires an [ldap] section".to_string())?;
            ldap.validate()?;
            self.pool.validate()?;
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}
