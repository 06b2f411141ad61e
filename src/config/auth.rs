//! Authentication strategy configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which authenticator the proxy runs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Accept every client
    #[default]
    None,
    /// Fixed username/password table
    Static {
        /// Username to password
        #[serde(default)]
        users: HashMap<String, String>,
    },
    /// Verify against the `[ldap]` directory
    Ldap,
}

impl AuthConfig {
    /// Validate the authentication settings
    pub fn validate(&self) -> Result<(), String> {
        if let AuthConfig::Static { users } = self {
            if users.is_empty() {
                return Err("Static authentication requires at least one user".to_string());
            }
            if users.keys().any(|u| u.is_empty() || u.len() > 255) {
                return Err("Usernames must be 1 to 255 bytes".to_string());
            }
            if users.values().any(|p| p.len() > 255) {
                return Err("Passwords must be at most 255 bytes".to_string());
            }
        }
        Ok(())
    }
}
