//! Directory service configuration
//!
//! Connection target, service account and search settings for LDAP.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default attribute matched against the SOCKS5 username
fn default_identifier_attribute() -> String {
    "uid".to_string()
}

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Default timeout for one lookup-and-bind in seconds
fn default_request_timeout() -> u64 {
    30
}

/// LDAP configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LdapConfig {
    /// Server URL (e.g., "ldap://ldap.example.com:389")
    pub url: String,

    /// Base DN for user searches
    pub base_dn: String,

    /// Service account DN used for searches
    pub bind_dn: String,

    /// Service account password
    pub bind_password: String,

    /// Attribute holding the login name
    #[serde(default = "default_identifier_attribute")]
    pub identifier_attribute: String,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Timeout for acquiring, searching and binding in seconds (0 disables)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl LdapConfig {
    /// Create a configuration with default search settings
    pub fn new(url: &str, base_dn: &str, bind_dn: &str, bind_password: &str) -> Self {
        LdapConfig {
            url: url.to_string(),
            base_dn: base_dn.to_string(),
            bind_dn: bind_dn.to_string(),
            bind_password: bind_password.to_string(),
            identifier_attribute: default_identifier_attribute(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }

    /// Validate the LDAP configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.url).map_err(|e| format!("Invalid LDAP url: {}", e))?;
        match url.scheme() {
            "ldap" | "ldaps" | "ldapi" => {}
            other => return Err(format!("Unsupported LDAP url scheme: {}", other)),
        }
        if self.base_dn.is_empty() {
            return Err("base_dn must not be empty".to_string());
        }
        if self.identifier_attribute.is_empty() {
            return Err("identifier_attribute must not be empty".to_string());
        }
        Ok(())
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Request timeout, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
