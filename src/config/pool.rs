//! Connection pool configuration
//!
//! Defines limits for the directory connection pool.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of warm connections
fn default_min_open() -> usize {
    5
}

/// Default maximum number of connections
fn default_max_open() -> usize {
    15
}

/// Default connection lifetime in seconds
fn default_max_lifetime() -> u64 {
    60
}

/// Connection pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PoolConfig {
    /// Connections created at startup
    #[serde(default = "default_min_open")]
    pub min_open: usize,

    /// Hard cap on leased plus idle connections
    #[serde(default = "default_max_open")]
    pub max_open: usize,

    /// Maximum age of a pooled connection in seconds (0 disables)
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            min_open: default_min_open(),
            max_open: default_max_open(),
            max_lifetime: default_max_lifetime(),
        }
    }
}

impl PoolConfig {
    /// Validate the pool configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_open == 0 {
            return Err("max_open must be greater than 0".to_string());
        }
        if self.min_open > self.max_open {
            return Err("min_open cannot be greater than max_open".to_string());
        }
        Ok(())
    }

    /// Lifetime limit, `None` when disabled
    pub fn max_lifetime(&self) -> Option<Duration> {
        match self.max_lifetime {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
