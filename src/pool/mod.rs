//! Connection pool module for Sockldap
//!
//! This module provides a generic bounded pool that leases long-lived
//! connections to a backing service, with a warm-start minimum and a hard
//! maximum. Connections are created by a [`Manager`] and handed out inside a
//! [`PooledConnection`] guard that returns them on drop.

mod bounded;
mod entry;
mod guard;
mod manager;
mod stats;

pub use bounded::{Pool, PoolStatus, PREPARE_RETRY_SLACK};
pub use guard::PooledConnection;
pub use manager::Manager;
pub use stats::{PoolStats, PoolStatsSnapshot};

use crate::config::PoolConfig;
use crate::error::PoolError;
use std::sync::Arc;

/// Create a connection pool with the given configuration
pub async fn create_pool<M: Manager>(
    config: &PoolConfig,
    manager: M,
) -> Result<Arc<Pool<M>>, PoolError> {
    Pool::new(config, manager).await
}
