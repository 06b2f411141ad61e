//! Idle connection entry
//!
//! A connection parked in the pool together with its creation time.

use std::time::{Duration, Instant};

/// A pooled connection with metadata
#[derive(Debug)]
pub struct IdleConnection<C> {
    /// The underlying connection
    pub(crate) conn: C,
    /// When the connection was created
    pub(crate) created_at: Instant,
}

impl<C> IdleConnection<C> {
    /// Wrap a freshly created connection
    pub fn new(conn: C) -> Self {
        Self::with_created_at(conn, Instant::now())
    }

    /// Wrap a connection that was created earlier
    pub fn with_created_at(conn: C, created_at: Instant) -> Self {
        IdleConnection { conn, created_at }
    }

    /// Get the age of the connection
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Check whether the connection outlived `max_lifetime`
    pub fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        max_lifetime.is_some_and(|limit| self.age() > limit)
    }

    /// Split into the connection and its creation time
    pub fn into_parts(self) -> (C, Instant) {
        (self.conn, self.created_at)
    }
}
