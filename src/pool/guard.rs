//! RAII guard for leased connections
//!
//! Provides automatic return of connections to the pool when dropped.

use super::bounded::Pool;
use super::manager::Manager;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

/// A connection leased from a [`Pool`]
///
/// The connection goes back to the pool when the guard is dropped, so every
/// exit path (including errors and cancelled futures) ends the lease exactly
/// once. Use [`close`](Self::close) for a connection known to be broken.
pub struct PooledConnection<M: Manager> {
    /// The connection (Option to allow taking)
    conn: Option<M::Connection>,
    /// When the connection was created
    created_at: Instant,
    /// Pool the connection belongs to
    pool: Arc<Pool<M>>,
}

impl<M: Manager> PooledConnection<M> {
    pub(crate) fn new(conn: M::Connection, created_at: Instant, pool: Arc<Pool<M>>) -> Self {
        PooledConnection {
            conn: Some(conn),
            created_at,
            pool,
        }
    }

    /// Return the connection to the pool
    pub fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.created_at);
        }
    }

    /// Destroy the connection instead of returning it
    pub fn close(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.close(conn);
        }
    }

    /// When the underlying connection was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl<M: Manager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("Connection already returned")
    }
}

impl<M: Manager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("Connection already returned")
    }
}

impl<M: Manager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.created_at);
        }
    }
}

impl<M: Manager> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
