//! Bounded connection pool
//!
//! Leases long-lived connections produced by a [`Manager`], keeping at most
//! `max_open` of them alive (leased plus idle) at any time.

use super::entry::IdleConnection;
use super::guard::PooledConnection;
use super::manager::Manager;
use super::stats::{PoolStats, PoolStatsSnapshot};
use crate::config::PoolConfig;
use crate::error::PoolError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Extra leases tried beyond `max_open` when preparing connections fails
pub const PREPARE_RETRY_SLACK: usize = 10;

/// Bookkeeping shared by all callers, guarded by one lock
struct PoolState<C> {
    /// Connections ready to be leased, oldest release first
    idle: VecDeque<IdleConnection<C>>,
    /// Leased plus idle connections, including slots reserved for creation
    num_open: usize,
    /// Current capacity
    max_open: usize,
    /// Set once by `shutdown`
    closed: bool,
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Leased plus idle connections
    pub num_open: usize,
    /// Idle connections
    pub idle: usize,
    /// Warm-start count
    pub min_open: usize,
    /// Current capacity
    pub max_open: usize,
    /// Whether the pool has been shut down
    pub closed: bool,
}

/// What `try_lease` decided under the lock
enum Lease<C> {
    Idle(IdleConnection<C>),
    Create,
    Wait,
}

/// Bounded pool of connections
pub struct Pool<M: Manager> {
    /// Connection factory
    manager: M,
    /// Connections created at startup
    min_open: usize,
    /// Age limit for pooled connections
    max_lifetime: Option<Duration>,
    /// Idle set, counters and closed flag
    state: Mutex<PoolState<M::Connection>>,
    /// Woken when a connection or a slot frees up, or on shutdown
    available: Notify,
    /// Lifetime counters
    stats: PoolStats,
}

impl<M: Manager> Pool<M> {
    /// Create a pool and warm it up with `min_open` connections
    ///
    /// Fails with [`PoolError::InvalidConfig`] for inconsistent limits and
    /// with [`PoolError::CreateFailed`] if any warm connection cannot be
    /// opened.
    pub async fn new(config: &PoolConfig, manager: M) -> Result<Arc<Self>, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        info!(
            "Warming up connection pool: {} connections (max {})",
            config.min_open, config.max_open
        );

        let stats = PoolStats::new();
        let mut idle = VecDeque::with_capacity(config.max_open);
        for _ in 0..config.min_open {
            match manager.create().await {
                Ok(conn) => {
                    stats.record_created();
                    idle.push_back(IdleConnection::new(conn));
                }
                Err(e) => {
                    warn!("Failed to pre-create connection: {}", e);
                    for entry in idle {
                        manager.destroy(entry.conn);
                    }
                    return Err(PoolError::CreateFailed(Box::new(e)));
                }
            }
        }

        let pool = Arc::new(Pool {
            manager,
            min_open: config.min_open,
            max_lifetime: config.max_lifetime(),
            state: Mutex::new(PoolState {
                idle,
                num_open: config.min_open,
                max_open: config.max_open,
                closed: false,
            }),
            available: Notify::new(),
            stats,
        });

        info!("Connection pool warmed up");
        Ok(pool)
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState<M::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lease a prepared connection
    ///
    /// Waits while the pool is at capacity. Each leased connection goes
    /// through [`Manager::prepare`]; one that fails is destroyed and another
    /// is leased, for at most `max_open + PREPARE_RETRY_SLACK` attempts.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection<M>, PoolError> {
        let max_attempts = self.lock_state().max_open + PREPARE_RETRY_SLACK;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut conn = self.lease().await?;

            match self.manager.prepare(&mut *conn).await {
                Ok(()) => {
                    self.stats.record_acquired();
                    return Ok(conn);
                }
                Err(e) => {
                    self.stats.record_prepare_failure();
                    conn.close();
                    if attempt >= max_attempts {
                        warn!(
                            "Giving up after {} failed connection preparations: {}",
                            attempt, e
                        );
                        return Err(PoolError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                    warn!(
                        "Failed to prepare pooled connection (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                }
            }
        }
    }

    /// Lease a raw connection: idle first, then a new one, else wait
    async fn lease(self: &Arc<Self>) -> Result<PooledConnection<M>, PoolError> {
        loop {
            // Register interest before looking at the state so a release
            // between the check and the await is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_lease()? {
                Lease::Idle(entry) => {
                    let (conn, created_at) = entry.into_parts();
                    return Ok(PooledConnection::new(conn, created_at, self.clone()));
                }
                Lease::Create => return self.create_leased().await,
                Lease::Wait => debug!("Pool exhausted, waiting for a connection"),
            }

            notified.await;
        }
    }

    fn try_lease(&self) -> Result<Lease<M::Connection>, PoolError> {
        let (lease, expired) = {
            let mut state = self.lock_state();
            if state.closed {
                return Err(PoolError::Closed);
            }

            let expired = self.take_expired(&mut state);
            let lease = if let Some(entry) = state.idle.pop_front() {
                Lease::Idle(entry)
            } else if state.num_open < state.max_open {
                state.num_open += 1;
                Lease::Create
            } else {
                Lease::Wait
            };
            (lease, expired)
        };

        if !expired.is_empty() {
            let count = expired.len();
            debug!("Discarding {} expired idle connections", count);
            self.stats.record_expired(count);
            self.stats.record_destroyed(count);
            for conn in expired {
                self.manager.destroy(conn);
            }
            self.available.notify_waiters();
        }

        Ok(lease)
    }

    /// Remove idle connections older than `max_lifetime`
    fn take_expired(&self, state: &mut PoolState<M::Connection>) -> Vec<M::Connection> {
        if self.max_lifetime.is_none() {
            return Vec::new();
        }

        let (fresh, stale): (VecDeque<_>, VecDeque<_>) = state
            .idle
            .drain(..)
            .partition(|entry| !entry.is_expired(self.max_lifetime));
        state.idle = fresh;
        state.num_open -= stale.len();
        stale.into_iter().map(|entry| entry.conn).collect()
    }

    /// Open a connection for a slot reserved by `try_lease`
    async fn create_leased(self: &Arc<Self>) -> Result<PooledConnection<M>, PoolError> {
        let reservation = SlotReservation {
            pool: self.as_ref(),
            armed: true,
        };

        let conn = self.manager.create().await.map_err(|e| {
            warn!("Failed to create connection on demand: {}", e);
            PoolError::CreateFailed(Box::new(e))
        })?;
        self.stats.record_created();

        let closed = self.lock_state().closed;
        if closed {
            drop(reservation);
            self.stats.record_destroyed(1);
            self.manager.destroy(conn);
            return Err(PoolError::Closed);
        }

        reservation.disarm();
        debug!("Created new pooled connection");
        Ok(PooledConnection::new(conn, Instant::now(), self.clone()))
    }

    /// Return a leased connection to the idle set, or destroy it
    ///
    /// Destroys instead of pooling when the pool is closed, when capacity has
    /// shrunk below the open count, or when the connection is too old.
    pub(crate) fn release(&self, conn: M::Connection, created_at: Instant) {
        let entry = IdleConnection::with_created_at(conn, created_at);
        let expired = entry.is_expired(self.max_lifetime);

        let surplus = {
            let mut state = self.lock_state();
            if state.closed || expired || state.num_open > state.max_open {
                state.num_open = state.num_open.saturating_sub(1);
                Some(entry)
            } else {
                state.idle.push_back(entry);
                None
            }
        };

        match surplus {
            Some(entry) => {
                if expired {
                    self.stats.record_expired(1);
                }
                self.stats.record_destroyed(1);
                debug!("Destroying released connection");
                self.manager.destroy(entry.conn);
            }
            None => self.stats.record_released(),
        }

        self.available.notify_one();
    }

    /// Destroy a leased connection regardless of pool state
    pub(crate) fn close(&self, conn: M::Connection) {
        {
            let mut state = self.lock_state();
            state.num_open = state.num_open.saturating_sub(1);
        }

        self.stats.record_destroyed(1);
        self.manager.destroy(conn);
        self.available.notify_one();
    }

    /// Shut the pool down
    ///
    /// Destroys every idle connection and fails all current and future
    /// acquires with [`PoolError::Closed`]. Leased connections are destroyed
    /// as they come back. A second call returns [`PoolError::Closed`].
    pub fn shutdown(&self) -> Result<(), PoolError> {
        let drained: Vec<_> = {
            let mut state = self.lock_state();
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.closed = true;
            let drained: Vec<_> = state.idle.drain(..).map(|entry| entry.conn).collect();
            state.num_open -= drained.len();
            drained
        };

        let count = drained.len();
        for conn in drained {
            self.manager.destroy(conn);
        }
        self.stats.record_destroyed(count);
        self.available.notify_waiters();

        info!(
            "Connection pool shut down, {} idle connections closed",
            count
        );
        self.stats.log();
        Ok(())
    }

    /// Change the capacity
    ///
    /// Shrinking destroys surplus idle connections now and surplus leased
    /// ones when they are released.
    pub fn set_max_open(&self, max_open: usize) -> Result<(), PoolError> {
        if max_open == 0 || max_open < self.min_open {
            return Err(PoolError::InvalidConfig(format!(
                "max_open must be at least max(1, min_open = {})",
                self.min_open
            )));
        }

        let surplus = {
            let mut state = self.lock_state();
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.max_open = max_open;

            let mut surplus = Vec::new();
            while state.num_open > state.max_open {
                match state.idle.pop_front() {
                    Some(entry) => {
                        surplus.push(entry.conn);
                        state.num_open -= 1;
                    }
                    None => break,
                }
            }
            surplus
        };

        info!("Pool capacity set to {}", max_open);
        self.stats.record_destroyed(surplus.len());
        for conn in surplus {
            self.manager.destroy(conn);
        }
        self.available.notify_waiters();
        Ok(())
    }

    /// Current occupancy
    pub fn status(&self) -> PoolStatus {
        let state = self.lock_state();
        PoolStatus {
            num_open: state.num_open,
            idle: state.idle.len(),
            min_open: self.min_open,
            max_open: state.max_open,
            closed: state.closed,
        }
    }

    /// Check if the pool has been shut down
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// The connection factory
    pub fn manager(&self) -> &M {
        &self.manager
    }
}

impl<M: Manager> Drop for Pool<M> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in state.idle.drain(..) {
            self.manager.destroy(entry.conn);
        }
    }
}

/// A creation slot counted in `num_open` before the connection exists
///
/// Dropping it while armed gives the slot back, so a failed or cancelled
/// creation never leaks capacity.
struct SlotReservation<'a, M: Manager> {
    pool: &'a Pool<M>,
    armed: bool,
}

impl<M: Manager> SlotReservation<'_, M> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<M: Manager> Drop for SlotReservation<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            {
                let mut state = self.pool.lock_state();
                state.num_open = state.num_open.saturating_sub(1);
            }
            self.pool.available.notify_one();
        }
    }
}
