//! Connection factory used by the pool
//!
//! A `Manager` knows how to open, prepare and tear down one kind of
//! connection. The pool only does the bookkeeping.

use async_trait::async_trait;

/// Creates and disposes of pooled connections
#[async_trait]
pub trait Manager: Send + Sync + 'static {
    /// Connection type handed out by the pool
    type Connection: Send + 'static;

    /// Error produced while creating or preparing a connection
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection
    async fn create(&self) -> Result<Self::Connection, Self::Error>;

    /// Make a connection ready for a new lease
    ///
    /// Runs on every acquire, for fresh and idle connections alike. A failure
    /// destroys the connection and the pool tries another one.
    async fn prepare(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Dispose of a connection that leaves the pool for good
    ///
    /// Called without the pool lock held; must not block.
    fn destroy(&self, conn: Self::Connection) {
        drop(conn);
    }
}
