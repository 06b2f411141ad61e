//! Directory-backed username/password authentication
//!
//! Reads the client's credentials, resolves the username to a DN with a
//! pooled service-account connection, verifies the password by binding as
//! that DN, and answers on the same stream.

use super::consts::{AUTH_FAILURE, AUTH_SUCCESS};
use super::wire::{read_credentials, send_auth_result, Credentials};
use super::AuthOutcome;
use crate::directory::{DirectoryClient, DirectoryConnection};
use crate::error::{AuthError, DirectoryError};
use crate::pool::{Manager, Pool, PooledConnection};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Authenticator that verifies credentials against a directory
pub struct DirectoryAuthenticator<M: Manager> {
    pool: Arc<Pool<M>>,
    client: DirectoryClient,
    request_timeout: Option<Duration>,
}

impl<M: Manager> DirectoryAuthenticator<M>
where
    M::Connection: DirectoryConnection,
{
    /// Create an authenticator leasing connections from `pool`
    pub fn new(pool: Arc<Pool<M>>, client: DirectoryClient) -> Self {
        DirectoryAuthenticator {
            pool,
            client,
            request_timeout: None,
        }
    }

    /// Bound the lookup and bind of one attempt
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The connection pool
    pub fn pool(&self) -> &Arc<Pool<M>> {
        &self.pool
    }

    /// Run the subnegotiation on `stream`
    ///
    /// Credential and lookup failures are answered with a failure status
    /// before the error is returned. Framing, pool, bind-side directory and
    /// timeout errors are returned without a response; the caller should drop
    /// the connection.
    pub async fn authenticate<S>(&self, stream: &mut S) -> Result<AuthOutcome, AuthError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let creds = read_credentials(stream).await?;

        match self.verify(&creds).await {
            Ok(()) => {
                send_auth_result(stream, AUTH_SUCCESS).await?;
                info!("User {} authenticated", creds.username);
                Ok(AuthOutcome::user(creds.username))
            }
            Err(e) if e.is_auth_failure() => {
                send_auth_result(stream, AUTH_FAILURE).await?;
                info!("Authentication failed: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Authentication of {} aborted: {}", creds.username, e);
                Err(e)
            }
        }
    }

    /// Look up the user and check the password
    ///
    /// Acquire, search and bind share one `request_timeout` deadline. The
    /// leased connection is returned to the pool before this returns, except
    /// after a transport error or a timeout, when it is destroyed instead.
    pub async fn verify(&self, creds: &Credentials) -> Result<(), AuthError> {
        let deadline = self.request_timeout.map(|limit| (Instant::now() + limit, limit));

        let mut conn = within(deadline, self.pool.acquire()).await??;

        let searched = within(deadline, self.client.search(&mut *conn, &creds.username)).await;
        let found = match searched {
            Ok(found) => found,
            Err(timeout) => {
                conn.close();
                return Err(timeout);
            }
        };

        let entry = match found {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                conn.release();
                debug!("Cannot find user: {}", creds.username);
                return Err(AuthError::NotFound(creds.username.clone()));
            }
            Err(e) => {
                warn!("Lookup of {} failed: {}", creds.username, e);
                end_lease(conn, &e);
                return Err(AuthError::LookupFailed {
                    username: creds.username.clone(),
                    source: e,
                });
            }
        };

        let checked = within(
            deadline,
            self.client.bind(&mut *conn, &entry.dn, &creds.password),
        )
        .await;
        let bound = match checked {
            Ok(bound) => bound,
            Err(timeout) => {
                conn.close();
                return Err(timeout);
            }
        };

        match bound {
            Ok(()) => {
                conn.release();
                Ok(())
            }
            Err(e) if e.is_credential_failure() => {
                conn.release();
                debug!("Password for {} is invalid: {}", creds.username, e);
                Err(AuthError::BindFailed(creds.username.clone()))
            }
            Err(e) => {
                end_lease(conn, &e);
                Err(e.into())
            }
        }
    }
}

/// Run `fut` until the shared deadline, if any
async fn within<F>(deadline: Option<(Instant, Duration)>, fut: F) -> Result<F::Output, AuthError>
where
    F: Future,
{
    match deadline {
        Some((at, limit)) => timeout_at(at, fut)
            .await
            .map_err(|_| AuthError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

/// Return a connection after a failed directory operation
fn end_lease<M: Manager>(conn: PooledConnection<M>, err: &DirectoryError) {
    match err {
        DirectoryError::Ldap(_) => conn.close(),
        _ => conn.release(),
    }
}
