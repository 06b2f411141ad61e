//! Static username/password authentication
//!
//! Checks RFC 1929 credentials against a table fixed at startup.

use super::consts::{AUTH_FAILURE, AUTH_SUCCESS};
use super::wire::{read_credentials, send_auth_result};
use super::AuthOutcome;
use crate::error::AuthError;
use std::collections::HashMap;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Username/password table authenticator
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    /// Create an authenticator from a username to password map
    pub fn new(users: HashMap<String, String>) -> Self {
        StaticCredentials { users }
    }

    /// Check a username/password pair
    pub fn valid(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    /// Read the client's credentials and answer with the verdict
    pub async fn authenticate<S>(&self, stream: &mut S) -> Result<AuthOutcome, AuthError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let creds = read_credentials(stream).await?;

        if self.valid(&creds.username, &creds.password) {
            send_auth_result(stream, AUTH_SUCCESS).await?;
            debug!("Authentication successful for user: {}", creds.username);
            Ok(AuthOutcome::user(creds.username))
        } else {
            send_auth_result(stream, AUTH_FAILURE).await?;
            Err(AuthError::InvalidCredentials(creds.username))
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}
