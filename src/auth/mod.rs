//! SOCKS5 authentication module
//!
//! Handles method selection and username/password authentication. The
//! strategy is chosen once at startup from configuration.

mod consts;
mod directory;
mod none;
mod password;
mod wire;

pub use consts::*;
pub use directory::DirectoryAuthenticator;
pub use none::NoAuth;
pub use password::StaticCredentials;
pub use wire::{encode_request, read_credentials, send_auth_result, Credentials};

use crate::config::{AuthConfig, Config};
use crate::directory::{DirectoryClient, DirectoryConnection, LdapManager};
use crate::error::{AuthError, PoolError};
use crate::pool::{create_pool, Manager};
use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};
use wire::read_frame;

/// Result of a successful authentication
///
/// Handed back to the SOCKS5 engine, which keeps it as the session context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Negotiated method code
    pub method: u8,
    /// Attributes of the authenticated client
    pub attributes: HashMap<String, String>,
}

impl AuthOutcome {
    /// Outcome of the no-authentication method
    pub fn anonymous() -> Self {
        AuthOutcome {
            method: SOCKS5_AUTH_METHOD_NONE,
            attributes: HashMap::new(),
        }
    }

    /// Outcome of a verified username/password
    pub fn user(username: impl Into<String>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(USERNAME_ATTRIBUTE.to_string(), username.into());
        AuthOutcome {
            method: SOCKS5_AUTH_METHOD_PASSWORD,
            attributes,
        }
    }

    /// The verified username, if any
    pub fn username(&self) -> Option<&str> {
        self.attributes.get(USERNAME_ATTRIBUTE).map(String::as_str)
    }
}

/// The configured authentication strategy
pub enum Authenticator<M: Manager = LdapManager> {
    /// Accept every client
    NoAuth(NoAuth),
    /// Fixed credential table
    Static(StaticCredentials),
    /// Directory lookup and bind
    Directory(DirectoryAuthenticator<M>),
}

impl<M: Manager> Authenticator<M>
where
    M::Connection: DirectoryConnection,
{
    /// SOCKS5 method code this strategy negotiates
    pub fn method(&self) -> u8 {
        match self {
            Authenticator::NoAuth(_) => SOCKS5_AUTH_METHOD_NONE,
            Authenticator::Static(_) | Authenticator::Directory(_) => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Authenticate a client whose method has already been negotiated
    pub async fn authenticate<S>(&self, stream: &mut S) -> Result<AuthOutcome, AuthError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        match self {
            Authenticator::NoAuth(auth) => auth.authenticate(stream).await,
            Authenticator::Static(auth) => auth.authenticate(stream).await,
            Authenticator::Directory(auth) => auth.authenticate(stream).await,
        }
    }

    /// Release directory resources
    pub fn shutdown(&self) -> Result<(), PoolError> {
        match self {
            Authenticator::Directory(auth) => auth.pool().shutdown(),
            _ => Ok(()),
        }
    }
}

impl Authenticator<LdapManager> {
    /// Build the strategy selected in `config`
    ///
    /// For LDAP this opens the connection pool, so an unreachable directory
    /// fails here rather than on the first client.
    pub async fn from_config(config: &Config) -> Result<Self> {
        match &config.auth {
            AuthConfig::None => {
                info!("Authentication disabled");
                Ok(Authenticator::NoAuth(NoAuth))
            }
            AuthConfig::Static { users } => {
                info!("Static authentication with {} users", users.len());
                Ok(Authenticator::Static(StaticCredentials::new(users.clone())))
            }
            AuthConfig::Ldap => {
                let ldap = config
                    .ldap
                    .as_ref()
                    .context("LDAP authentication requires an [ldap] section")?;
                info!("LDAP authentication against {}", ldap.url);

                let pool = create_pool(&config.pool, LdapManager::new(ldap))
                    .await
                    .with_context(|| format!("Failed to open LDAP pool for {}", ldap.url))?;
                let auth = DirectoryAuthenticator::new(pool, DirectoryClient::from_config(ldap))
                    .with_request_timeout(ldap.request_timeout());
                Ok(Authenticator::Directory(auth))
            }
        }
    }
}

/// Perform method selection, then authenticate
///
/// This function handles the complete SOCKS5 authentication flow for hosts
/// that pass the raw client connection:
/// 1. Read client's supported methods
/// 2. Select the authenticator's method or reject with 0xFF
/// 3. Run the authenticator
pub async fn negotiate<S, M>(
    stream: &mut S,
    authenticator: &Authenticator<M>,
) -> Result<AuthOutcome, AuthError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    M: Manager,
    M::Connection: DirectoryConnection,
{
    // Step 1: Read version and number of methods
    let mut header = [0u8; 2];
    read_frame(stream, &mut header, "greeting").await?;

    let [version, num_methods] = header;
    if version != SOCKS5_VERSION {
        return Err(AuthError::Protocol(format!(
            "Unsupported SOCKS version: {}",
            version
        )));
    }
    if num_methods == 0 {
        return Err(AuthError::Protocol(
            "No authentication methods provided".to_string(),
        ));
    }

    // Step 2: Read available methods
    let mut methods = vec![0u8; num_methods as usize];
    read_frame(stream, &mut methods, "methods").await?;

    // Step 3: Select and announce the method
    let method = authenticator.method();
    if !methods.contains(&method) {
        stream
            .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE])
            .await?;
        stream.flush().await?;
        return Err(AuthError::NoAcceptableMethod);
    }

    stream.write_all(&[SOCKS5_VERSION, method]).await?;
    stream.flush().await?;
    debug!("Selected authentication method {:#04x}", method);

    // Step 4: Authenticate
    authenticator.authenticate(stream).await
}
