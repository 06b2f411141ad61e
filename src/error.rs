//! Error types for Sockldap
//!
//! This module defines the error types shared by the pool, the directory
//! client and the authenticators.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a pool manager
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the connection pool
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool has been shut down
    #[error("Pool closed")]
    Closed,

    /// Pool limits are inconsistent
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The manager could not create a connection
    #[error("Failed to create connection: {0}")]
    CreateFailed(#[source] BoxError),

    /// Every leased connection failed preparation
    #[error("Failed to prepare a connection after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of leases tried
        attempts: usize,
        /// Error from the last attempt
        #[source]
        source: BoxError,
    },
}

/// Errors returned by directory operations
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The directory refused the bind
    #[error("Bind rejected for {dn} (result code {rc})")]
    BindRejected {
        /// Bind target
        dn: String,
        /// LDAP result code
        rc: u32,
    },

    /// An empty password would be an unauthenticated bind
    #[error("Empty password for {0}")]
    EmptyPassword(String),

    /// The search completed with a non-success result code
    #[error("Search under {base} failed (result code {rc}): {text}")]
    SearchFailed {
        /// Search base
        base: String,
        /// LDAP result code
        rc: u32,
        /// Diagnostic message from the server
        text: String,
    },

    /// Transport or protocol failure talking to the directory
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),
}

impl DirectoryError {
    /// Whether the error reflects bad credentials rather than a broken session
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            DirectoryError::BindRejected { .. } | DirectoryError::EmptyPassword(_)
        )
    }
}

/// Errors returned by an authentication attempt
#[derive(Error, Debug)]
pub enum AuthError {
    /// Subnegotiation version byte was not 0x01
    #[error("Unsupported auth version: {0}")]
    UnsupportedVersion(u8),

    /// Malformed or truncated framing
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No directory entry matches the username
    #[error("User not found: {0}")]
    NotFound(String),

    /// The user lookup failed at the directory and is treated as not found
    #[error("Lookup of user {username} failed: {source}")]
    LookupFailed {
        /// Username being resolved
        username: String,
        /// Directory failure
        #[source]
        source: DirectoryError,
    },

    /// The directory rejected the user's password
    #[error("Invalid password for user: {0}")]
    BindFailed(String),

    /// Static credential mismatch
    #[error("Invalid credentials for user: {0}")]
    InvalidCredentials(String),

    /// The client offered none of our methods
    #[error("No acceptable authentication method")]
    NoAcceptableMethod,

    /// Directory round trip exceeded the request timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Directory error
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AuthError {
    /// Whether the client was answered with a failure status
    ///
    /// Credential and lookup failures are reported on the wire before being
    /// returned; every other error leaves the stream without a response.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound(_)
                | AuthError::LookupFailed { .. }
                | AuthError::BindFailed(_)
                | AuthError::InvalidCredentials(_)
        )
    }

    /// Whether the peer is not speaking the expected protocol
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            AuthError::UnsupportedVersion(_) | AuthError::Protocol(_)
        )
    }
}
