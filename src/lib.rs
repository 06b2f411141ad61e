//! # Sockldap - Directory-backed SOCKS5 Authentication
//!
//! Sockldap verifies SOCKS5 username/password credentials (RFC 1929) against
//! an LDAP directory. It keeps a bounded pool of service-account connections,
//! resolves each username to a DN with a subtree search, and checks the
//! password by binding as that DN.
//!
//! ## Features
//!
//! - **Pluggable Strategies**: no authentication, a static table, or LDAP
//! - **Bounded Connection Pool**: warm-start minimum, hard maximum, FIFO reuse
//! - **Connection Lifetime**: connections older than a configured age are replaced
//! - **Safe Filters**: usernames are escaped before they reach a search filter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sockldap::auth::{negotiate, Authenticator};
//! use sockldap::config::load_config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let authenticator = Authenticator::from_config(&config).await?;
//!
//!     let (mut stream, _) = tokio::net::TcpListener::bind("127.0.0.1:1080")
//!         .await?
//!         .accept()
//!         .await?;
//!     let outcome = negotiate(&mut stream, &authenticator).await?;
//!     println!("{:?}", outcome.username());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Authenticator -> Pool -> Directory
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod pool;

// Re-export commonly used items
pub use auth::{negotiate, AuthOutcome, Authenticator, DirectoryAuthenticator};
pub use config::{load_config, Config};
pub use error::{AuthError, DirectoryError, PoolError};
pub use pool::{create_pool, Manager, Pool, PooledConnection};

/// Version of the Sockldap library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
