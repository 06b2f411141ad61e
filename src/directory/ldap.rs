//! LDAP transport
//!
//! Implements the directory operations over an `ldap3` async handle and
//! provides the pool manager that opens those handles.

use super::DirectoryConnection;
use crate::config::LdapConfig;
use crate::error::DirectoryError;
use crate::pool::Manager;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry, SearchResult};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
impl DirectoryConnection for Ldap {
    async fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        // No attribute projection: the server returns all user attributes.
        let SearchResult(entries, result) =
            Ldap::search(self, base_dn, Scope::Subtree, filter, Vec::<&str>::new()).await?;

        if result.rc != 0 {
            return Err(DirectoryError::SearchFailed {
                base: base_dn.to_string(),
                rc: result.rc,
                text: result.text,
            });
        }

        Ok(entries
            .into_iter()
            .map(|entry| SearchEntry::construct(entry).dn)
            .collect())
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = Ldap::simple_bind(self, dn, password).await?;
        if result.rc != 0 {
            return Err(DirectoryError::BindRejected {
                dn: dn.to_string(),
                rc: result.rc,
            });
        }
        Ok(())
    }
}

/// Opens LDAP connections and binds them as the service account
pub struct LdapManager {
    url: String,
    connect_timeout: Duration,
    bind_dn: String,
    bind_password: String,
}

impl LdapManager {
    /// Create a manager from LDAP configuration
    pub fn new(config: &LdapConfig) -> Self {
        LdapManager {
            url: config.url.clone(),
            connect_timeout: config.connect_timeout(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
        }
    }

    /// Server URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for LdapManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapManager")
            .field("url", &self.url)
            .field("connect_timeout", &self.connect_timeout)
            .field("bind_dn", &self.bind_dn)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Manager for LdapManager {
    type Connection = Ldap;
    type Error = LdapError;

    async fn create(&self) -> Result<Ldap, LdapError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connect_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url).await?;

        let url = self.url.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection to {} failed: {}", url, e);
            }
        });

        debug!("Opened LDAP connection to {}", self.url);
        Ok(ldap)
    }

    /// Re-bind as the service account; a previous lease may have left the
    /// connection bound as an end user.
    async fn prepare(&self, conn: &mut Ldap) -> Result<(), LdapError> {
        Ldap::simple_bind(conn, &self.bind_dn, &self.bind_password)
            .await?
            .success()?;
        Ok(())
    }

    fn destroy(&self, mut conn: Ldap) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = conn.unbind().await {
                    debug!("LDAP unbind failed: {}", e);
                }
            });
        }
    }
}
