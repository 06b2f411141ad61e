//! Test utilities and mocks for Sockldap
//!
//! This module provides an in-memory directory and pool managers used across
//! integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sockldap::config::PoolConfig;
use sockldap::directory::DirectoryConnection;
use sockldap::error::DirectoryError;
use sockldap::pool::Manager;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Search base of the mock directory
pub const BASE_DN: &str = "dc=example,dc=com";

/// Service account of the mock directory
pub const SERVICE_DN: &str = "cn=admin,dc=example,dc=com";

/// Service account password
pub const SERVICE_PASSWORD: &str = "admin-secret";

/// LDAP invalidCredentials
const RC_INVALID_CREDENTIALS: u32 = 49;

/// LDAP insufficientAccessRights
const RC_INSUFFICIENT_ACCESS: u32 = 50;

/// Create a pair of connected duplex streams for testing
pub fn create_mock_stream_pair() -> (DuplexStream, DuplexStream) {
    duplex(8192)
}

/// Pool limits for tests
pub fn pool_config(min_open: usize, max_open: usize) -> PoolConfig {
    PoolConfig {
        min_open,
        max_open,
        max_lifetime: 60,
    }
}

/// In-memory directory shared by every mock connection
#[derive(Default)]
pub struct MockDirectory {
    /// uid to (dn, password)
    users: Mutex<HashMap<String, (String, String)>>,
    /// Filters received, in order
    filters: Mutex<Vec<String>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    user_binds: AtomicUsize,
    unreachable: AtomicBool,
    fail_next_search: AtomicBool,
    refuse_next_search: AtomicBool,
    search_delay_ms: AtomicU64,
}

impl MockDirectory {
    /// Create an empty directory
    pub fn new() -> Arc<Self> {
        Arc::new(MockDirectory::default())
    }

    /// Add a person entry under `ou=people`
    pub fn add_user(&self, uid: &str, password: &str) -> String {
        let dn = format!("uid={},ou=people,{}", uid, BASE_DN);
        self.users
            .lock()
            .unwrap()
            .insert(uid.to_string(), (dn.clone(), password.to_string()));
        dn
    }

    /// Refuse new connections
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Break the transport on the next search
    pub fn fail_next_search(&self) {
        self.fail_next_search.store(true, Ordering::SeqCst);
    }

    /// Answer the next search with a non-success result code
    pub fn refuse_next_search(&self) {
        self.refuse_next_search.store(true, Ordering::SeqCst);
    }

    /// Delay every search
    pub fn set_search_delay(&self, delay: Duration) {
        self.search_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Connections opened so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Connections destroyed so far
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Binds issued for anyone but the service account
    pub fn user_binds(&self) -> usize {
        self.user_binds.load(Ordering::SeqCst)
    }

    /// Filters received so far
    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().unwrap().clone()
    }

    fn lookup(&self, filter: &str) -> Vec<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .filter(|(uid, _)| {
                filter
                    == format!(
                        "(&(objectClass=person)(uid={}))",
                        ldap3::ldap_escape(uid.as_str())
                    )
            })
            .map(|(_, (dn, _))| dn.clone())
            .collect()
    }

    fn check_password(&self, dn: &str, password: &str) -> bool {
        if dn == SERVICE_DN {
            return password == SERVICE_PASSWORD;
        }
        self.users
            .lock()
            .unwrap()
            .values()
            .any(|(user_dn, user_password)| user_dn == dn && user_password == password)
    }
}

/// Connection to the mock directory
pub struct MockConnection {
    directory: Arc<MockDirectory>,
    bound_as: Option<String>,
}

impl MockConnection {
    /// DN the connection is currently bound as
    pub fn bound_as(&self) -> Option<&str> {
        self.bound_as.as_deref()
    }
}

#[async_trait]
impl DirectoryConnection for MockConnection {
    async fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<String>, DirectoryError> {
        let delay = self.directory.search_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self
            .directory
            .fail_next_search
            .swap(false, Ordering::SeqCst)
        {
            let broken = io::Error::new(io::ErrorKind::BrokenPipe, "connection reset");
            return Err(DirectoryError::Ldap(ldap3::LdapError::from(broken)));
        }

        // Only the service account may search.
        let refused = self
            .directory
            .refuse_next_search
            .swap(false, Ordering::SeqCst);
        if refused || self.bound_as.as_deref() != Some(SERVICE_DN) {
            return Err(DirectoryError::SearchFailed {
                base: base_dn.to_string(),
                rc: RC_INSUFFICIENT_ACCESS,
                text: "search requires the service account".to_string(),
            });
        }

        self.directory
            .filters
            .lock()
            .unwrap()
            .push(filter.to_string());
        Ok(self.directory.lookup(filter))
    }

    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        if dn != SERVICE_DN {
            self.directory.user_binds.fetch_add(1, Ordering::SeqCst);
        }

        if self.directory.check_password(dn, password) {
            self.bound_as = Some(dn.to_string());
            Ok(())
        } else {
            self.bound_as = None;
            Err(DirectoryError::BindRejected {
                dn: dn.to_string(),
                rc: RC_INVALID_CREDENTIALS,
            })
        }
    }
}

/// Manager opening connections to a [`MockDirectory`]
///
/// Like the LDAP manager, `prepare` binds as the service account on every
/// lease.
pub struct MockManager {
    directory: Arc<MockDirectory>,
}

impl MockManager {
    /// Create a manager for `directory`
    pub fn new(directory: Arc<MockDirectory>) -> Self {
        MockManager { directory }
    }
}

#[async_trait]
impl Manager for MockManager {
    type Connection = MockConnection;
    type Error = io::Error;

    async fn create(&self) -> Result<MockConnection, io::Error> {
        if self.directory.unreachable.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "directory unreachable",
            ));
        }
        self.directory.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            directory: self.directory.clone(),
            bound_as: None,
        })
    }

    async fn prepare(&self, conn: &mut MockConnection) -> Result<(), io::Error> {
        conn.simple_bind(SERVICE_DN, SERVICE_PASSWORD)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::PermissionDenied, e.to_string()))
    }

    fn destroy(&self, conn: MockConnection) {
        self.directory.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(conn);
    }
}

/// Manager that tracks how many connections are alive at once
#[derive(Default)]
pub struct CountingManager {
    live: AtomicUsize,
    peak: AtomicUsize,
    created: AtomicUsize,
}

impl CountingManager {
    /// Connections currently alive
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of connections alive at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Connections created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Manager for CountingManager {
    type Connection = usize;
    type Error = io::Error;

    async fn create(&self) -> Result<usize, io::Error> {
        tokio::task::yield_now().await;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);
        Ok(self.created.fetch_add(1, Ordering::SeqCst))
    }

    fn destroy(&self, _conn: usize) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Write `request`, run `server`, and collect every byte written back
///
/// The server side is dropped before reading so the response is complete.
pub async fn exchange<F, Fut, T>(request: &[u8], server: F) -> (T, Vec<u8>)
where
    F: FnOnce(DuplexStream) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let (mut client, server_stream) = create_mock_stream_pair();
    client.write_all(request).await.unwrap();
    client.shutdown().await.unwrap();

    let result = server(server_stream).await;

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    (result, response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_mock_stream_pair() {
        let (mut a, mut b) = create_mock_stream_pair();

        a.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        b.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_mock_directory_requires_service_bind() {
        let directory = MockDirectory::new();
        directory.add_user("alice", "wonderland");
        let manager = MockManager::new(directory.clone());

        let mut conn = manager.create().await.unwrap();
        assert!(conn
            .search(BASE_DN, "(&(objectClass=person)(uid=alice))")
            .await
            .is_err());

        manager.prepare(&mut conn).await.unwrap();
        assert_eq!(conn.bound_as(), Some(SERVICE_DN));
        let dns = conn
            .search(BASE_DN, "(&(objectClass=person)(uid=alice))")
            .await
            .unwrap();
        assert_eq!(dns, vec![format!("uid=alice,ou=people,{}", BASE_DN)]);
    }
}
