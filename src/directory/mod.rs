//! Directory client module for Sockldap
//!
//! Resolves a login name to its distinguished name and verifies a password
//! by binding as that DN. Both operations run over one leased connection.

mod ldap;

pub use self::ldap::LdapManager;

use crate::config::LdapConfig;
use crate::error::DirectoryError;
use async_trait::async_trait;
use ldap3::ldap_escape;
use tracing::debug;

/// The two directory operations the authenticator needs
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Whole-subtree search under `base_dn`, returning matching DNs in
    /// server order
    async fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<String>, DirectoryError>;

    /// Simple bind as `dn`
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;
}

/// A resolved directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name, the bind target
    pub dn: String,
}

/// Looks up users and checks their passwords
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_dn: String,
    identifier_attribute: String,
}

impl DirectoryClient {
    /// Create a client searching under `base_dn` on `identifier_attribute`
    pub fn new(base_dn: impl Into<String>, identifier_attribute: impl Into<String>) -> Self {
        DirectoryClient {
            base_dn: base_dn.into(),
            identifier_attribute: identifier_attribute.into(),
        }
    }

    /// Create a client from LDAP configuration
    pub fn from_config(config: &LdapConfig) -> Self {
        Self::new(&config.base_dn, &config.identifier_attribute)
    }

    /// Search base
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Search filter for a login name, with the value escaped
    pub fn user_filter(&self, identifier: &str) -> String {
        format!(
            "(&(objectClass=person)({}={}))",
            self.identifier_attribute,
            ldap_escape(identifier)
        )
    }

    /// Find the entry for `identifier`
    ///
    /// Returns the first match when several entries share the identifier.
    pub async fn search<C>(
        &self,
        conn: &mut C,
        identifier: &str,
    ) -> Result<Option<DirectoryEntry>, DirectoryError>
    where
        C: DirectoryConnection + ?Sized,
    {
        if identifier.is_empty() {
            return Ok(None);
        }

        let filter = self.user_filter(identifier);
        let dns = conn.search(&self.base_dn, &filter).await?;
        if dns.len() > 1 {
            debug!(
                "{} entries match {}, using the first",
                dns.len(),
                identifier
            );
        }

        Ok(dns.into_iter().next().map(|dn| DirectoryEntry { dn }))
    }

    /// Verify `password` by binding as `dn`
    pub async fn bind<C>(
        &self,
        conn: &mut C,
        dn: &str,
        password: &str,
    ) -> Result<(), DirectoryError>
    where
        C: DirectoryConnection + ?Sized,
    {
        // An empty password is an unauthenticated bind, which servers accept.
        if password.is_empty() {
            return Err(DirectoryError::EmptyPassword(dn.to_string()));
        }

        conn.simple_bind(dn, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records requests and answers from a fixed list
    #[derive(Default)]
    struct FakeConnection {
        dns: Vec<String>,
        password: String,
        searches: Vec<(String, String)>,
        binds: Vec<String>,
    }

    #[async_trait]
    impl DirectoryConnection for FakeConnection {
        async fn search(
            &mut self,
            base_dn: &str,
            filter: &str,
        ) -> Result<Vec<String>, DirectoryError> {
            self.searches
                .push((base_dn.to_string(), filter.to_string()));
            Ok(self.dns.clone())
        }

        async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
            self.binds.push(dn.to_string());
            if password == self.password {
                Ok(())
            } else {
                Err(DirectoryError::BindRejected {
                    dn: dn.to_string(),
                    rc: 49,
                })
            }
        }
    }

    fn client() -> DirectoryClient {
        DirectoryClient::new("dc=example", "uid")
    }

    #[test]
    fn test_user_filter() {
        assert_eq!(
            client().user_filter("alice"),
            "(&(objectClass=person)(uid=alice))"
        );
    }

    #[test]
    fn test_user_filter_escapes_value() {
        assert_eq!(
            client().user_filter("a*)(uid=*"),
            "(&(objectClass=person)(uid=a\\2a\\29\\28uid=\\2a))"
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = LdapConfig::new("ldap://localhost", "ou=people,dc=example", "cn=x", "y");
        config.identifier_attribute = "mail".to_string();

        let client = DirectoryClient::from_config(&config);
        assert_eq!(client.base_dn(), "ou=people,dc=example");
        assert_eq!(
            client.user_filter("a@example.com"),
            "(&(objectClass=person)(mail=a@example.com))"
        );
    }

    #[tokio::test]
    async fn test_search_found() {
        let mut conn = FakeConnection {
            dns: vec!["uid=alice,dc=example".to_string()],
            ..Default::default()
        };

        let entry = client().search(&mut conn, "alice").await.unwrap();
        assert_eq!(
            entry,
            Some(DirectoryEntry {
                dn: "uid=alice,dc=example".to_string()
            })
        );
        assert_eq!(
            conn.searches,
            vec![(
                "dc=example".to_string(),
                "(&(objectClass=person)(uid=alice))".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_search_first_match_wins() {
        let mut conn = FakeConnection {
            dns: vec![
                "uid=alice,ou=a,dc=example".to_string(),
                "uid=alice,ou=b,dc=example".to_string(),
            ],
            ..Default::default()
        };

        let entry = client().search(&mut conn, "alice").await.unwrap().unwrap();
        assert_eq!(entry.dn, "uid=alice,ou=a,dc=example");
    }

    #[tokio::test]
    async fn test_search_not_found() {
        let mut conn = FakeConnection::default();
        assert_eq!(client().search(&mut conn, "bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_empty_identifier_skips_round_trip() {
        let mut conn = FakeConnection {
            dns: vec!["uid=alice,dc=example".to_string()],
            ..Default::default()
        };

        assert_eq!(client().search(&mut conn, "").await.unwrap(), None);
        assert!(conn.searches.is_empty());
    }

    #[tokio::test]
    async fn test_bind() {
        let mut conn = FakeConnection {
            password: "secret".to_string(),
            ..Default::default()
        };

        assert!(client()
            .bind(&mut conn, "uid=alice,dc=example", "secret")
            .await
            .is_ok());

        let err = client()
            .bind(&mut conn, "uid=alice,dc=example", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::BindRejected { rc: 49, .. }));
    }

    #[tokio::test]
    async fn test_bind_empty_password_rejected_locally() {
        let mut conn = FakeConnection::default();

        let err = client()
            .bind(&mut conn, "uid=alice,dc=example", "")
            .await
            .unwrap_err();
        assert!(matches!(err, DirectoryError::EmptyPassword(_)));
        assert!(conn.binds.is_empty());
    }
}
