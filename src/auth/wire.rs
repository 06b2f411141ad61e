//! Username/password subnegotiation framing
//!
//! Reads the RFC 1929 request and writes its two-byte response.
//!
//! Client sends:
//! ```text
//! +----+------+----------+------+----------+
//! |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
//! +----+------+----------+------+----------+
//! | 1  |  1   | 0 to 255 |  1   | 0 to 255 |
//! +----+------+----------+------+----------+
//! ```
//!
//! Server responds:
//! ```text
//! +----+--------+
//! |VER | STATUS |
//! +----+--------+
//! | 1  |   1    |
//! +----+--------+
//! ```

use super::consts::SOCKS5_AUTH_VERSION;
use crate::error::AuthError;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Credentials offered by a client
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Password as sent by the client
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read one username/password request
///
/// Fails without writing anything: a wrong version byte gives
/// [`AuthError::UnsupportedVersion`], a stream that ends before the declared
/// lengths are satisfied or a non-UTF-8 field gives [`AuthError::Protocol`].
pub async fn read_credentials<S>(stream: &mut S) -> Result<Credentials, AuthError>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    read_frame(stream, &mut header, "header").await?;

    let [version, username_len] = header;
    if version != SOCKS5_AUTH_VERSION {
        return Err(AuthError::UnsupportedVersion(version));
    }

    let mut username = vec![0u8; username_len as usize];
    read_frame(stream, &mut username, "username").await?;

    let mut password_len = [0u8; 1];
    read_frame(stream, &mut password_len, "password length").await?;

    let mut password = vec![0u8; password_len[0] as usize];
    read_frame(stream, &mut password, "password").await?;

    let username = String::from_utf8(username)
        .map_err(|_| AuthError::Protocol("username is not valid UTF-8".to_string()))?;
    let password = String::from_utf8(password)
        .map_err(|_| AuthError::Protocol("password is not valid UTF-8".to_string()))?;

    Ok(Credentials { username, password })
}

/// Fill `buf`, reporting a short stream as a framing error
pub(crate) async fn read_frame<S>(
    stream: &mut S,
    buf: &mut [u8],
    what: &str,
) -> Result<(), AuthError>
where
    S: AsyncRead + Unpin,
{
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(AuthError::Protocol(format!(
            "stream closed while reading {} ({} bytes expected)",
            what,
            buf.len()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Send authentication result to client
pub async fn send_auth_result<S>(stream: &mut S, status: u8) -> Result<(), AuthError>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await?;
    Ok(())
}

/// Encode a username/password request
///
/// Used by the `sockldap` binary and tests to play the client side. Fails
/// with [`AuthError::Protocol`] when a field does not fit its length byte.
pub fn encode_request(username: &str, password: &str) -> Result<Vec<u8>, AuthError> {
    let username_len = field_len(username, "username")?;
    let password_len = field_len(password, "password")?;

    let mut request = Vec::with_capacity(3 + username.len() + password.len());
    request.push(SOCKS5_AUTH_VERSION);
    request.push(username_len);
    request.extend_from_slice(username.as_bytes());
    request.push(password_len);
    request.extend_from_slice(password.as_bytes());
    Ok(request)
}

fn field_len(value: &str, what: &str) -> Result<u8, AuthError> {
    u8::try_from(value.len()).map_err(|_| {
        AuthError::Protocol(format!(
            "{} is {} bytes, at most 255 allowed",
            what,
            value.len()
        ))
    })
}
