//! SOCKS5 authentication constants
//!
//! Method codes from RFC 1928 and the subnegotiation values from RFC 1929.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// Username/password subnegotiation version
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Subnegotiation status
/// Credentials accepted
pub const AUTH_SUCCESS: u8 = 0x00;
/// Credentials rejected
pub const AUTH_FAILURE: u8 = 0x01;

/// Attribute key carrying the verified username
pub const USERNAME_ATTRIBUTE: &str = "Username";
