//! No authentication handler
//!
//! Handles the case when no authentication is required.

use super::AuthOutcome;
use crate::error::AuthError;
use tokio::io::{AsyncRead, AsyncWrite};

/// No authentication handler
///
/// Accepts every client without touching the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl NoAuth {
    /// Perform "authentication" (which does nothing)
    pub async fn authenticate<S>(&self, _stream: &mut S) -> Result<AuthOutcome, AuthError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Ok(AuthOutcome::anonymous())
    }
}
