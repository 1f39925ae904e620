//! Credential provider seam.
//!
//! The credential provider is an opaque collaborator: it hands out the
//! long-lived access token for REST calls and mints short-lived,
//! single-use tickets for opening the realtime channel. No long-lived
//! secret is ever placed on the realtime wire; the ticket is the sole
//! credential there.

use async_trait::async_trait;

use crate::error::BlResult;

/// Opaque source of credentials for the API client and realtime channel.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token for authenticated REST calls.
    async fn access_token(&self) -> BlResult<String>;

    /// Mint a short-lived, single-use ticket for the realtime endpoint.
    ///
    /// Each connect (and each reconnect attempt) requests a fresh ticket.
    async fn realtime_ticket(&self) -> BlResult<String>;

    /// Invalidate the session (logout).
    async fn clear_session(&self) -> BlResult<()>;
}
