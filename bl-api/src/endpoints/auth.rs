//! Session and ticket endpoints.

use bl_core::error::{BlError, BlResult};

use crate::client::ApiClient;
use crate::response::ApiResponse;

impl ApiClient {
    /// `POST /auth/realtime-ticket` — mint a short-lived, single-use
    /// ticket for opening the realtime channel.
    ///
    /// The bearer token authenticates the mint; only the ticket ever
    /// travels on the realtime wire.
    pub async fn post_mint_realtime_ticket(&self) -> BlResult<String> {
        let resp: ApiResponse<serde_json::Value> = self
            .post_json("/auth/realtime-ticket", &serde_json::json!({}))
            .await?;

        if !resp.is_success() {
            return Err(BlError::AuthFailed(
                resp.error_message().unwrap_or_else(|| "ticket mint refused".into()),
            ));
        }

        resp.data
            .as_ref()
            .and_then(|d| d.get("ticket"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| BlError::Serialization("ticket envelope missing ticket".into()))
    }
}
