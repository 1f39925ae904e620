//! Stored-token credential provider for the CLI.
//!
//! The access token comes from the `BOOKLINE_TOKEN` environment
//! variable or, failing that, a token file under the platform data
//! directory. Realtime tickets are minted through the API client,
//! which is attached after construction (the client itself needs a
//! provider for its bearer token).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use bl_api::ApiClient;
use bl_core::credentials::CredentialProvider;
use bl_core::error::{BlError, BlResult};
use bl_core::platform::Platform;

const TOKEN_ENV: &str = "BOOKLINE_TOKEN";
const TOKEN_FILE: &str = "token";

/// CLI credential provider backed by an env var or token file.
pub struct StoredCredentials {
    token: String,
    api: RwLock<Option<Arc<ApiClient>>>,
}

impl StoredCredentials {
    /// Load the token from the environment or the token file.
    pub fn load() -> BlResult<Self> {
        let token = match std::env::var(TOKEN_ENV) {
            Ok(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => {
                let path = Self::token_path()?;
                if !path.exists() {
                    return Err(BlError::AuthFailed(format!(
                        "no token: set {TOKEN_ENV} or write {}",
                        path.display()
                    )));
                }
                std::fs::read_to_string(&path)?.trim().to_string()
            }
        };
        if token.is_empty() {
            return Err(BlError::AuthFailed("stored token is empty".into()));
        }
        Ok(Self { token, api: RwLock::new(None) })
    }

    /// Attach the API client used for ticket minting.
    pub async fn attach_api(&self, api: Arc<ApiClient>) {
        *self.api.write().await = Some(api);
    }

    fn token_path() -> BlResult<PathBuf> {
        Ok(Platform::data_dir()?.join(TOKEN_FILE))
    }
}

#[async_trait]
impl CredentialProvider for StoredCredentials {
    async fn access_token(&self) -> BlResult<String> {
        Ok(self.token.clone())
    }

    async fn realtime_ticket(&self) -> BlResult<String> {
        let api = self.api.read().await;
        let api = api
            .as_ref()
            .ok_or_else(|| BlError::AuthFailed("no API client attached".into()))?;
        debug!("minting realtime ticket");
        api.post_mint_realtime_ticket().await
    }

    async fn clear_session(&self) -> BlResult<()> {
        let path = Self::token_path()?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }
}
