//! Access token lifecycle
//!
//! `TokenManager` keeps the current access token and regenerates it from the
//! long-lived refresh token. Authenticated calls go through
//! `call_with_refresh`, which refreshes at most once per call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::twitch::error::Result;
use crate::twitch::{ApiError, ClientCredentials, HelixApi};

/// Owns the session credentials and the current access token
pub struct TokenManager {
    api: Arc<dyn HelixApi>,
    credentials: ClientCredentials,
    refresh_token: RwLock<String>,
    access_token: RwLock<Option<String>>,
    refresh_count: AtomicUsize,
}

impl TokenManager {
    /// Creates a manager with no access token cached yet
    pub fn new(
        api: Arc<dyn HelixApi>,
        credentials: ClientCredentials,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            api,
            credentials,
            refresh_token: RwLock::new(refresh_token.into()),
            access_token: RwLock::new(None),
            refresh_count: AtomicUsize::new(0),
        }
    }

    /// Returns the API client this manager authenticates against
    pub fn api(&self) -> &Arc<dyn HelixApi> {
        &self.api
    }

    /// Returns the public client identifier
    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Number of refreshes performed so far
    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::Relaxed)
    }

    /// Exchanges the refresh token for a new access token and caches it
    ///
    /// A refusal from the token endpoint comes back as
    /// `ApiError::TokenExchange`, which callers treat as fatal.
    pub async fn refresh(&self) -> Result<String> {
        let refresh_token = self.refresh_token.read().await.clone();
        let response = self
            .api
            .refresh_access_token(&self.credentials, &refresh_token)
            .await?;

        self.refresh_count.fetch_add(1, Ordering::Relaxed);

        // Twitch may rotate the refresh token; keep the newest in memory
        if let Some(rotated) = response.refresh_token.as_deref() {
            if rotated != refresh_token {
                debug!("Refresh token rotated by the token endpoint");
                *self.refresh_token.write().await = rotated.to_string();
            }
        }

        debug!(
            expires_in = ?response.expires_in,
            "Access token refreshed"
        );
        *self.access_token.write().await = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    /// Returns the cached access token, fetching one if none is cached
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        info!("No access token cached, requesting one");
        self.refresh().await
    }

    /// Runs an authenticated call, refreshing the token once on HTTP 401
    ///
    /// The call is attempted with the cached token. If it fails with
    /// `ApiError::Unauthorized`, the token is refreshed and the call retried
    /// exactly once; whatever the retry returns is final.
    pub async fn call_with_refresh<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.access_token().await?;
        match call(token).await {
            Err(ApiError::Unauthorized { message }) => {
                debug!(reason = %message, "Access token rejected, refreshing");
                let token = self.refresh().await?;
                let retried = call(token).await;
                if let Err(ref e) = retried {
                    if e.is_unauthorized() {
                        warn!("Request still unauthorized after token refresh");
                    }
                }
                retried
            }
            other => other,
        }
    }
}
