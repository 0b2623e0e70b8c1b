//! Twitch API access for dropwatch
//!
//! This module defines the trait and wire types for the two Twitch services the
//! rotation loop depends on: the OAuth token endpoint and the Helix REST API.
//!
//! # Architecture
//!
//! - `HelixApi` trait is the seam between the rotation logic and HTTP
//! - `HelixClient` is the reqwest implementation used at runtime
//! - `TokenManager` owns the mutable access token and the refresh-once rule
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dropwatch::twitch::{ClientCredentials, HelixApi, HelixClient, TokenManager};
//!
//! async fn example() -> Result<(), dropwatch::twitch::ApiError> {
//!     let api: Arc<dyn HelixApi> = Arc::new(HelixClient::new(5)?);
//!     let credentials = ClientCredentials::new("client-id", "client-secret");
//!     let tokens = TokenManager::new(api, credentials, "refresh-token");
//!     let token = tokens.refresh().await?;
//!     println!("got a token of {} chars", token.len());
//!     Ok(())
//! }
//! ```

use std::fmt;

use serde::Deserialize;

pub mod auth;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod mock;

pub use auth::TokenManager;
pub use client::HelixClient;
pub use error::ApiError;

/// Application credentials registered on the Twitch developer console
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Public client identifier, also sent as the `Client-Id` header
    pub client_id: String,
    /// Client secret, only ever sent to the token endpoint
    pub client_secret: String,
}

impl ClientCredentials {
    /// Creates a new credentials pair
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Body returned by the token endpoint for both grant types
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenResponse {
    /// Short-lived bearer token for Helix calls
    pub access_token: String,
    /// Long-lived token, present on authorization-code exchanges and
    /// sometimes rotated on refresh
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// A category entry from `GET /helix/games`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Game {
    /// Category identifier used as `game_id`
    pub id: String,
    /// Display name
    pub name: String,
}

/// Envelope of `GET /helix/games`
#[derive(Debug, Deserialize)]
pub(crate) struct GamesResponse {
    #[serde(default)]
    pub data: Vec<Game>,
}

/// A live stream entry from `GET /helix/streams`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HelixStream {
    /// Channel login name, the identifier handed to the miner
    pub user_login: String,
    /// Current viewer count
    pub viewer_count: u64,
    /// Free-form tags set by the broadcaster; Helix sends `null` when unset
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl HelixStream {
    /// Creates a stream entry, mostly useful for building fixtures
    pub fn new(user_login: impl Into<String>, viewer_count: u64, tags: &[&str]) -> Self {
        Self {
            user_login: user_login.into(),
            viewer_count,
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        }
    }

    /// Returns the tags, empty when the broadcaster set none
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Pagination block of a Helix list response
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Pagination {
    /// Opaque cursor for the next page
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One page of `GET /helix/streams`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StreamsPage {
    /// Streams on this page
    #[serde(default)]
    pub data: Vec<HelixStream>,
    /// Cursor information; Helix sends `{}` on the last page
    #[serde(default)]
    pub pagination: Pagination,
}

impl StreamsPage {
    /// Returns the cursor of the next page, treating an empty cursor as absent
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Query parameters for one streams page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamsQuery {
    /// Category to search
    pub game_id: String,
    /// Page size, Helix caps it at 100
    pub first: u8,
    /// Cursor returned by the previous page
    pub after: Option<String>,
}

impl StreamsQuery {
    /// Maximum page size accepted by Helix
    pub const MAX_PAGE_SIZE: u8 = 100;

    /// Creates a first-page query for a category
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            first: Self::MAX_PAGE_SIZE,
            after: None,
        }
    }

    /// Sets the cursor for the next page
    pub fn with_after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }
}

/// Trait for the Twitch endpoints the rotation loop needs
///
/// All implementations must be Send + Sync so the same client can be shared
/// between the rotation task and the startup prompts.
#[async_trait::async_trait]
pub trait HelixApi: Send + Sync {
    /// Exchanges a one-time authorization code for a token pair
    /// (`grant_type=authorization_code`)
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> error::Result<TokenResponse>;

    /// Trades a refresh token for a new access token (`grant_type=refresh_token`)
    async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> error::Result<TokenResponse>;

    /// Looks up categories by exact name
    async fn get_games(
        &self,
        client_id: &str,
        access_token: &str,
        name: &str,
    ) -> error::Result<Vec<Game>>;

    /// Fetches one page of live streams in a category
    async fn get_streams(
        &self,
        client_id: &str,
        access_token: &str,
        query: &StreamsQuery,
    ) -> error::Result<StreamsPage>;
}
