//! reqwest implementation of `HelixApi`
//!
//! Requests are single-shot: no retry loop lives here. The refresh-once rule
//! for expired tokens is applied by `TokenManager`, and transient failures are
//! surfaced to the rotation loop which waits for its next cycle.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::twitch::error::Result;
use crate::twitch::{
    ApiError, ClientCredentials, Game, GamesResponse, HelixApi, StreamsPage, StreamsQuery,
    TokenResponse,
};

/// Default OAuth base URL
pub const DEFAULT_AUTH_BASE_URL: &str = "https://id.twitch.tv/oauth2";

/// Default Helix base URL
pub const DEFAULT_HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// HTTP client for the Twitch token endpoint and Helix API
#[derive(Debug, Clone)]
pub struct HelixClient {
    /// Base URL of the OAuth service (token and authorize endpoints)
    auth_base_url: String,
    /// Base URL of the Helix REST API
    helix_base_url: String,
    /// Per-request timeout, kept for error messages
    timeout_seconds: u64,
    /// HTTP client for making requests
    client: Client,
}

impl HelixClient {
    /// Creates a client against the public Twitch endpoints
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        Self::with_base_urls(DEFAULT_AUTH_BASE_URL, DEFAULT_HELIX_BASE_URL, timeout_seconds)
    }

    /// Creates a client against custom endpoints
    pub fn with_base_urls(
        auth_base_url: impl Into<String>,
        helix_base_url: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("dropwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            auth_base_url: auth_base_url.into().trim_end_matches('/').to_string(),
            helix_base_url: helix_base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
            client,
        })
    }

    /// Returns the URL the user opens in a browser to obtain an authorization code
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/authorize", self.auth_base_url),
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| ApiError::config(format!("Invalid auth base URL: {}", e)))?;
        Ok(url.into())
    }

    /// POSTs a form to the token endpoint and decodes the token pair
    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = format!("{}/token", self.auth_base_url);
        let grant_type = form
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map(|(_, value)| *value)
            .unwrap_or("unknown");
        debug!(url = %url, grant_type = grant_type, "Requesting token");

        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::token_exchange(status.as_u16(), body));
        }

        self.decode(response).await
    }

    /// Sends an authenticated Helix GET and decodes the JSON body
    async fn helix_get<T: DeserializeOwned>(
        &self,
        path: &str,
        client_id: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.helix_base_url, path);
        debug!(url = %url, "Sending Helix request (headers omitted)");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Client-Id", client_id)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.timeout_seconds))?;

        let status = response.status();
        debug!(status = %status, "Received Helix response");

        match status {
            StatusCode::OK => self.decode(response).await,
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::from_status(status, body))
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.timeout_seconds))?;
        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }
}

#[async_trait::async_trait]
impl HelixApi for HelixClient {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        self.request_token(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.request_token(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn get_games(
        &self,
        client_id: &str,
        access_token: &str,
        name: &str,
    ) -> Result<Vec<Game>> {
        let response: GamesResponse = self
            .helix_get("games", client_id, access_token, &[("name", name)])
            .await?;
        Ok(response.data)
    }

    async fn get_streams(
        &self,
        client_id: &str,
        access_token: &str,
        query: &StreamsQuery,
    ) -> Result<StreamsPage> {
        let first = query.first.min(StreamsQuery::MAX_PAGE_SIZE).to_string();
        let mut params = vec![
            ("game_id", query.game_id.as_str()),
            ("first", first.as_str()),
            ("type", "live"),
        ];
        if let Some(after) = query.after.as_deref() {
            params.push(("after", after));
        }

        self.helix_get("streams", client_id, access_token, &params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HelixClient::new(5).unwrap();
        assert_eq!(client.auth_base_url, DEFAULT_AUTH_BASE_URL);
        assert_eq!(client.helix_base_url, DEFAULT_HELIX_BASE_URL);
        assert_eq!(client.timeout_seconds, 5);
    }

    #[test]
    fn test_base_urls_trailing_slash_trimmed() {
        let client =
            HelixClient::with_base_urls("http://localhost:1/oauth2/", "http://localhost:1/helix/", 1)
                .unwrap();
        assert_eq!(client.auth_base_url, "http://localhost:1/oauth2");
        assert_eq!(client.helix_base_url, "http://localhost:1/helix");
    }

    #[test]
    fn test_authorize_url_contains_parameters() {
        let client = HelixClient::new(5).unwrap();
        let url = client
            .authorize_url("abc123", "http://localhost:3000")
            .unwrap();

        assert!(url.starts_with("https://id.twitch.tv/oauth2/authorize?"));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let client =
            HelixClient::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9", 2).unwrap();
        let err = client
            .get_streams("id", "token", &StreamsQuery::new("1"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ApiError::Network { .. } | ApiError::Timeout { .. }),
            "unexpected error: {:?}",
            err
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_is_not_fatal() {
        let client =
            HelixClient::with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9", 2).unwrap();
        let err = client
            .refresh_access_token(&ClientCredentials::new("id", "secret"), "refresh")
            .await
            .unwrap_err();

        // Transport failures are not an explicit refusal from the server
        assert!(!matches!(err, ApiError::TokenExchange { .. }));
    }
}
