//! Mock Twitch API for testing
//!
//! Responses are queued per endpoint and consumed in order; an empty queue
//! yields a harmless default. Every call is recorded for verification.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::twitch::error::Result;
use crate::twitch::{
    ClientCredentials, Game, HelixApi, StreamsPage, StreamsQuery, TokenResponse,
};

/// Scriptable `HelixApi` implementation
#[derive(Default)]
pub struct MockHelixApi {
    tokens: Mutex<VecDeque<Result<TokenResponse>>>,
    exchanges: Mutex<VecDeque<Result<TokenResponse>>>,
    pages: Mutex<VecDeque<Result<StreamsPage>>>,
    games: Mutex<VecDeque<Result<Vec<Game>>>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    codes_seen: Mutex<Vec<String>>,
    tokens_seen: Mutex<Vec<String>>,
    queries_seen: Mutex<Vec<StreamsQuery>>,
    game_names_seen: Mutex<Vec<String>>,
}

fn token(access_token: &str) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: None,
        expires_in: Some(14_400),
    }
}

impl MockHelixApi {
    /// Creates a mock with empty queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a refresh-grant result carrying only an access token
    pub fn push_token(&self, result: Result<&str>) {
        self.push_token_response(result.map(token));
    }

    /// Queues a full refresh-grant result
    pub fn push_token_response(&self, result: Result<TokenResponse>) {
        self.tokens.lock().unwrap().push_back(result);
    }

    /// Queues an authorization-code exchange result
    pub fn push_exchange(&self, result: Result<TokenResponse>) {
        self.exchanges.lock().unwrap().push_back(result);
    }

    /// Queues a streams page result
    pub fn push_page(&self, result: Result<StreamsPage>) {
        self.pages.lock().unwrap().push_back(result);
    }

    /// Queues a games lookup result
    pub fn push_games(&self, result: Result<Vec<Game>>) {
        self.games.lock().unwrap().push_back(result);
    }

    /// Number of refresh-grant calls
    pub fn refresh_calls(&self) -> usize {
        self.refresh_tokens_seen.lock().unwrap().len()
    }

    /// Number of streams page calls
    pub fn stream_calls(&self) -> usize {
        self.queries_seen.lock().unwrap().len()
    }

    /// Refresh tokens presented to the token endpoint, in order
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }

    /// Authorization codes presented to the token endpoint, in order
    pub fn codes_seen(&self) -> Vec<String> {
        self.codes_seen.lock().unwrap().clone()
    }

    /// Access tokens presented to Helix, in order
    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    /// Streams queries received, in order
    pub fn queries_seen(&self) -> Vec<StreamsQuery> {
        self.queries_seen.lock().unwrap().clone()
    }

    /// Game names looked up, in order
    pub fn game_names_seen(&self) -> Vec<String> {
        self.game_names_seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HelixApi for MockHelixApi {
    async fn exchange_code(
        &self,
        _credentials: &ClientCredentials,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResponse> {
        self.codes_seen.lock().unwrap().push(code.to_string());
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(token("mock-access")))
    }

    async fn refresh_access_token(
        &self,
        _credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.tokens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(token("mock-access")))
    }

    async fn get_games(
        &self,
        _client_id: &str,
        access_token: &str,
        name: &str,
    ) -> Result<Vec<Game>> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.game_names_seen.lock().unwrap().push(name.to_string());
        self.games
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_streams(
        &self,
        _client_id: &str,
        access_token: &str,
        query: &StreamsQuery,
    ) -> Result<StreamsPage> {
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.queries_seen.lock().unwrap().push(query.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(StreamsPage::default()))
    }
}
