//! Stream discovery
//!
//! Pages through the live streams of one category and keeps the channels that
//! pass the viewer threshold and, in drops-only mode, carry the drops tag.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::twitch::error::Result;
use crate::twitch::{HelixStream, StreamsQuery, TokenManager};

/// Pause between two consecutive page requests
pub const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Default number of pages consumed per poll
pub const DEFAULT_PAGE_LIMIT: u32 = 2;

/// Default tag marking a stream with drops enabled
pub const DEFAULT_DROPS_TAG: &str = "DropsEnabled";

/// Eligibility rules applied to every stream entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFilter {
    /// Minimum viewer count, inclusive
    pub min_viewers: u64,
    /// Require `required_tag` to be present
    pub drops_only: bool,
    /// Tag looked up in drops-only mode, compared ASCII case-insensitively
    pub required_tag: String,
}

impl StreamFilter {
    /// Creates a filter using the default drops tag
    pub fn new(min_viewers: u64, drops_only: bool) -> Self {
        Self {
            min_viewers,
            drops_only,
            required_tag: DEFAULT_DROPS_TAG.to_string(),
        }
    }

    /// Overrides the tag required in drops-only mode
    pub fn with_required_tag(mut self, tag: impl Into<String>) -> Self {
        self.required_tag = tag.into();
        self
    }

    /// Returns true if the stream is eligible
    pub fn accepts(&self, stream: &HelixStream) -> bool {
        if stream.viewer_count < self.min_viewers {
            return false;
        }
        !self.drops_only
            || stream
                .tags()
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(&self.required_tag))
    }
}

/// A channel that passed the filter on the latest poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleStream {
    /// Channel login name
    pub login: String,
    /// Viewer count at poll time
    pub viewer_count: u64,
    /// Tags at poll time
    pub tags: Vec<String>,
}

impl From<HelixStream> for EligibleStream {
    fn from(stream: HelixStream) -> Self {
        Self {
            login: stream.user_login,
            viewer_count: stream.viewer_count,
            tags: stream.tags.unwrap_or_default(),
        }
    }
}

/// Returns true if `login` is in the pool
pub fn contains_channel(pool: &[EligibleStream], login: &str) -> bool {
    pool.iter().any(|s| s.login.eq_ignore_ascii_case(login))
}

/// Polls Helix for eligible streams
pub struct StreamFinder {
    tokens: Arc<TokenManager>,
    filter: StreamFilter,
    page_limit: u32,
    page_delay: Duration,
}

impl StreamFinder {
    /// Creates a finder with the default page limit and delay
    pub fn new(tokens: Arc<TokenManager>, filter: StreamFilter) -> Self {
        Self {
            tokens,
            filter,
            page_limit: DEFAULT_PAGE_LIMIT,
            page_delay: PAGE_DELAY,
        }
    }

    /// Sets how many pages a single poll may consume (at least one)
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Sets the pause between page requests
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Returns the token manager shared with the rest of the loop
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Collects eligible streams of a category
    ///
    /// Pagination ends on a missing cursor, on the page limit, or on the
    /// first failed page. A failed page after some matches were found ends the
    /// poll with those matches. A failure before any match, or any fatal
    /// error, is returned as `Err`.
    pub async fn find_eligible(&self, game_id: &str) -> Result<Vec<EligibleStream>> {
        let mut eligible = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=self.page_limit {
            let mut query = StreamsQuery::new(game_id);
            if let Some(after) = cursor.take() {
                query = query.with_after(after);
            }

            let page = match self.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) if e.is_fatal() || eligible.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        error = %e,
                        page = page_number,
                        collected = eligible.len(),
                        "Stream page failed, keeping partial results"
                    );
                    break;
                }
            };

            debug!(
                page = page_number,
                entries = page.data.len(),
                has_cursor = page.next_cursor().is_some(),
                "Fetched streams page"
            );

            cursor = page.next_cursor().map(str::to_string);
            eligible.extend(
                page.data
                    .into_iter()
                    .filter(|stream| self.filter.accepts(stream))
                    .map(EligibleStream::from),
            );

            if cursor.is_none() || page_number == self.page_limit {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        debug!(
            pool = ?eligible.iter().map(|s| s.login.as_str()).collect::<Vec<_>>(),
            "Eligible pool built"
        );
        Ok(eligible)
    }

    /// Resolves a category name to its id, `None` when Helix knows no match
    pub async fn resolve_game_id(&self, name: &str) -> Result<Option<String>> {
        let api = Arc::clone(self.tokens.api());
        let client_id = self.tokens.client_id().to_string();
        let games = self
            .tokens
            .call_with_refresh(|token| {
                let api = Arc::clone(&api);
                let client_id = client_id.clone();
                let name = name.to_string();
                async move { api.get_games(&client_id, &token, &name).await }
            })
            .await?;

        debug!(matches = games.len(), name = name, "Game lookup finished");
        Ok(games.into_iter().next().map(|game| game.id))
    }

    async fn fetch_page(&self, query: &StreamsQuery) -> Result<crate::twitch::StreamsPage> {
        let api = Arc::clone(self.tokens.api());
        let client_id = self.tokens.client_id().to_string();
        self.tokens
            .call_with_refresh(|token| {
                let api = Arc::clone(&api);
                let client_id = client_id.clone();
                let query = query.clone();
                async move { api.get_streams(&client_id, &token, &query).await }
            })
            .await
    }
}
