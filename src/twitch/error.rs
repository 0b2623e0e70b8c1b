//! Error types for Twitch API operations
//!
//! Errors are categorized so callers can tell a transient failure (wait and
//! try the next cycle) from a fatal one (credentials are unusable, exit).

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the Twitch token or Helix endpoints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Connection issues, DNS failures, reset sockets
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
    },

    /// Request took longer than the configured HTTP timeout
    #[error("Request timeout after {seconds} seconds")]
    Timeout {
        /// Timeout duration in seconds
        seconds: u64,
    },

    /// HTTP 401 from a Helix endpoint, the access token expired or was revoked
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Response body or reason
        message: String,
    },

    /// Any other non-success HTTP status
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body could not be decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// The token endpoint refused the exchange. Not recoverable without a new
    /// refresh token or authorization code.
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Client could not be configured (bad base URL, TLS init failure)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl ApiError {
    /// Returns true if a later attempt has a reasonable chance to succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the process cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::TokenExchange { .. } | ApiError::Config { .. }
        )
    }

    /// Returns true for an expired or rejected access token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Creates a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a timeout error
    pub fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }

    /// Creates an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Creates a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a token exchange error
    pub fn token_exchange(status: u16, body: impl Into<String>) -> Self {
        Self::TokenExchange {
            status,
            body: body.into(),
        }
    }

    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Maps a non-success Helix response status to an error
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::unauthorized(body)
        } else {
            Self::status(status.as_u16(), body)
        }
    }

    /// Converts a transport failure, keeping the timeout distinct
    pub fn from_reqwest(err: &reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            Self::timeout(timeout_seconds)
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::serialization(format!("Failed to decode response: {}", err))
        } else {
            Self::network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for Twitch API operations
pub type Result<T> = std::result::Result<T, ApiError>;
