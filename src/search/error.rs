//! Search errors / 搜索错误

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Superseded by a newer search, never shown to the user / 被新搜索取代
    #[error("search cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Transport(String),

    #[error("search service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("invalid search response: {0}")]
    Decode(String),

    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),
}

impl SearchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::Cancelled)
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SearchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            SearchError::Remote {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            SearchError::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for SearchError {
    fn from(e: url::ParseError) -> Self {
        SearchError::InvalidEndpoint(e.to_string())
    }
}
