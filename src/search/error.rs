use crate::entity::EntityId;
use thiserror::Error;

/// Structured failure of one search engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Document {id} not found in {index}")]
    NotFound { index: String, id: EntityId },

    #[error("Version conflict on {index}/{id}")]
    Conflict { index: String, id: EntityId },

    #[error("Search engine error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl SearchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::NotFound { .. })
    }

    /// Transport failures, throttling, and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Transport(_) => true,
            SearchError::Http { status, .. } => *status == 429 || *status >= 500,
            SearchError::NotFound { .. } | SearchError::Conflict { .. } => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        SearchError::Transport(error.to_string())
    }
}
