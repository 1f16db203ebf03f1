//! Error types for search.

use thiserror::Error;

use crate::transport::TransportError;

/// Hard failures of a search; per-row problems never surface here.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The listing page could not be retrieved.
    #[error("failed to fetch search results: {source}")]
    FetchFailed {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The index reported zero matches or returned no results table.
    #[error("no books found for '{query}'")]
    NotFound {
        /// The free-text query that was searched.
        query: String,
    },
}

impl SearchError {
    /// Creates a not-found error.
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Returns true for the "no matches" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<TransportError> for SearchError {
    fn from(source: TransportError) -> Self {
        Self::FetchFailed { source }
    }
}
