//! Error types for detail page retrieval.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by [`fetch_book`](super::fetch_book).
#[derive(Debug, Error)]
pub enum DetailError {
    /// The detail page could not be retrieved.
    #[error("failed to fetch book info for {id}: {source}")]
    FetchFailed {
        /// Book identifier.
        id: String,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// A container with no fallback is missing from the page.
    #[error("failed to parse book info structure for {id}: {reason}")]
    Structure {
        /// Book identifier.
        id: String,
        /// Which container was missing.
        reason: String,
    },
}

impl DetailError {
    /// Creates a fetch failure.
    pub fn fetch_failed(id: impl Into<String>, source: TransportError) -> Self {
        Self::FetchFailed {
            id: id.into(),
            source,
        }
    }

    /// Creates a structural parse failure.
    pub fn structure(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structure {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
