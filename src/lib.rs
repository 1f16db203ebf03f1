//! Book discovery and mirror resolution core.
//!
//! This library searches a shadow-library index that only exposes
//! human-oriented HTML pages, extracts structured book records from those
//! pages, and walks each book's download mirrors until one of them yields a
//! directly streamable file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Immutable policy shared by every component
//! - [`search`] - Query construction and search-listing parsing
//! - [`book`] - Book records and detail-page parsing (mirror candidates, metadata)
//! - [`mirror`] - Per-mirror resolution protocols with cancellable countdown retries
//! - [`download`] - Mirror fallback chain ending in a file on disk
//! - [`transport`] - HTTP collaborator contract and its reqwest implementation
//!
//! No component keeps state between calls; searches and downloads for
//! different books may run concurrently on the same [`Catalog`].

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod book;
pub mod config;
pub mod download;
pub(crate) mod markup;
pub mod mirror;
pub mod search;
#[cfg(test)]
pub(crate) mod test_support;
pub mod transport;
pub(crate) mod user_agent;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

// Re-export commonly used types
pub use book::{BookRecord, DetailError, fetch_book};
pub use config::{Config, ConfigError};
pub use download::{DownloadOrchestrator, parse_size_hint};
pub use mirror::MirrorResolver;
pub use search::{SearchError, SearchFilters, build_search_url, search_books};
pub use transport::{HttpTransport, ProgressCallback, Transport, TransportError, absolute_url};

/// Entry point bundling a transport with the configuration every call needs.
///
/// Cheap to clone; each method is independent of the others.
#[derive(Clone)]
pub struct Catalog {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
}

impl Catalog {
    /// Creates a catalog over an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: Arc<Config>) -> Self {
        Self { transport, config }
    }

    /// Creates a catalog backed by [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the HTTP client cannot be built.
    pub fn with_http(config: Config) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), Arc::new(config)))
    }

    /// Returns the configuration this catalog was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a search and returns partial records sorted by preferred format.
    ///
    /// # Errors
    ///
    /// See [`search_books`].
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<BookRecord>, SearchError> {
        search_books(self.transport.as_ref(), &self.config, query, filters).await
    }

    /// Fetches the full record, including mirror candidates, for one book.
    ///
    /// # Errors
    ///
    /// See [`fetch_book`].
    pub async fn book(&self, book_id: &str) -> Result<BookRecord, DetailError> {
        fetch_book(self.transport.as_ref(), &self.config, book_id).await
    }

    /// Downloads `book` to `destination`, trying its mirrors in order.
    ///
    /// Returns `false` when every mirror failed or the token was cancelled.
    pub async fn download(
        &self,
        book: &mut BookRecord,
        destination: &Path,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> bool {
        DownloadOrchestrator::new(Arc::clone(&self.transport), Arc::clone(&self.config))
            .download(book, destination, progress, cancel)
            .await
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
