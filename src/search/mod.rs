//! Searching the index.
//!
//! # Architecture
//!
//! - [`SearchFilters`] - Optional narrowing (ISBN, language, format, author/title terms)
//! - [`build_search_url`] - Deterministic listing URL construction
//! - [`search_books`] - Fetch + parse into partial [`BookRecord`]s
//! - [`SearchError`] - The two hard failures a search can have
//!
//! Malformed, advertising, and banner rows are skipped with a debug log and
//! never fail the search.

mod error;
mod filters;
mod listing;
mod query;

pub use error::SearchError;
pub use filters::SearchFilters;
pub use query::build_search_url;

use tracing::{debug, info, instrument};

use crate::book::BookRecord;
use crate::config::Config;
use crate::transport::Transport;

use self::listing::parse_listing;

/// Searches the index and returns partial records sorted by preferred format.
///
/// # Errors
///
/// Returns [`SearchError::FetchFailed`] when the listing cannot be fetched and
/// [`SearchError::NotFound`] when the index reports no matches or the page
/// has no results table.
#[instrument(skip(transport, config, filters))]
pub async fn search_books(
    transport: &dyn Transport,
    config: &Config,
    query: &str,
    filters: &SearchFilters,
) -> Result<Vec<BookRecord>, SearchError> {
    info!(?filters, "starting search");
    let url = build_search_url(config, query, filters);
    debug!(%url, "search url");

    let html = transport.fetch_page(&url, false).await?;
    let books = parse_listing(&html, query, config)?;

    info!(count = books.len(), "returning search results");
    Ok(books)
}
