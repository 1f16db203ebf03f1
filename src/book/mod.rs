//! Book records and detail-page retrieval.
//!
//! # Architecture
//!
//! - [`BookRecord`] - Partial (listing) or full (detail) book description
//! - [`fetch_book`] - Fetches and parses `{base}/md5/{id}` into a full record
//! - [`DetailError`] - Fetch failures and missing page structure
//!
//! Parsing is synchronous and finishes before the auxiliary mirror is
//! queried, so no parsed document is held across an `.await`.

mod candidates;
mod detail;
mod error;
mod record;

pub use error::DetailError;
pub use record::BookRecord;

use std::collections::HashSet;

use tracing::{info, instrument};

use crate::config::Config;
use crate::mirror::aux_mirror_links;
use crate::transport::Transport;

use self::candidates::assemble_candidates;
use self::detail::{ParsedDetail, parse_detail_page};

/// URL of a book's detail page on the index.
#[must_use]
pub fn detail_url(config: &Config, book_id: &str) -> String {
    format!("{}/md5/{book_id}", config.base_url.trim_end_matches('/'))
}

/// Fetches the detail page for `book_id` and returns the full record.
///
/// Candidate mirrors are ordered by priority; the auxiliary mirror is only
/// consulted when bypass-capable fetching is enabled.
///
/// # Errors
///
/// Returns [`DetailError::FetchFailed`] when the page cannot be retrieved and
/// [`DetailError::Structure`] when it lacks a container with no fallback.
#[instrument(skip(transport, config))]
pub async fn fetch_book(
    transport: &dyn Transport,
    config: &Config,
    book_id: &str,
) -> Result<BookRecord, DetailError> {
    let url = detail_url(config, book_id);
    let html = transport
        .fetch_page(&url, false)
        .await
        .map_err(|source| DetailError::fetch_failed(book_id, source))?;

    let ParsedDetail { mut record, buckets } = parse_detail_page(&html, book_id, config)?;

    let aux_links = if config.use_bypass {
        aux_mirror_links(transport, config, book_id).await
    } else {
        HashSet::new()
    };
    record.download_candidates = assemble_candidates(buckets, aux_links, config);

    info!(
        book_id,
        title = %record.title,
        candidates = record.download_candidates.len(),
        "fetched book info"
    );
    Ok(record)
}
