//! HTTP collaborator contract consumed by the search, detail, and mirror code.
//!
//! # Architecture
//!
//! - [`Transport`] - Async trait for page fetches and file transfers
//! - [`HttpTransport`] - reqwest-backed implementation with optional external bypasser
//! - [`absolute_url`] - Relative-to-absolute link resolution shared by all parsers
//! - [`TransportError`] - Structured failure reasons
//!
//! Parsers never talk to reqwest directly, so tests can swap in an in-memory
//! transport and exercise every mirror protocol without sockets.

mod error;
mod http;

pub use error::TransportError;
pub use http::HttpTransport;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Progress sink receiving the completed fraction of a transfer in `[0, 1]`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Fetching primitives the core relies on.
///
/// # Object Safety
///
/// This trait uses `async_trait` so components can hold `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches a page as text.
    ///
    /// `use_bypass` asks for anti-bot bypass capable fetching where available.
    /// An empty body is reported as [`TransportError::EmptyBody`].
    async fn fetch_page(&self, url: &str, use_bypass: bool) -> Result<String, TransportError>;

    /// Transfers a file body into memory.
    ///
    /// `size_hint` is the human-readable size shown by the index (e.g. "12 MB"),
    /// used for progress when the server omits `Content-Length`. Implementations
    /// must check `cancel` between chunks and return [`TransportError::Cancelled`].
    async fn fetch_bytes(
        &self,
        url: &str,
        size_hint: Option<&str>,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Resolves a possibly relative link against `base`.
///
/// Returns the value as-is if it already starts with `http://` or `https://`;
/// normalizes `//...` to `https:...`; otherwise joins with `base`. Blank or
/// unjoinable input yields `None`.
#[must_use]
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if href.starts_with("//") {
        return Some(format!("https:{href}"));
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .ok()
        .map(|url| url.to_string())
}
