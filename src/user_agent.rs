//! Shared User-Agent strings for page and file requests.
//!
//! Mirror pages frequently reject obvious tool traffic, so page fetches use a
//! browser-like agent while still carrying the crate version in a comment.

/// Browser-like User-Agent used for index, mirror, and file requests.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default User-Agent for every request made by [`HttpTransport`](crate::transport::HttpTransport).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{BROWSER_USER_AGENT} bookdl/{version}")
}
