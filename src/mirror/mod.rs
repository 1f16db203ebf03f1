//! Per-mirror resolution protocols.
//!
//! # Architecture
//!
//! - [`MirrorResolver`] - Turns one candidate link into a directly downloadable URL
//! - [`MirrorKind`] - Protocol selected from the shape of the link
//! - `aux_mirror_links` - One-shot scrape of the auxiliary aggregator
//!
//! Resolution never fails loudly: every problem is logged and reported as
//! `None`, which the orchestrator reads as "try the next mirror".
//!
//! Partner servers may answer with a countdown instead of a link. The
//! resolver waits it out (capped at [`MAX_COUNTDOWN_SECS`]) and fetches the
//! page again, at most `countdown_retries` times. The wait ends immediately
//! when the cancellation token fires.

mod aggregator;

pub(crate) use aggregator::aux_mirror_links;

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::markup::{attr, element_text, static_selectors};
use crate::transport::{Transport, absolute_url};

/// Upper bound on a single countdown wait.
pub const MAX_COUNTDOWN_SECS: u64 = 600;

const FAST_DOWNLOAD_PATH: &str = "/dyn/api/fast_download.json";
const ZLIB_PREFIX: &str = "https://z-lib.";
const SLOW_DOWNLOAD_MARKER: &str = "/slow_download/";
const DOWNLOAD_NOW_TEXT: &str = "📚 Download now";
const GET_TEXT: &str = "GET";

static_selectors! {
    LINK = "a[href]";
    ZLIB_DOWNLOAD = "a.addDownloadedBook[href]";
    COUNTDOWN = "span.js-partner-countdown";
}

/// Resolution protocol, chosen from the link alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorKind {
    /// Donor JSON API returning `download_url`.
    FastApi,
    /// Z-Library book page with a confirm-download anchor.
    Zlib,
    /// Partner server page that may impose a countdown.
    SlowDownload,
    /// Any other page offering a "GET" anchor.
    Generic,
}

impl MirrorKind {
    /// Classifies `link`; the fast API is only recognized on the index itself.
    #[must_use]
    pub fn classify(link: &str, config: &Config) -> Self {
        let fast_api = format!("{}{FAST_DOWNLOAD_PATH}", config.base_url.trim_end_matches('/'));
        if link.starts_with(&fast_api) {
            Self::FastApi
        } else if link.starts_with(ZLIB_PREFIX) {
            Self::Zlib
        } else if link.contains(SLOW_DOWNLOAD_MARKER) {
            Self::SlowDownload
        } else {
            Self::Generic
        }
    }
}

/// What one fetch of a mirror page told us.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageOutcome {
    Link(String),
    Countdown(u64),
    InvalidCountdown(String),
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
struct FastDownloadResponse {
    #[serde(default)]
    download_url: Option<String>,
}

/// Resolves candidate mirror links into direct download URLs.
#[derive(Clone)]
pub struct MirrorResolver {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
}

impl MirrorResolver {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: Arc<Config>) -> Self {
        Self { transport, config }
    }

    /// Resolves `link` to an absolute download URL.
    ///
    /// `title` only appears in diagnostics. Returns `None` when the mirror
    /// cannot be resolved, the countdown budget runs out, or `cancel` fires.
    #[instrument(skip(self, cancel))]
    pub async fn resolve(&self, link: &str, title: &str, cancel: &CancellationToken) -> Option<String> {
        let kind = MirrorKind::classify(link, &self.config);
        debug!(?kind, "resolving mirror");
        let use_bypass = kind == MirrorKind::SlowDownload && self.config.use_bypass;
        let mut retries_left = self.config.countdown_retries;

        loop {
            if cancel.is_cancelled() {
                debug!("resolution cancelled");
                return None;
            }

            let page = match self.transport.fetch_page(link, use_bypass).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(%error, "failed to fetch mirror page");
                    return None;
                }
            };

            match inspect_page(kind, &page) {
                PageOutcome::Link(href) => {
                    let resolved = absolute_url(link, &href);
                    if resolved.is_none() {
                        warn!(%href, "download link could not be made absolute");
                    }
                    debug!(url = ?resolved, "extracted download url");
                    return resolved;
                }
                PageOutcome::Missing(what) => {
                    warn!(what, "no download url extracted");
                    return None;
                }
                PageOutcome::InvalidCountdown(raw) => {
                    warn!(%raw, "invalid countdown value");
                    return None;
                }
                PageOutcome::Countdown(seconds) => {
                    if retries_left == 0 {
                        warn!("max countdown retries reached, giving up");
                        return None;
                    }
                    let wait = seconds.min(MAX_COUNTDOWN_SECS);
                    info!(seconds = wait, retries_left, "waiting for countdown");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!("countdown wait cancelled");
                            return None;
                        }
                        () = tokio::time::sleep(Duration::from_secs(wait)) => {}
                    }
                    retries_left -= 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for MirrorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn inspect_page(kind: MirrorKind, page: &str) -> PageOutcome {
    match kind {
        MirrorKind::FastApi => match serde_json::from_str::<FastDownloadResponse>(page) {
            Ok(FastDownloadResponse {
                download_url: Some(url),
            }) if !url.trim().is_empty() => PageOutcome::Link(url),
            Ok(_) => PageOutcome::Missing("download_url field in fast download response"),
            Err(error) => {
                debug!(%error, "fast download response is not json");
                PageOutcome::Missing("parsable fast download response")
            }
        },
        MirrorKind::Zlib => {
            let document = Html::parse_document(page);
            document
                .select(&ZLIB_DOWNLOAD)
                .find_map(|anchor| attr(&anchor, "href").map(ToString::to_string))
                .map_or(PageOutcome::Missing("z-lib download anchor"), PageOutcome::Link)
        }
        MirrorKind::SlowDownload => {
            let document = Html::parse_document(page);
            if let Some(href) = anchor_with_text(&document, DOWNLOAD_NOW_TEXT) {
                return PageOutcome::Link(href);
            }
            match document.select(&COUNTDOWN).next() {
                Some(span) => {
                    let raw = element_text(span);
                    raw.parse::<u64>()
                        .map_or(PageOutcome::InvalidCountdown(raw), PageOutcome::Countdown)
                }
                None => PageOutcome::Missing("countdown or download link"),
            }
        }
        MirrorKind::Generic => {
            let document = Html::parse_document(page);
            anchor_with_text(&document, GET_TEXT)
                .map_or(PageOutcome::Missing("GET link"), PageOutcome::Link)
        }
    }
}

/// Href of the first anchor whose visible text is exactly `text`.
fn anchor_with_text(document: &Html, text: &str) -> Option<String> {
    document
        .select(&LINK)
        .find(|anchor| element_text(*anchor) == text)
        .and_then(|anchor| attr(&anchor, "href").map(ToString::to_string))
}
