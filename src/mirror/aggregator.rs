//! Auxiliary aggregator scrape feeding extra partner-server links.

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::markup::{attr, static_selectors};
use crate::transport::{Transport, absolute_url};

use super::SLOW_DOWNLOAD_MARKER;

static_selectors! {
    LINK = "a[href]";
}

/// Slow-download links offered by the auxiliary aggregator for `book_id`.
///
/// The page sits behind an anti-bot wall, so it is always fetched with
/// bypass requested. Disabled, failed, or empty scrapes yield an empty set.
pub(crate) async fn aux_mirror_links(
    transport: &dyn Transport,
    config: &Config,
    book_id: &str,
) -> HashSet<String> {
    if !config.allow_aux_mirror {
        debug!("auxiliary mirror disabled");
        return HashSet::new();
    }

    let url = format!(
        "{}/md5/{book_id}",
        config.aux_mirror_base_url.trim_end_matches('/')
    );
    info!(book_id, %url, "fetching auxiliary mirror page through the bypasser");
    let html = match transport.fetch_page(&url, true).await {
        Ok(html) => html,
        Err(error) => {
            warn!(book_id, %error, "failed to fetch auxiliary mirror page");
            return HashSet::new();
        }
    };

    let links = slow_download_links(&html, &url);
    if links.is_empty() {
        warn!(book_id, "no slow_download links on auxiliary mirror page");
    } else {
        debug!(book_id, count = links.len(), "found auxiliary mirror links");
    }
    links
}

fn slow_download_links(html: &str, page_url: &str) -> HashSet<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK)
        .filter_map(|anchor| attr(&anchor, "href").map(ToString::to_string))
        .filter(|href| href.contains(SLOW_DOWNLOAD_MARKER))
        .filter_map(|href| absolute_url(page_url, &href))
        .collect()
}
