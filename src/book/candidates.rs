//! Mirror-candidate discovery on a detail page and priority assembly.
//!
//! Anchors are sorted into buckets by their visible text and the text that
//! follows them. Buckets are unordered sets; only the order *between*
//! buckets is meaningful.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::debug;

use crate::config::Config;
use crate::markup::{attr, compile_static_regex, element_text, following_text, static_selectors};
use crate::transport::absolute_url;

static_selectors! {
    ANCHOR = "a";
}

static LIBGEN_HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"libgen\.(lc|is|bz|st)"));

const CANONICAL_LIBGEN_HOST: &str = "libgen.gl";
const SLOW_PARTNER_PREFIX: &str = "slow partner server";
const LIBGEN_CALL_TO_ACTION: &str = "click get at the top";
const ZLIB_PREFIX: &str = "z-lib";
const HIDDEN_NETWORK_MARKER: &str = ".onion/";

/// Mirror links found on a detail page, grouped by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct MirrorBuckets {
    /// Partner servers advertising no waitlist.
    pub(crate) slow_no_waitlist: HashSet<String>,
    /// Partner servers with some other waitlist condition.
    pub(crate) slow_with_waitlist: HashSet<String>,
    /// Library Genesis family, hostnames canonicalized.
    pub(crate) libgen: HashSet<String>,
    /// Z-Library links, hidden-network variants excluded.
    pub(crate) zlib: HashSet<String>,
}

impl MirrorBuckets {
    pub(crate) fn len(&self) -> usize {
        self.slow_no_waitlist.len() + self.slow_with_waitlist.len() + self.libgen.len() + self.zlib.len()
    }
}

/// Scans every anchor of `document` and buckets the mirror links.
pub(crate) fn classify_anchors(document: &Html) -> MirrorBuckets {
    let mut buckets = MirrorBuckets::default();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = attr(&anchor, "href") else {
            continue;
        };
        let text = element_text(anchor).to_lowercase();
        let following = following_text(anchor).unwrap_or_default().to_lowercase();

        if text.starts_with(SLOW_PARTNER_PREFIX) {
            if !following.contains("waitlist") {
                continue;
            }
            if following.contains("no waitlist") {
                buckets.slow_no_waitlist.insert(href.to_string());
            } else {
                buckets.slow_with_waitlist.insert(href.to_string());
            }
        } else if strip_quotes(&following).contains(LIBGEN_CALL_TO_ACTION) {
            let canonical = LIBGEN_HOST_RE.replace_all(href, CANONICAL_LIBGEN_HOST);
            buckets.libgen.insert(canonical.into_owned());
        } else if text.starts_with(ZLIB_PREFIX) && !href.contains(HIDDEN_NETWORK_MARKER) {
            buckets.zlib.insert(href.to_string());
        }
    }

    debug!(
        slow_no_waitlist = buckets.slow_no_waitlist.len(),
        slow_with_waitlist = buckets.slow_with_waitlist.len(),
        libgen = buckets.libgen.len(),
        zlib = buckets.zlib.len(),
        total = buckets.len(),
        "classified mirror anchors"
    );
    buckets
}

/// Orders the buckets by priority and resolves every link against the index.
///
/// Order: aux (if prioritized), no-waitlist partners (bypass only), libgen,
/// aux (otherwise), waitlisted partners (bypass only), z-lib. Links that
/// cannot be made absolute are dropped, and duplicates keep their first slot.
pub(crate) fn assemble_candidates(
    buckets: MirrorBuckets,
    aux_links: HashSet<String>,
    config: &Config,
) -> Vec<String> {
    let MirrorBuckets {
        slow_no_waitlist,
        slow_with_waitlist,
        libgen,
        zlib,
    } = buckets;

    let ordered = [
        if config.prioritize_aux_mirror { aux_links.clone() } else { HashSet::new() },
        if config.use_bypass { slow_no_waitlist } else { HashSet::new() },
        libgen,
        if config.prioritize_aux_mirror { HashSet::new() } else { aux_links },
        if config.use_bypass { slow_with_waitlist } else { HashSet::new() },
        zlib,
    ];

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .flatten()
        .filter_map(|link| absolute_url(&config.base_url, &link))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

fn strip_quotes(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}' | '\u{2018}' | '\u{2019}'))
        .collect()
}
