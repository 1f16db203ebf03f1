//! Search URL construction. Pure string building, no I/O.

use std::fmt::Write as _;

use urlencoding::encode;

use super::SearchFilters;
use crate::config::Config;

const FIXED_PARAMS: &str =
    "index=&page=1&display=table&acc=aa_download&acc=external_download";
const ALL_LANGUAGES: &str = "all";

/// Builds the listing URL for `query` under `filters`.
///
/// Parameter order is fixed: `ext*`, `q`, `lang*`, `sort?`, `content*`, then
/// the indexed `termtype_i`/`termval_i` pairs (authors first, then titles,
/// numbered from 1). Identical inputs always produce identical output.
#[must_use]
pub fn build_search_url(config: &Config, query: &str, filters: &SearchFilters) -> String {
    let mut url = format!(
        "{}/search?{FIXED_PARAMS}",
        config.base_url.trim_end_matches('/')
    );

    let formats = if filters.format.is_empty() {
        &config.supported_formats
    } else {
        &filters.format
    };
    for format in formats {
        push_param(&mut url, "ext", format);
    }

    push_param(&mut url, "q", &effective_query(query, &filters.isbn));

    let languages = if filters.lang.is_empty() {
        &config.default_languages
    } else {
        &filters.lang
    };
    for language in languages.iter().filter(|lang| *lang != ALL_LANGUAGES) {
        push_param(&mut url, "lang", language);
    }

    if let Some(sort) = filters.sort.as_deref().filter(|sort| !sort.is_empty()) {
        push_param(&mut url, "sort", sort);
    }

    for content in &filters.content {
        push_param(&mut url, "content", content);
    }

    let terms = filters
        .author
        .iter()
        .map(|value| ("author", value))
        .chain(filters.title.iter().map(|value| ("title", value)));
    for (index, (term_type, value)) in (1..).zip(terms) {
        let _ = write!(
            url,
            "&termtype_{index}={term_type}&termval_{index}={}",
            encode(value)
        );
    }

    url
}

/// Rewrites the query as an ISBN OR-clause conjoined with the free text.
fn effective_query(query: &str, isbns: &[String]) -> String {
    if isbns.is_empty() {
        return query.to_string();
    }
    let clauses = isbns
        .iter()
        .map(|isbn| format!("('isbn13:{isbn}' || 'isbn10:{isbn}')"))
        .collect::<Vec<_>>()
        .join(" || ");
    format!("({clauses}) {query}")
}

fn push_param(url: &mut String, name: &str, value: &str) {
    let _ = write!(url, "&{name}={}", encode(value));
}
