//! Search listing parsing: one table, one partial record per usable row.

use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use super::SearchError;
use crate::book::BookRecord;
use crate::config::Config;
use crate::markup::{attr, element_text, static_selectors};

static_selectors! {
    TABLE = "table";
    ROW = "tr";
    CELL = "td";
    LINK = "a[href]";
    SPAN = "span";
    IMAGE = "img";
}

const NO_MATCHES_MARKER: &str = "No files found.";
const MIN_CELLS: usize = 11;
const LOGGED_IN_BANNER_CLASS: &str = "aa-logged-in";
const SAMPLE_HTML_CHARS: usize = 500;

/// Column positions in the table display.
mod column {
    pub(super) const PREVIEW: usize = 0;
    pub(super) const TITLE: usize = 1;
    pub(super) const AUTHOR: usize = 2;
    pub(super) const PUBLISHER: usize = 3;
    pub(super) const YEAR: usize = 4;
    pub(super) const LANGUAGE: usize = 7;
    pub(super) const FORMAT: usize = 9;
    pub(super) const SIZE: usize = 10;
}

/// Parses a results listing into partial records sorted by preferred format.
///
/// # Errors
///
/// Returns [`SearchError::NotFound`] when the page carries the "no matches"
/// marker or has no results table.
pub(crate) fn parse_listing(
    html: &str,
    query: &str,
    config: &Config,
) -> Result<Vec<BookRecord>, SearchError> {
    if html.contains(NO_MATCHES_MARKER) {
        info!(query, "no books found");
        return Err(SearchError::not_found(query));
    }

    let document = Html::parse_document(html);
    let Some(table) = document.select(&TABLE).next() else {
        warn!(query, "no results table found");
        debug!(sample = %sample(html), "listing html");
        return Err(SearchError::not_found(query));
    };

    let rows: Vec<ElementRef<'_>> = table.select(&ROW).collect();
    let mut books: Vec<BookRecord> = rows.iter().filter_map(|row| parse_row(*row)).collect();
    let skipped = rows.len() - books.len();
    info!(
        parsed = books.len(),
        skipped,
        total = rows.len(),
        "search parsing complete"
    );
    if books.is_empty() {
        if let Some(first) = rows.first() {
            warn!(
                total = rows.len(),
                "no rows could be parsed; listing markup may have changed"
            );
            debug!(sample = %sample(&first.html()), "first listing row");
        }
    }

    let unranked = config.supported_formats.len();
    books.sort_by_key(|book| {
        book.format
            .as_deref()
            .and_then(|format| config.format_rank(format))
            .unwrap_or(unranked)
    });
    Ok(books)
}

/// Turns one table row into a partial record, or `None` when the row is
/// a banner, an ad, or lacks the id or title.
fn parse_row(row: ElementRef<'_>) -> Option<BookRecord> {
    if is_banner_or_ad(row) {
        return None;
    }

    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    if cells.len() < MIN_CELLS {
        debug!(
            expected = MIN_CELLS,
            found = cells.len(),
            "skipping row with too few cells"
        );
        return None;
    }

    let Some(href) = row.select(&LINK).next().and_then(|link| attr(&link, "href")) else {
        debug!("skipping row without a link");
        return None;
    };
    let id = href
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let Some(title) = cell_text(&cells, column::TITLE) else {
        debug!(book_id = %id, "skipping row without a title");
        return None;
    };

    let preview = cells
        .get(column::PREVIEW)
        .and_then(|cell| cell.select(&IMAGE).next())
        .and_then(|img| attr(&img, "src").map(ToString::to_string));

    let record = BookRecord {
        id,
        title,
        author: cell_text(&cells, column::AUTHOR),
        publisher: cell_text(&cells, column::PUBLISHER),
        year: cell_text(&cells, column::YEAR),
        language: cell_text(&cells, column::LANGUAGE),
        format: cell_text(&cells, column::FORMAT).map(|format| format.to_lowercase()),
        size: cell_text(&cells, column::SIZE),
        preview,
        ..BookRecord::default()
    };
    if !record.is_valid() {
        debug!(title = %record.title, "skipping row without an id");
        return None;
    }
    Some(record)
}

/// Text of the first `span` in the cell; absent rather than empty.
fn cell_text(cells: &[ElementRef<'_>], index: usize) -> Option<String> {
    let span = cells.get(index)?.select(&SPAN).next()?;
    let text = element_text(span);
    (!text.is_empty()).then_some(text)
}

fn is_banner_or_ad(row: ElementRef<'_>) -> bool {
    row.value().classes().any(|class| {
        let class = class.to_ascii_lowercase();
        class == LOGGED_IN_BANNER_CLASS
            || class == "ad"
            || class == "ads"
            || class.starts_with("ad-")
            || class.contains("advert")
    })
}

fn sample(html: &str) -> String {
    html.chars().take(SAMPLE_HTML_CHARS).collect()
}
