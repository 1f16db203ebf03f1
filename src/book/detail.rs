//! Detail page parsing: positional text layout, metadata, mirror buckets.
//!
//! The detail page carries no semantic markup for title/author/format. The
//! data block is a flat list of text entries in which the "format · size"
//! line acts as an anchor: the three entries before it are title, author and
//! publisher. Every offset is clamped; only missing containers are fatal.

use std::collections::{BTreeMap, BTreeSet};

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::candidates::{MirrorBuckets, classify_anchors};
use super::{BookRecord, DetailError};
use crate::config::Config;
use crate::markup::{attr, child_texts, static_selectors};

static_selectors! {
    PRIMARY_CONTAINER = "body > main > div:nth-of-type(1)";
    PREVIEW_IMAGE = "div:nth-of-type(1) > img";
    MAIN_INNER = "div.main-inner";
    DIV = "div";
}

const SEPARATOR_MARKER: char = '·';
const FIELD_DELIMITER: &str = " · ";
/// Index of the "format · size" entry when no entry carries the marker.
const DEFAULT_SEPARATOR_INDEX: usize = 6;
const TITLE_OFFSET: usize = 3;
const AUTHOR_OFFSET: usize = 2;
const PUBLISHER_OFFSET: usize = 1;
/// The metadata container is this many child nodes from the end of the data block.
const METADATA_OFFSET_FROM_END: usize = 6;
const SIZE_UNITS: [&str; 3] = ["mb", "kb", "gb"];
const TITLE_DECORATION: char = '🔍';
const RELEVANT_METADATA_PREFIXES: [&str; 6] =
    ["isbn-", "alternative", "asin", "goodreads", "language", "year"];

/// A parsed detail page before the auxiliary mirror is consulted.
#[derive(Debug)]
pub(crate) struct ParsedDetail {
    /// Record with every field except `download_candidates`.
    pub(crate) record: BookRecord,
    pub(crate) buckets: MirrorBuckets,
}

/// Parses a detail page into a record and its mirror buckets.
///
/// # Errors
///
/// Returns [`DetailError::Structure`] when the primary container, the
/// `main-inner` anchor, the data block after it, or any non-empty text entry
/// is missing.
pub(crate) fn parse_detail_page(
    html: &str,
    book_id: &str,
    config: &Config,
) -> Result<ParsedDetail, DetailError> {
    debug!(book_id, "parsing book info page");
    let document = Html::parse_document(html);

    let primary = document.select(&PRIMARY_CONTAINER).next().ok_or_else(|| {
        warn!(book_id, "main data container missing");
        DetailError::structure(book_id, "main data container missing")
    })?;
    let preview = primary
        .select(&PREVIEW_IMAGE)
        .next()
        .and_then(|img| attr(&img, "src").map(ToString::to_string));

    let data = data_block(&document, book_id)?;
    let child_count = data.children().count();
    if child_count == 0 {
        warn!(book_id, "data block has no children");
        return Err(DetailError::structure(book_id, "data block has no children"));
    }

    let entries: Vec<String> = child_texts(data)
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect();
    if entries.is_empty() {
        warn!(book_id, "no text entries in data block");
        return Err(DetailError::structure(book_id, "no text entries in data block"));
    }

    let layout = TextLayout::locate(&entries, book_id);
    let (format, size) = split_format_and_size(&entries[layout.separator], config);

    let mut record = BookRecord {
        id: book_id.to_string(),
        title: layout.title(&entries, book_id),
        author: layout.author(&entries),
        publisher: layout.publisher(&entries),
        format,
        size,
        preview,
        ..BookRecord::default()
    };
    if record.author.is_none() {
        debug!(book_id, separator = layout.separator, "author entry out of range");
    }
    if record.publisher.is_none() {
        debug!(book_id, separator = layout.separator, "publisher entry out of range");
    }

    record.metadata = metadata_container(data, child_count)
        .map(extract_metadata)
        .unwrap_or_else(|| {
            warn!(book_id, children = child_count, "metadata container unavailable");
            BTreeMap::new()
        });
    let language = record.metadata_value("Language").map(ToString::to_string);
    if language.is_some() {
        record.language = language;
    }
    let year = record.metadata_value("Year").map(ToString::to_string);
    if year.is_some() {
        record.year = year;
    }

    let buckets = classify_anchors(&document);
    Ok(ParsedDetail { record, buckets })
}

/// The first `div` that follows the `main-inner` container in document order.
fn data_block<'a>(document: &'a Html, book_id: &str) -> Result<ElementRef<'a>, DetailError> {
    let main_inner = document.select(&MAIN_INNER).next().ok_or_else(|| {
        warn!(book_id, "no main-inner container");
        DetailError::structure(book_id, "no main-inner container")
    })?;
    document
        .select(&DIV)
        .skip_while(|div| div.id() != main_inner.id())
        .nth(1)
        .ok_or_else(|| {
            warn!(book_id, "no data block after main-inner");
            DetailError::structure(book_id, "no data block after main-inner")
        })
}

/// Position of the "format · size" entry within the text entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextLayout {
    separator: usize,
}

impl TextLayout {
    /// `entries` must be non-empty.
    fn locate(entries: &[String], book_id: &str) -> Self {
        let last = entries.len().saturating_sub(1);
        let mut separator = entries
            .iter()
            .position(|entry| entry.contains(SEPARATOR_MARKER))
            .unwrap_or(DEFAULT_SEPARATOR_INDEX);
        if separator > last {
            warn!(
                book_id,
                separator,
                entries = entries.len(),
                "separator index out of range"
            );
            separator = DEFAULT_SEPARATOR_INDEX.min(last);
        }
        Self { separator }
    }

    fn title(self, entries: &[String], book_id: &str) -> String {
        let index = self
            .separator
            .saturating_sub(TITLE_OFFSET)
            .min(entries.len().saturating_sub(1));
        if self.separator < TITLE_OFFSET {
            warn!(book_id, index, "title index clamped");
        }
        let title = entries
            .get(index)
            .map(|entry| entry.trim_matches(TITLE_DECORATION).trim())
            .unwrap_or_default();
        if title.is_empty() {
            format!("Unknown Title (ID: {book_id})")
        } else {
            title.to_string()
        }
    }

    fn author(self, entries: &[String]) -> Option<String> {
        self.offset_entry(entries, AUTHOR_OFFSET)
    }

    fn publisher(self, entries: &[String]) -> Option<String> {
        self.offset_entry(entries, PUBLISHER_OFFSET)
    }

    fn offset_entry(self, entries: &[String], offset: usize) -> Option<String> {
        self.separator
            .checked_sub(offset)
            .and_then(|index| entries.get(index))
            .cloned()
    }
}

/// Picks format and size out of a "lang · format · size · file" line.
fn split_format_and_size(line: &str, config: &Config) -> (Option<String>, Option<String>) {
    let lowered = line.to_lowercase();
    let fields: Vec<&str> = lowered.split(FIELD_DELIMITER).map(str::trim).collect();

    let mut format = fields
        .iter()
        .find(|field| config.supports_format(field))
        .map(|field| (*field).to_string());
    let mut size = fields
        .iter()
        .find(|field| SIZE_UNITS.iter().any(|unit| field.contains(unit)))
        .map(|field| (*field).to_string());

    if format.is_none() {
        format = fields
            .iter()
            .find(|field| !field.is_empty() && !field.contains(' '))
            .map(|field| (*field).to_string());
    }
    if size.is_none() {
        size = fields
            .iter()
            .find(|field| field.contains('.'))
            .map(|field| (*field).to_string());
    }
    (format, size)
}

fn metadata_container(data: ElementRef<'_>, child_count: usize) -> Option<ElementRef<'_>> {
    let index = child_count.checked_sub(METADATA_OFFSET_FROM_END)?;
    data.children().nth(index).and_then(ElementRef::wrap)
}

/// Collects allow-listed key/value pairs from the first list inside `container`.
fn extract_metadata(container: ElementRef<'_>) -> BTreeMap<String, Vec<String>> {
    let Some(list) = container.select(&DIV).next() else {
        debug!("no list in metadata container");
        return BTreeMap::new();
    };

    let mut collected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in list.children().filter_map(ElementRef::wrap) {
        let parts = child_texts(entry);
        let (Some(key), Some(value)) = (parts.first(), parts.get(1)) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        collected.entry(key.clone()).or_default().insert(value.clone());
    }

    let metadata: BTreeMap<String, Vec<String>> = collected
        .into_iter()
        .filter(|(key, _)| is_relevant_metadata_key(key))
        .map(|(key, values)| (key, values.into_iter().collect()))
        .collect();
    debug!(fields = metadata.len(), "extracted book metadata");
    metadata
}

fn is_relevant_metadata_key(key: &str) -> bool {
    let key = key.to_lowercase();
    !key.contains("filename")
        && RELEVANT_METADATA_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}
