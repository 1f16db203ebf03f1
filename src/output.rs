//! CLI output formatting and display helpers.

use bookdl_core::{BookRecord, parse_size_hint};

const PLACEHOLDER: &str = "-";
const MAX_FILE_STEM_CHARS: usize = 120;

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// One listing line: `<id>  <format> <size>  <title> / <author>`.
pub fn search_result_line(book: &BookRecord, width: usize) -> String {
    let line = format!(
        "{}  {:<5} {:>8}  {} / {}",
        book.id,
        book.format.as_deref().unwrap_or(PLACEHOLDER),
        book.size.as_deref().unwrap_or(PLACEHOLDER),
        book.title,
        book.author.as_deref().unwrap_or(PLACEHOLDER),
    );
    truncate_to_width(&line, width)
}

/// Key/value lines describing a full record, candidates last.
pub fn book_detail_lines(book: &BookRecord) -> Vec<String> {
    let field = |value: Option<&str>| value.unwrap_or(PLACEHOLDER).to_string();
    let size = match book.size.as_deref() {
        Some(size) => match parse_size_hint(size) {
            Some(bytes) => format!("{size} ({bytes} bytes)"),
            None => size.to_string(),
        },
        None => PLACEHOLDER.to_string(),
    };

    let mut lines = vec![
        format!("ID:        {}", book.id),
        format!("Title:     {}", book.title),
        format!("Author:    {}", field(book.author.as_deref())),
        format!("Publisher: {}", field(book.publisher.as_deref())),
        format!("Year:      {}", field(book.year.as_deref())),
        format!("Language:  {}", field(book.language.as_deref())),
        format!("Format:    {}", field(book.format.as_deref())),
        format!("Size:      {size}"),
    ];
    for (key, values) in &book.metadata {
        lines.push(format!("{key}: {}", values.join("; ")));
    }
    lines.push(format!("Mirrors:   {}", book.download_candidates.len()));
    lines.extend(
        book.download_candidates
            .iter()
            .enumerate()
            .map(|(index, link)| format!("  {:>2}. {link}", index + 1)),
    );
    lines
}

/// Default download file name: sanitized title plus the record's format.
pub fn default_file_name(book: &BookRecord) -> String {
    let stem: String = book
        .title
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .take(MAX_FILE_STEM_CHARS)
        .collect();
    let stem = stem.trim().trim_matches('.');
    let stem = if stem.is_empty() { book.id.as_str() } else { stem };
    match book.format.as_deref() {
        Some(format) if !format.is_empty() => format!("{stem}.{format}"),
        _ => stem.to_string(),
    }
}
