//! Parsing of the human-readable sizes shown by the index ("12.5 MB").

use tracing::debug;

const UNITS: [(&str, u64); 3] = [
    ("gb", 1024 * 1024 * 1024),
    ("mb", 1024 * 1024),
    ("kb", 1024),
];

/// Converts a size hint such as `"12.5 MB"` or `"800,2 kb"` to bytes.
///
/// Units are matched case-insensitively; a decimal comma is accepted.
/// Returns `None` for unknown units, negative or unparseable numbers.
#[must_use]
pub fn parse_size_hint(hint: &str) -> Option<u64> {
    let normalized = hint.trim().to_ascii_lowercase().replace(',', ".");
    let (number, multiplier) = UNITS.iter().find_map(|(unit, multiplier)| {
        normalized
            .strip_suffix(unit)
            .map(|number| (number.trim(), *multiplier))
    })?;

    let Ok(value) = number.parse::<f64>() else {
        debug!(hint, "unparseable size hint");
        return None;
    };
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let bytes = (value * multiplier as f64).round() as u64;
    Some(bytes)
}
