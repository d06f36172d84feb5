//! Tolerant value normalization.
//!
//! Turns a raw cell into the canonical string used for equality checks by the
//! filter and comparison engines. Comparisons are case-insensitive at the
//! call site, never inside the normalizer itself.

use crate::table::Cell;

/// Check-mark symbol that the glyph substitution maps onto.
pub const CHECK_MARK: &str = "\u{2713}";

/// Mis-decoded dingbat glyph seen in exported sheets; a lone "P" from that
/// font renders as a check mark in the original document.
const DINGBAT_TICK: &str = "P";

/// Fixed-point rendering of a number that suppresses trailing zero-only
/// decimals while preserving up to ten fractional digits: `100.0` becomes
/// `"100"`, `100.5` stays `"100.5"`.
pub fn format_number(value: f64) -> String {
    let mut rendered = format!("{value:.10}");
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    rendered
}

/// Canonical comparison form of a cell: blank becomes the empty string,
/// numbers are fixed-point formatted, everything else keeps its text form.
/// The value is always trimmed before the glyph substitution.
pub fn normalize_cell(cell: &Cell) -> String {
    normalize_text(&cell.to_text())
}

/// Same normalization for a rule literal or any other raw string.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.trim();
    if text == DINGBAT_TICK {
        return CHECK_MARK.to_string();
    }
    text.to_string()
}

/// Comparison form used by the diff engine for string cells, honoring the
/// profile's trim and case flags.
pub fn comparison_form(raw: &str, trim_whitespace: bool, ignore_case: bool) -> String {
    let text = if trim_whitespace { raw.trim() } else { raw };
    if ignore_case {
        text.to_lowercase()
    } else {
        text.to_string()
    }
}
