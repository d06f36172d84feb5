//! Canonical header construction.
//!
//! Flattens the (possibly multi-row, merged-cell) header region of a sheet
//! into one name per column. Merged regions contribute their anchor value to
//! every covered column, and the last non-blank value per column is carried
//! downward so group labels span their children.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::table::{Cell, MergedRegion, merged_region_at};

/// How multi-row header parts collapse into a single column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum ConcatMode {
    /// Keep only the deepest header part.
    LeafOnly,
    /// Join every hierarchical part with the separator.
    Breadcrumb,
}

/// Default separator between breadcrumb parts.
pub const DEFAULT_SEPARATOR: &str = " | ";

/// Builds one canonical name per column from the designated header rows.
///
/// Pure function of its inputs: the same grid, rows, regions, and mode always
/// produce the same names. Duplicate names are allowed; downstream lookups
/// resolve by first match.
pub fn build_canonical_headers(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
) -> Vec<String> {
    if header_rows.is_empty() {
        return Vec::new();
    }

    let width = header_rows
        .iter()
        .map(|&r| grid.get(r).map_or(0, Vec::len))
        .max()
        .unwrap_or(0);

    let mut names = Vec::with_capacity(width);
    for col in 0..width {
        let mut parts: Vec<String> = Vec::with_capacity(header_rows.len());
        let mut carried = String::new();
        for &row in header_rows {
            let resolved = resolve_display_value(grid, merged, row, col);
            if !resolved.is_empty() {
                carried = resolved;
            }
            parts.push(carried.clone());
        }
        names.push(collapse_parts(&parts, col, mode, separator));
    }
    names
}

/// The value a spreadsheet would display at (row, col): the merged region's
/// anchor value when the coordinate sits inside one, the cell itself
/// otherwise.
fn resolve_display_value(
    grid: &[Vec<Cell>],
    merged: &[MergedRegion],
    row: usize,
    col: usize,
) -> String {
    let (lookup_row, lookup_col) = match merged_region_at(merged, row, col) {
        Some(region) => region.anchor(),
        None => (row, col),
    };
    grid.get(lookup_row)
        .and_then(|r| r.get(lookup_col))
        .map(|cell| cell.to_text().trim().to_string())
        .unwrap_or_default()
}

fn collapse_parts(parts: &[String], col: usize, mode: ConcatMode, separator: &str) -> String {
    match mode {
        ConcatMode::LeafOnly => match parts.iter().rev().find(|p| !p.is_empty()) {
            Some(leaf) => leaf.clone(),
            None => synthetic_name(col),
        },
        ConcatMode::Breadcrumb => {
            // Every header row contributes its (possibly carried) part, so a
            // label repeated by a vertical merge appears once per row.
            if parts.iter().all(|p| p.is_empty()) {
                synthetic_name(col)
            } else {
                parts.join(separator)
            }
        }
    }
}

/// Name assigned to a column whose header cells carry no usable text.
pub fn synthetic_name(col: usize) -> String {
    format!("Column {}", col + 1)
}
