//! Header-row detection heuristic.
//!
//! Scores the first rows of a sheet on style and content signals and proposes
//! which of them form the header. This is advice for a human operator, not a
//! guarantee; numeric-only or empty sheets legitimately yield a partial or
//! empty proposal.

use log::debug;
use serde::Serialize;

use crate::table::{Cell, MergedRegion, merged_region_at};

/// Rows scanned from the top of the sheet.
const SCAN_LIMIT: usize = 20;
/// Minimum confidence for a row to be proposed as part of the header.
const SCORE_THRESHOLD: f64 = 0.1;
/// Headers taller than this are not proposed automatically.
const MAX_HEADER_ROWS: usize = 3;

const BOLD_WEIGHT: f64 = 0.4;
const STRING_WEIGHT: f64 = 0.2;
const NUMERIC_WEIGHT: f64 = -0.5;
const MERGED_WEIGHT: f64 = 0.5;

/// Confidence score for one scanned row, kept for operator review.
#[derive(Debug, Clone, Serialize)]
pub struct RowSignal {
    pub row: usize,
    pub score: f64,
    pub reason: String,
}

/// Outcome of a detection pass: the proposed header rows (ascending) plus the
/// full per-row score list.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderDetection {
    pub header_rows: Vec<usize>,
    pub signals: Vec<RowSignal>,
}

/// Scores up to the first twenty rows and proposes the header rows.
///
/// `bold` carries one flag per cell per row, as read from the sheet's styles;
/// hosts without style information (CSV) pass an empty slice and the bold
/// signal contributes nothing.
pub fn detect_header_rows(
    grid: &[Vec<Cell>],
    bold: &[Vec<bool>],
    merged: &[MergedRegion],
) -> HeaderDetection {
    let mut signals = Vec::new();
    for (row_idx, row) in grid.iter().take(SCAN_LIMIT).enumerate() {
        signals.push(score_row(row_idx, row, bold.get(row_idx), merged));
    }

    let mut ranked: Vec<usize> = (0..signals.len()).collect();
    ranked.sort_by(|&a, &b| {
        signals[b]
            .score
            .partial_cmp(&signals[a].score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut header_rows: Vec<usize> = ranked
        .into_iter()
        .filter(|&idx| signals[idx].score > SCORE_THRESHOLD)
        .take(MAX_HEADER_ROWS)
        .collect();
    // Selection is score-driven, but header rows must come back out in
    // original sheet order.
    header_rows.sort_unstable();

    debug!("header detection proposed rows {header_rows:?}");
    HeaderDetection {
        header_rows,
        signals,
    }
}

fn score_row(
    row_idx: usize,
    row: &[Cell],
    bold: Option<&Vec<bool>>,
    merged: &[MergedRegion],
) -> RowSignal {
    let total = row.len();
    if total == 0 {
        return RowSignal {
            row: row_idx,
            score: 0.0,
            reason: "empty row".to_string(),
        };
    }

    let mut bold_count = 0usize;
    let mut string_count = 0usize;
    let mut numeric_count = 0usize;
    let mut merged_count = 0usize;

    for (col, cell) in row.iter().enumerate() {
        if bold.and_then(|flags| flags.get(col)).copied().unwrap_or(false) {
            bold_count += 1;
        }
        if is_numeric_cell(cell) {
            numeric_count += 1;
        } else if matches!(cell, Cell::Text(s) if !s.trim().is_empty()) {
            string_count += 1;
        }
        if merged_region_at(merged, row_idx, col).is_some() {
            merged_count += 1;
        }
    }

    let ratio = |count: usize| count as f64 / total as f64;
    let score = BOLD_WEIGHT * ratio(bold_count)
        + STRING_WEIGHT * ratio(string_count)
        + NUMERIC_WEIGHT * ratio(numeric_count)
        + MERGED_WEIGHT * ratio(merged_count);

    let reason = format!(
        "bold {:.0}%, text {:.0}%, numeric {:.0}%, merged {:.0}%",
        ratio(bold_count) * 100.0,
        ratio(string_count) * 100.0,
        ratio(numeric_count) * 100.0,
        ratio(merged_count) * 100.0
    );

    RowSignal {
        row: row_idx,
        score,
        reason,
    }
}

fn is_numeric_cell(cell: &Cell) -> bool {
    match cell {
        Cell::Number(_) => true,
        Cell::Text(s) => {
            let trimmed = s.trim();
            !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
        }
        _ => false,
    }
}
