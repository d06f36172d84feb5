//! In-memory tabular data model.
//!
//! The engines never touch files: they receive a rectangular [`Grid`] of
//! loosely typed [`Cell`] values plus the sheet's merged-region list, exactly
//! as extracted by whatever host read the spreadsheet or CSV.

use serde::{Deserialize, Serialize};

use crate::normalize;

/// A single loosely typed scalar extracted from a spreadsheet-like source.
///
/// Immutable once read. Serializes untagged so fixtures and profiles read
/// naturally (`null`, `true`, `42`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Blank,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Builds a cell from a raw CSV field. Empty fields become [`Cell::Blank`]
    /// and numeric-looking fields become [`Cell::Number`], mirroring how
    /// spreadsheet readers type their cells.
    pub fn from_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Cell::Blank;
        }
        if let Ok(number) = trimmed.parse::<f64>() {
            return Cell::Number(number);
        }
        Cell::Text(field.to_string())
    }

    /// The raw string form of the cell, used for key construction and
    /// uniqueness counting. No trimming or symbol substitution is applied
    /// here; match keys deliberately stay raw.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => normalize::format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }

    /// True when the cell is absent or contains only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// A rectangular block of raw cells, in original row order. Row 0 is the
/// first row of the sheet; header rows have not been sliced off yet.
pub type Grid = Vec<Vec<Cell>>;

/// A canonical header plus the data rows positionally aligned with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { header, rows }
    }

    pub fn empty() -> Self {
        Self {
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }
}

/// A merged rectangle on a sheet. The value is authoritative only in the
/// top-left (anchor) cell; every other coordinate inside the rectangle
/// displays the anchor's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl MergedRegion {
    pub fn new(first_row: usize, last_row: usize, first_col: usize, last_col: usize) -> Self {
        Self {
            first_row,
            last_row,
            first_col,
            last_col,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.first_row
            && row <= self.last_row
            && col >= self.first_col
            && col <= self.last_col
    }

    pub fn anchor(&self) -> (usize, usize) {
        (self.first_row, self.first_col)
    }
}

/// Linear scan over the (small) merged-region list for the region covering a
/// coordinate. Header regions are tiny, so no spatial index is warranted.
pub fn merged_region_at(regions: &[MergedRegion], row: usize, col: usize) -> Option<&MergedRegion> {
    regions.iter().find(|r| r.contains(row, col))
}
