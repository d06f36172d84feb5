//! Key-column suggestion by uniqueness ratio.

use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;

use crate::table::Cell;

/// Uniqueness ranking for one column. A ratio of 1.0 marks a candidate
/// primary key.
#[derive(Debug, Clone, Serialize)]
pub struct KeySuggestion {
    pub column: String,
    pub uniqueness: f64,
}

/// Ranks every column by distinct-value ratio, highest first. Values are
/// compared in their raw string form, before any normalization. The sort is
/// stable, so equally unique columns keep their original order.
pub fn suggest_keys(rows: &[Vec<Cell>], header: &[String]) -> Vec<KeySuggestion> {
    if rows.is_empty() || header.is_empty() {
        return Vec::new();
    }

    let row_count = rows.len() as f64;
    header
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let distinct: HashSet<String> = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(Cell::to_text)
                .collect();
            KeySuggestion {
                column: name.clone(),
                uniqueness: distinct.len() as f64 / row_count,
            }
        })
        .sorted_by(|a, b| {
            b.uniqueness
                .partial_cmp(&a.uniqueness)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unique_column_ranks_first() {
        let rows = vec![
            vec![Cell::Number(1.0), text("East")],
            vec![Cell::Number(2.0), text("East")],
            vec![Cell::Number(3.0), text("West")],
        ];
        let suggestions = suggest_keys(&rows, &header(&["ID", "Region"]));
        assert_eq!(suggestions[0].column, "ID");
        assert_eq!(suggestions[0].uniqueness, 1.0);
        assert_eq!(suggestions[1].column, "Region");
        assert!((suggestions[1].uniqueness - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_original_column_order() {
        let rows = vec![
            vec![text("a"), text("x")],
            vec![text("b"), text("y")],
        ];
        let suggestions = suggest_keys(&rows, &header(&["First", "Second"]));
        assert_eq!(suggestions[0].column, "First");
        assert_eq!(suggestions[1].column, "Second");
    }

    #[test]
    fn short_rows_contribute_nothing_to_missing_columns() {
        let rows = vec![vec![text("a")], vec![text("b"), text("x")]];
        let suggestions = suggest_keys(&rows, &header(&["Full", "Ragged"]));
        let ragged = suggestions.iter().find(|s| s.column == "Ragged").unwrap();
        // Only one row reaches the second column.
        assert_eq!(ragged.uniqueness, 0.5);
    }

    #[test]
    fn empty_inputs_yield_no_suggestions() {
        assert!(suggest_keys(&[], &header(&["A"])).is_empty());
        assert!(suggest_keys(&[vec![text("a")]], &[]).is_empty());
    }
}
