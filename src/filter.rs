//! Row filtering over an in-memory grid.
//!
//! Builds the canonical header for the sheet, slices off the header region,
//! and evaluates a filter against every data row. Two filter forms share the
//! same traversal: the rule expression tree and the operator-based condition
//! groups. A wholly empty filter means "no filtering": every row passes.

use log::info;

use crate::condition::ConditionGroup;
use crate::expression::{FilterExpr, FilterRule, LogicalOp};
use crate::header::{self, ConcatMode};
use crate::table::{Cell, MergedRegion, Table};

/// The matching and non-matching halves of a filtered sheet, plus the
/// unfiltered whole under the same canonical header.
#[derive(Debug, Clone)]
pub struct FilterPartition {
    pub matching: Table,
    pub non_matching: Table,
    pub unified: Table,
}

/// First data row for a sheet: the row after the deepest header row, or the
/// top of the sheet when no header rows are declared.
pub fn data_start_row(header_rows: &[usize]) -> usize {
    header_rows.iter().max().map_or(0, |&last| last + 1)
}

/// Keeps the rows matching `expr`. An empty expression keeps everything.
pub fn filter_grid(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    expr: &FilterExpr,
) -> Table {
    let pass_all = expr.is_empty();
    filter_by(grid, header_rows, merged, mode, separator, |row, header| {
        pass_all || expr.evaluate(row, header)
    })
}

/// Flat-rule form: all rules combined under a single logical operator.
pub fn filter_with_rules(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    rules: &[FilterRule],
    op: LogicalOp,
) -> Table {
    let expr = FilterExpr::group(op, rules.iter().cloned().map(FilterExpr::rule).collect());
    filter_grid(grid, header_rows, merged, mode, separator, &expr)
}

/// Condition-group form. An empty group keeps everything.
pub fn filter_where(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    group: &ConditionGroup,
) -> Table {
    filter_by(grid, header_rows, merged, mode, separator, |row, header| {
        group.matches(row, header)
    })
}

/// Counts matching rows without materializing them.
pub fn count_matches(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    expr: &FilterExpr,
) -> usize {
    let (header, data) = split_sheet(grid, header_rows, merged, mode, separator);
    if expr.is_empty() {
        return data.len();
    }
    data.iter().filter(|row| expr.evaluate(row, &header)).count()
}

/// Counts rows matching a condition group.
pub fn count_where(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    group: &ConditionGroup,
) -> usize {
    let (header, data) = split_sheet(grid, header_rows, merged, mode, separator);
    data.iter().filter(|row| group.matches(row, &header)).count()
}

/// Splits the sheet into matching, non-matching, and unified tables in one
/// pass over the data rows.
pub fn partition(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    expr: &FilterExpr,
) -> FilterPartition {
    let pass_all = expr.is_empty();
    partition_by(grid, header_rows, merged, mode, separator, |row, header| {
        pass_all || expr.evaluate(row, header)
    })
}

/// Condition-group partition.
pub fn partition_where(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    group: &ConditionGroup,
) -> FilterPartition {
    partition_by(grid, header_rows, merged, mode, separator, |row, header| {
        group.matches(row, header)
    })
}

fn filter_by<F>(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    keep: F,
) -> Table
where
    F: Fn(&[Cell], &[String]) -> bool,
{
    let (header, data) = split_sheet(grid, header_rows, merged, mode, separator);
    let rows: Vec<Vec<Cell>> = data
        .iter()
        .filter(|row| keep(row, &header))
        .map(|row| row.to_vec())
        .collect();
    info!("filter kept {} of {} rows", rows.len(), data.len());
    Table::new(header, rows)
}

fn partition_by<F>(
    grid: &[Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
    keep: F,
) -> FilterPartition
where
    F: Fn(&[Cell], &[String]) -> bool,
{
    let (header, data) = split_sheet(grid, header_rows, merged, mode, separator);
    let mut matching = Vec::new();
    let mut non_matching = Vec::new();
    for row in data {
        if keep(row, &header) {
            matching.push(row.to_vec());
        } else {
            non_matching.push(row.to_vec());
        }
    }
    let unified = data.iter().map(|row| row.to_vec()).collect();

    FilterPartition {
        matching: Table::new(header.clone(), matching),
        non_matching: Table::new(header.clone(), non_matching),
        unified: Table::new(header, unified),
    }
}

fn split_sheet<'g>(
    grid: &'g [Vec<Cell>],
    header_rows: &[usize],
    merged: &[MergedRegion],
    mode: ConcatMode,
    separator: &str,
) -> (Vec<String>, &'g [Vec<Cell>]) {
    let header = header::build_canonical_headers(grid, header_rows, merged, mode, separator);
    let start = data_start_row(header_rows);
    let data = if start >= grid.len() { &[] } else { &grid[start..] };
    (header, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionOp, FilterCondition};

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn people_grid() -> Vec<Vec<Cell>> {
        vec![
            vec![text("ID"), text("Name"), text("City"), text("Status")],
            vec![Cell::Number(1.0), text("Alice"), text("New York"), text("Active")],
            vec![Cell::Number(2.0), text("Bob"), text("Los Angeles"), text("Inactive")],
            vec![Cell::Number(3.0), text("Charlie"), text("New York"), text("Active")],
            vec![Cell::Number(4.0), text("David"), text("Chicago"), text("Active")],
            vec![Cell::Number(5.0), text("Eve"), text("New York"), text("Inactive")],
        ]
    }

    fn simple(value: &str, column: &str) -> FilterExpr {
        FilterExpr::rule(FilterRule::by_value(value, column, true))
    }

    #[test]
    fn data_start_follows_deepest_header_row() {
        assert_eq!(data_start_row(&[0]), 1);
        assert_eq!(data_start_row(&[0, 2]), 3);
        assert_eq!(data_start_row(&[]), 0);
    }

    #[test]
    fn single_rule_keeps_matching_rows() {
        let grid = people_grid();
        let table = filter_grid(
            &grid,
            &[0],
            &[],
            ConcatMode::LeafOnly,
            " | ",
            &simple("New York", "City"),
        );
        assert_eq!(table.header, vec!["ID", "Name", "City", "Status"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][1], text("Alice"));
        assert_eq!(table.rows[2][1], text("Eve"));
    }

    #[test]
    fn empty_expression_keeps_every_row() {
        let grid = people_grid();
        let expr = FilterExpr::group(LogicalOp::Or, vec![]);
        let table = filter_grid(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &expr);
        assert_eq!(table.rows.len(), 5);
    }

    #[test]
    fn flat_rules_combine_under_one_operator() {
        let grid = people_grid();
        let rules = vec![
            FilterRule::by_value("New York", "City", true),
            FilterRule::by_value("Active", "Status", true),
        ];
        let and_table = filter_with_rules(
            &grid,
            &[0],
            &[],
            ConcatMode::LeafOnly,
            " | ",
            &rules,
            LogicalOp::And,
        );
        assert_eq!(and_table.rows.len(), 2);

        let or_table = filter_with_rules(
            &grid,
            &[0],
            &[],
            ConcatMode::LeafOnly,
            " | ",
            &rules,
            LogicalOp::Or,
        );
        assert_eq!(or_table.rows.len(), 4);
    }

    #[test]
    fn count_agrees_with_filter() {
        let grid = people_grid();
        let expr = simple("Active", "Status");
        let count = count_matches(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &expr);
        let table = filter_grid(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &expr);
        assert_eq!(count, table.rows.len());
        assert_eq!(count, 3);
    }

    #[test]
    fn partition_splits_without_losing_rows() {
        let grid = people_grid();
        let expr = simple("Inactive", "Status");
        let parts = partition(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &expr);
        assert_eq!(parts.matching.rows.len(), 2);
        assert_eq!(parts.non_matching.rows.len(), 3);
        assert_eq!(parts.unified.rows.len(), 5);
        assert_eq!(parts.matching.header, parts.unified.header);
    }

    #[test]
    fn conditions_filter_with_operators() {
        let grid = people_grid();
        let group = ConditionGroup::all(vec![
            FilterCondition::new("City", ConditionOp::Contains, Some("york")),
            FilterCondition::new("ID", ConditionOp::GreaterThan, Some("1")),
        ]);
        let table = filter_where(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &group);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1], text("Charlie"));
        assert_eq!(
            count_where(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &group),
            2
        );
    }

    #[test]
    fn empty_condition_group_keeps_every_row() {
        let grid = people_grid();
        let group = ConditionGroup::default();
        let parts = partition_where(&grid, &[0], &[], ConcatMode::LeafOnly, " | ", &group);
        assert_eq!(parts.matching.rows.len(), 5);
        assert!(parts.non_matching.rows.is_empty());
    }

    #[test]
    fn empty_grid_filters_to_empty_table() {
        let expr = simple("x", "Col");
        let table = filter_grid(&[], &[0], &[], ConcatMode::LeafOnly, " | ", &expr);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn headerless_sheet_starts_filtering_at_row_zero() {
        let grid = vec![
            vec![Cell::Number(1.0), text("a")],
            vec![Cell::Number(2.0), text("b")],
        ];
        let expr = FilterExpr::group(LogicalOp::And, vec![]);
        let table = filter_grid(&grid, &[], &[], ConcatMode::LeafOnly, " | ", &expr);
        assert!(table.header.is_empty());
        assert_eq!(table.rows.len(), 2);
    }
}
