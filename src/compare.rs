//! Key-based table reconciliation.
//!
//! Matches rows between a source and a target table by a concatenated key,
//! classifies every cell-level difference, and aggregates summary counts.
//! Match keys are built from the raw string form of the key cells and are
//! never normalized; only value diffing honors the trim and case flags. That
//! asymmetry is deliberate and relied on by existing reconciliation profiles.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::CompareError;
use crate::expression::FilterExpr;
use crate::filter;
use crate::header::{self, ConcatMode, DEFAULT_SEPARATOR};
use crate::normalize;
use crate::table::{Cell, MergedRegion};

/// Literal separator between key parts.
pub const KEY_SEPARATOR: &str = "||";

/// Absolute tolerance for numeric cell comparison.
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

/// One side of a comparison: where the sheet lives plus how its header region
/// flattens. Paths and sheet names are opaque to the engine; the host resolves
/// them when it reads the grids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideConfig {
    pub file_path: String,
    pub sheet_name: String,
    #[serde(default)]
    pub header_rows: Vec<usize>,
    pub concat_mode: ConcatMode,
    #[serde(default)]
    pub filter: Option<FilterExpr>,
}

/// A full comparison profile. Persisted as JSON by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub source: SideConfig,
    pub target: SideConfig,
    #[serde(default = "default_separator")]
    pub separator: String,
    pub key_columns: Vec<String>,
    /// Source column name to target column name, in declaration order.
    pub column_mapping: IndexMap<String, String>,
    #[serde(default)]
    pub ignored_columns: Vec<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub trim_whitespace: bool,
}

impl CompareConfig {
    /// Fails fast on the first violated precondition, before any data access.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.source.file_path.trim().is_empty() {
            return Err(CompareError::invalid_config("Source file path is not set."));
        }
        if self.target.file_path.trim().is_empty() {
            return Err(CompareError::invalid_config("Target file path is not set."));
        }
        if self.source.sheet_name.trim().is_empty() {
            return Err(CompareError::invalid_config("Source sheet name is not set."));
        }
        if self.target.sheet_name.trim().is_empty() {
            return Err(CompareError::invalid_config("Target sheet name is not set."));
        }
        if self.key_columns.is_empty() {
            return Err(CompareError::invalid_config(
                "At least one key column must be selected for comparison.",
            ));
        }
        for key_column in &self.key_columns {
            if !self.column_mapping.contains_key(key_column) {
                return Err(CompareError::invalid_config(format!(
                    "Key column '{key_column}' is not present in the column mappings."
                )));
            }
        }
        Ok(())
    }
}

/// Classification of a single cell-level difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchKind {
    Numeric,
    String,
    BlankVsNonBlank,
    TypeMismatch,
}

/// A difference in one mapped column of a matched row pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDiff {
    pub column: String,
    pub source_value: String,
    pub target_value: String,
    pub kind: MismatchKind,
}

/// How one reconciled row relates the two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    MatchedIdentical,
    MatchedMismatched,
    SourceOnly,
    TargetOnly,
}

/// One reconciled row. Immutable once produced; differences are keyed by
/// source column index so report writers can align them with the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub status: RowStatus,
    pub key: String,
    pub source_row: Option<Vec<Cell>>,
    pub target_row: Option<Vec<Cell>>,
    #[serde(default)]
    pub diffs: BTreeMap<usize, CellDiff>,
}

/// Per-status counts, computed once from the outcome list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub identical: usize,
    pub mismatched: usize,
    pub source_only: usize,
    pub target_only: usize,
    pub total_source_rows: usize,
    pub total_target_rows: usize,
}

impl Summary {
    fn from_outcomes(outcomes: &[RowOutcome]) -> Self {
        let mut identical = 0;
        let mut mismatched = 0;
        let mut source_only = 0;
        let mut target_only = 0;
        for outcome in outcomes {
            match outcome.status {
                RowStatus::MatchedIdentical => identical += 1,
                RowStatus::MatchedMismatched => mismatched += 1,
                RowStatus::SourceOnly => source_only += 1,
                RowStatus::TargetOnly => target_only += 1,
            }
        }
        Self {
            identical,
            mismatched,
            source_only,
            target_only,
            total_source_rows: identical + mismatched + source_only,
            total_target_rows: identical + mismatched + target_only,
        }
    }
}

/// The full result of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub source_header: Vec<String>,
    pub target_header: Vec<String>,
    pub outcomes: Vec<RowOutcome>,
    pub summary: Summary,
}

/// Runs a comparison over two already-read grids.
///
/// Source-driven outcomes come first, in original source-row order, followed
/// by leftover target-only rows in target key-map insertion order.
pub fn run_compare(
    config: &CompareConfig,
    source_grid: &[Vec<Cell>],
    source_merged: &[MergedRegion],
    target_grid: &[Vec<Cell>],
    target_merged: &[MergedRegion],
) -> Result<ComparisonResult, CompareError> {
    config.validate()?;

    let (source_header, source_rows) = prepare_side(
        &config.source,
        source_grid,
        source_merged,
        &config.separator,
    );
    let (target_header, target_rows) = prepare_side(
        &config.target,
        target_grid,
        target_merged,
        &config.separator,
    );
    debug!(
        "comparing {} source rows against {} target rows",
        source_rows.len(),
        target_rows.len()
    );

    let outcomes = match_rows(
        &source_rows,
        &target_rows,
        &source_header,
        &target_header,
        config,
    );
    let summary = Summary::from_outcomes(&outcomes);
    info!(
        "comparison finished: {} identical, {} mismatched, {} source-only, {} target-only",
        summary.identical, summary.mismatched, summary.source_only, summary.target_only
    );

    Ok(ComparisonResult {
        source_header,
        target_header,
        outcomes,
        summary,
    })
}

fn prepare_side(
    side: &SideConfig,
    grid: &[Vec<Cell>],
    merged: &[MergedRegion],
    separator: &str,
) -> (Vec<String>, Vec<Vec<Cell>>) {
    let header = header::build_canonical_headers(
        grid,
        &side.header_rows,
        merged,
        side.concat_mode,
        separator,
    );
    let start = filter::data_start_row(&side.header_rows);
    let mut rows: Vec<Vec<Cell>> = grid.iter().skip(start).cloned().collect();
    if let Some(expr) = &side.filter
        && !expr.is_empty()
    {
        rows.retain(|row| expr.evaluate(row, &header));
    }
    (header, rows)
}

/// Reconciles the prepared rows of both sides. Each target row satisfies at
/// most one source row: a matched key is removed from the target map, so
/// duplicate source keys collapse onto the same target and only the first
/// pairing diffs against it.
pub fn match_rows(
    source_rows: &[Vec<Cell>],
    target_rows: &[Vec<Cell>],
    source_header: &[String],
    target_header: &[String],
    config: &CompareConfig,
) -> Vec<RowOutcome> {
    let mut target_map = build_target_key_map(target_rows, target_header, config);
    let mut outcomes = Vec::with_capacity(source_rows.len() + target_map.len());

    for source_row in source_rows {
        let key = build_key(source_row, source_header, &config.key_columns);
        if let Some(target_row) = target_map.shift_remove(&key) {
            let diffs = diff_row_pair(source_row, &target_row, source_header, target_header, config);
            let status = if diffs.is_empty() {
                RowStatus::MatchedIdentical
            } else {
                RowStatus::MatchedMismatched
            };
            outcomes.push(RowOutcome {
                status,
                key,
                source_row: Some(source_row.clone()),
                target_row: Some(target_row),
                diffs,
            });
        } else {
            outcomes.push(RowOutcome {
                status: RowStatus::SourceOnly,
                key,
                source_row: Some(source_row.clone()),
                target_row: None,
                diffs: BTreeMap::new(),
            });
        }
    }

    for (key, target_row) in target_map {
        outcomes.push(RowOutcome {
            status: RowStatus::TargetOnly,
            key,
            source_row: None,
            target_row: Some(target_row),
            diffs: BTreeMap::new(),
        });
    }

    outcomes
}

/// Builds the target lookup by translating each source key column through the
/// column mapping. Insertion order is target-row order, which fixes the
/// ordering of leftover target-only outcomes. Duplicate target keys keep the
/// first row's position with the last row's values.
fn build_target_key_map(
    target_rows: &[Vec<Cell>],
    target_header: &[String],
    config: &CompareConfig,
) -> IndexMap<String, Vec<Cell>> {
    let target_key_columns: Vec<String> = config
        .key_columns
        .iter()
        .filter_map(|source_col| config.column_mapping.get(source_col).cloned())
        .collect();

    let mut map = IndexMap::with_capacity(target_rows.len());
    for row in target_rows {
        let key = build_key(row, target_header, &target_key_columns);
        map.insert(key, row.clone());
    }
    map
}

/// The match key of one row: raw cell text of each key column joined with
/// `"||"`. Key columns missing from the header contribute nothing.
pub fn build_key(row: &[Cell], header: &[String], key_columns: &[String]) -> String {
    let parts: Vec<String> = key_columns
        .iter()
        .filter_map(|name| header.iter().position(|h| h == name))
        .map(|idx| row.get(idx).map(Cell::to_text).unwrap_or_default())
        .collect();
    parts.join(KEY_SEPARATOR)
}

/// Diffs every mapped, non-key, non-ignored column of a matched pair.
fn diff_row_pair(
    source_row: &[Cell],
    target_row: &[Cell],
    source_header: &[String],
    target_header: &[String],
    config: &CompareConfig,
) -> BTreeMap<usize, CellDiff> {
    let mut diffs = BTreeMap::new();

    for (source_col, target_col) in &config.column_mapping {
        if config.key_columns.contains(source_col) || config.ignored_columns.contains(source_col) {
            continue;
        }
        let Some(source_idx) = source_header.iter().position(|h| h == source_col) else {
            continue;
        };
        let Some(target_idx) = target_header.iter().position(|h| h == target_col) else {
            continue;
        };

        let source_val = source_row.get(source_idx).map(Cell::to_text).unwrap_or_default();
        let target_val = target_row.get(target_idx).map(Cell::to_text).unwrap_or_default();

        if let Some(kind) = classify(&source_val, &target_val, config) {
            diffs.insert(
                source_idx,
                CellDiff {
                    column: source_col.clone(),
                    source_value: source_val,
                    target_value: target_val,
                    kind,
                },
            );
        }
    }
    diffs
}

/// Classifies one value pair, or `None` when the values agree. Order matters:
/// blankness first, then numeric, then type, then normalized string equality.
/// A malformed numeric string simply fails the parse and falls through to the
/// string branch.
fn classify(source_val: &str, target_val: &str, config: &CompareConfig) -> Option<MismatchKind> {
    let source_blank = source_val.trim().is_empty();
    let target_blank = target_val.trim().is_empty();
    if source_blank && target_blank {
        return None;
    }
    if source_blank || target_blank {
        return Some(MismatchKind::BlankVsNonBlank);
    }

    let source_num = source_val.trim().parse::<f64>().ok();
    let target_num = target_val.trim().parse::<f64>().ok();
    match (source_num, target_num) {
        (Some(s), Some(t)) => {
            if (s - t).abs() > NUMERIC_TOLERANCE {
                Some(MismatchKind::Numeric)
            } else {
                None
            }
        }
        (Some(_), None) | (None, Some(_)) => Some(MismatchKind::TypeMismatch),
        (None, None) => {
            let s = normalize::comparison_form(source_val, config.trim_whitespace, config.ignore_case);
            let t = normalize::comparison_form(target_val, config.trim_whitespace, config.ignore_case);
            if s == t { None } else { Some(MismatchKind::String) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FilterRule;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn side(path: &str) -> SideConfig {
        SideConfig {
            file_path: path.to_string(),
            sheet_name: "Sheet1".to_string(),
            header_rows: vec![0],
            concat_mode: ConcatMode::LeafOnly,
            filter: None,
        }
    }

    fn identity_config(keys: &[&str], columns: &[&str]) -> CompareConfig {
        CompareConfig {
            source: side("source.xlsx"),
            target: side("target.xlsx"),
            separator: DEFAULT_SEPARATOR.to_string(),
            key_columns: keys.iter().map(|s| s.to_string()).collect(),
            column_mapping: columns
                .iter()
                .map(|c| (c.to_string(), c.to_string()))
                .collect(),
            ignored_columns: Vec::new(),
            ignore_case: true,
            trim_whitespace: true,
        }
    }

    fn header_row(columns: &[&str]) -> Vec<Cell> {
        columns.iter().map(|c| text(c)).collect()
    }

    #[test]
    fn validation_reports_first_violation() {
        let mut config = identity_config(&["ID"], &["ID", "Name"]);
        config.source.file_path = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Source file path is not set.");

        let mut config = identity_config(&["ID"], &["ID"]);
        config.target.sheet_name.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Target sheet name is not set.");

        let config = identity_config(&[], &["ID"]);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "At least one key column must be selected for comparison."
        );

        let config = identity_config(&["ID"], &["Name"]);
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key column 'ID' is not present in the column mappings."
        );
    }

    #[test]
    fn identical_rows_match_with_no_diffs() {
        let config = identity_config(&["ID"], &["ID", "Name", "Value"]);
        let source = vec![
            header_row(&["ID", "Name", "Value"]),
            vec![Cell::Number(1.0), text("John"), Cell::Number(100.0)],
        ];
        let target = vec![
            header_row(&["ID", "Name", "Value"]),
            vec![Cell::Number(1.0), text("john"), Cell::Number(100.0)],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].status, RowStatus::MatchedIdentical);
        assert!(result.outcomes[0].diffs.is_empty());
        assert_eq!(result.summary.identical, 1);
    }

    #[test]
    fn numeric_difference_is_classified() {
        let config = identity_config(&["ID"], &["ID", "Name", "Value"]);
        let source = vec![
            header_row(&["ID", "Name", "Value"]),
            vec![Cell::Number(2.0), text("Jane"), Cell::Number(200.0)],
        ];
        let target = vec![
            header_row(&["ID", "Name", "Value"]),
            vec![Cell::Number(2.0), text("Jane"), Cell::Number(250.0)],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.outcomes[0].status, RowStatus::MatchedMismatched);
        let diff = result.outcomes[0].diffs.values().next().unwrap();
        assert_eq!(diff.column, "Value");
        assert_eq!(diff.kind, MismatchKind::Numeric);
    }

    #[test]
    fn unmatched_source_row_is_source_only() {
        let config = identity_config(&["ID"], &["ID", "Name", "Value"]);
        let source = vec![
            header_row(&["ID", "Name", "Value"]),
            vec![Cell::Number(3.0), text("Mike"), Cell::Number(300.0)],
        ];
        let target = vec![header_row(&["ID", "Name", "Value"])];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].status, RowStatus::SourceOnly);
        assert_eq!(result.summary.source_only, 1);
        assert_eq!(result.summary.total_target_rows, 0);
    }

    #[test]
    fn leftover_target_rows_keep_insertion_order() {
        let config = identity_config(&["ID"], &["ID", "Name"]);
        let source = vec![header_row(&["ID", "Name"])];
        let target = vec![
            header_row(&["ID", "Name"]),
            vec![Cell::Number(9.0), text("Zed")],
            vec![Cell::Number(4.0), text("Ann")],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        let keys: Vec<&str> = result.outcomes.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["9", "4"]);
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.status == RowStatus::TargetOnly));
    }

    #[test]
    fn duplicate_source_keys_consume_the_target_once() {
        let config = identity_config(&["ID"], &["ID", "Name"]);
        let source = vec![
            header_row(&["ID", "Name"]),
            vec![Cell::Number(1.0), text("First")],
            vec![Cell::Number(1.0), text("Second")],
        ];
        let target = vec![
            header_row(&["ID", "Name"]),
            vec![Cell::Number(1.0), text("First")],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.outcomes[0].status, RowStatus::MatchedIdentical);
        assert_eq!(result.outcomes[1].status, RowStatus::SourceOnly);
    }

    #[test]
    fn blank_vs_non_blank_and_type_mismatch() {
        let config = identity_config(&["ID"], &["ID", "A", "B"]);
        let source = vec![
            header_row(&["ID", "A", "B"]),
            vec![Cell::Number(1.0), Cell::Blank, text("abc")],
        ];
        let target = vec![
            header_row(&["ID", "A", "B"]),
            vec![Cell::Number(1.0), text("filled"), Cell::Number(5.0)],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        let kinds: Vec<MismatchKind> =
            result.outcomes[0].diffs.values().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![MismatchKind::BlankVsNonBlank, MismatchKind::TypeMismatch]
        );
    }

    #[test]
    fn numeric_tolerance_absorbs_float_noise() {
        let config = identity_config(&["ID"], &["ID", "Value"]);
        assert_eq!(classify("100.0", "100", &config), None);
        assert_eq!(classify("1.0000000001", "1.0000000002", &config), None);
        assert_eq!(
            classify("200", "250", &config),
            Some(MismatchKind::Numeric)
        );
    }

    #[test]
    fn string_compare_honors_case_and_trim_flags() {
        let mut config = identity_config(&["ID"], &["ID", "Name"]);
        assert_eq!(classify(" John ", "john", &config), None);
        config.ignore_case = false;
        assert_eq!(classify("John", "john", &config), Some(MismatchKind::String));
        config.ignore_case = true;
        config.trim_whitespace = false;
        assert_eq!(
            classify(" John", "John", &config),
            Some(MismatchKind::String)
        );
    }

    #[test]
    fn key_columns_and_ignored_columns_are_never_diffed() {
        let mut config = identity_config(&["ID"], &["ID", "Name", "Notes"]);
        config.ignored_columns = vec!["Notes".to_string()];
        let source = vec![
            header_row(&["ID", "Name", "Notes"]),
            vec![Cell::Number(1.0), text("Same"), text("old note")],
        ];
        let target = vec![
            header_row(&["ID", "Name", "Notes"]),
            vec![Cell::Number(1.0), text("Same"), text("new note")],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.outcomes[0].status, RowStatus::MatchedIdentical);
    }

    #[test]
    fn keys_stay_raw_while_diffing_normalizes() {
        // " 1 " and "1" are different keys even with trim_whitespace on.
        let config = identity_config(&["ID"], &["ID", "Name"]);
        let source = vec![
            header_row(&["ID", "Name"]),
            vec![text(" 1 "), text("John")],
        ];
        let target = vec![header_row(&["ID", "Name"]), vec![text("1"), text("John")]];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.summary.source_only, 1);
        assert_eq!(result.summary.target_only, 1);
    }

    #[test]
    fn compound_keys_join_with_the_separator() {
        let header: Vec<String> = vec!["A".into(), "B".into()];
        let row = vec![text("x"), Cell::Number(7.0)];
        let key = build_key(&row, &header, &["A".to_string(), "B".to_string()]);
        assert_eq!(key, "x||7");
    }

    #[test]
    fn per_side_filters_restrict_the_comparison() {
        let mut config = identity_config(&["ID"], &["ID", "Status"]);
        config.source.filter = Some(FilterExpr::rule(FilterRule::by_value(
            "Active", "Status", true,
        )));
        let source = vec![
            header_row(&["ID", "Status"]),
            vec![Cell::Number(1.0), text("Active")],
            vec![Cell::Number(2.0), text("Inactive")],
        ];
        let target = vec![
            header_row(&["ID", "Status"]),
            vec![Cell::Number(1.0), text("Active")],
            vec![Cell::Number(2.0), text("Inactive")],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        assert_eq!(result.summary.total_source_rows, 1);
        assert_eq!(result.summary.target_only, 1);
    }

    #[test]
    fn summary_totals_satisfy_the_identities() {
        let config = identity_config(&["ID"], &["ID", "Name"]);
        let source = vec![
            header_row(&["ID", "Name"]),
            vec![Cell::Number(1.0), text("same")],
            vec![Cell::Number(2.0), text("changed")],
            vec![Cell::Number(3.0), text("only here")],
        ];
        let target = vec![
            header_row(&["ID", "Name"]),
            vec![Cell::Number(1.0), text("same")],
            vec![Cell::Number(2.0), text("CHANGED!")],
            vec![Cell::Number(4.0), text("only there")],
        ];
        let result = run_compare(&config, &source, &[], &target, &[]).unwrap();
        let s = result.summary;
        assert_eq!(s.total_source_rows, s.identical + s.mismatched + s.source_only);
        assert_eq!(s.total_target_rows, s.identical + s.mismatched + s.target_only);
        assert_eq!(s.total_source_rows, 3);
        assert_eq!(s.total_target_rows, 3);
    }
}
