//! Boolean filter expression trees.
//!
//! A filter is either a single rule or a group of child expressions combined
//! with one logical operator. Groups nest, so different operators at
//! different depths are representable even though a single group applies one
//! operator across all of its children.

use serde::{Deserialize, Serialize};

use crate::normalize;
use crate::table::Cell;

/// Logical connective applied across every child of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

/// Where a rule's literal comes from: typed in directly, or lifted from a
/// column name of the filter source sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    ByValue,
    ByColumn,
}

/// A single equality rule against one column. Immutable value object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub source: RuleSource,
    pub source_value: String,
    pub target_column: String,
    /// Retained in persisted profiles; the normalizer trims unconditionally,
    /// so the flag does not affect matching.
    #[serde(default)]
    pub trim_whitespace: bool,
}

impl FilterRule {
    pub fn by_value(value: &str, target_column: &str, trim_whitespace: bool) -> Self {
        Self {
            source: RuleSource::ByValue,
            source_value: value.to_string(),
            target_column: target_column.to_string(),
            trim_whitespace,
        }
    }

    pub fn by_column(column_name: &str, target_column: &str, trim_whitespace: bool) -> Self {
        Self {
            source: RuleSource::ByColumn,
            source_value: column_name.to_string(),
            target_column: target_column.to_string(),
            trim_whitespace,
        }
    }

    /// Evaluates the rule against one row. A rule whose target column is not
    /// in the header never matches. An empty literal matches only cells that
    /// normalize to empty; otherwise the normalized forms are compared
    /// case-insensitively.
    pub fn matches(&self, row: &[Cell], header: &[String]) -> bool {
        let Some(col) = header.iter().position(|h| h == &self.target_column) else {
            return false;
        };
        let cell = row.get(col).unwrap_or(&Cell::Blank);
        let cell_text = normalize::normalize_cell(cell);
        let wanted = normalize::normalize_text(&self.source_value);
        if wanted.is_empty() {
            return cell_text.is_empty();
        }
        cell_text.to_lowercase() == wanted.to_lowercase()
    }

    /// Short display name, e.g. `City = 'New York'`.
    pub fn descriptive_name(&self) -> String {
        let base = format!("{} = '{}'", self.target_column, self.source_value);
        match self.source {
            RuleSource::ByColumn => format!("{base} (from column)"),
            RuleSource::ByValue => base,
        }
    }
}

/// A node in the expression tree: a terminal rule or a group of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterExpr {
    Rule { rule: FilterRule },
    Group { op: LogicalOp, children: Vec<FilterExpr> },
}

impl FilterExpr {
    pub fn rule(rule: FilterRule) -> Self {
        FilterExpr::Rule { rule }
    }

    pub fn group(op: LogicalOp, children: Vec<FilterExpr>) -> Self {
        FilterExpr::Group { op, children }
    }

    /// Evaluates the tree against one row. An empty AND group is vacuously
    /// true so that an empty sub-clause never filters rows out; an empty OR
    /// group on its own yields false (the engine special-cases a wholly empty
    /// filter as "no filtering" before evaluation).
    pub fn evaluate(&self, row: &[Cell], header: &[String]) -> bool {
        match self {
            FilterExpr::Rule { rule } => rule.matches(row, header),
            FilterExpr::Group { op, children } => match op {
                LogicalOp::And => children.iter().all(|c| c.evaluate(row, header)),
                LogicalOp::Or => children.iter().any(|c| c.evaluate(row, header)),
            },
        }
    }

    /// True when the tree contains no rules at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterExpr::Rule { .. } => false,
            FilterExpr::Group { children, .. } => children.iter().all(FilterExpr::is_empty),
        }
    }

    /// Human-readable form of the whole tree.
    pub fn describe(&self) -> String {
        match self {
            FilterExpr::Rule { rule } => rule.descriptive_name(),
            FilterExpr::Group { op, children } => {
                if children.is_empty() {
                    return "()".to_string();
                }
                let joiner = match op {
                    LogicalOp::And => " AND ",
                    LogicalOp::Or => " OR ",
                };
                let parts: Vec<String> = children.iter().map(FilterExpr::describe).collect();
                format!("({})", parts.join(joiner))
            }
        }
    }
}
