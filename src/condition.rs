//! Operator-based filter conditions.
//!
//! The advanced companion to the rule expression tree: each condition applies
//! one comparison operator to one column, and conditions nest through groups
//! that apply a single AND/OR across their members. Unlike an expression
//! tree's empty OR group, an empty condition group matches everything.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::expression::LogicalOp;
use crate::table::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    GreaterThan,
    LessThan,
}

fn default_case_insensitive() -> bool {
    true
}

/// One comparison against one column, e.g. `City contains "York"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub op: ConditionOp,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

impl FilterCondition {
    pub fn new(column: &str, op: ConditionOp, value: Option<&str>) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: value.map(str::to_string),
            case_insensitive: true,
        }
    }

    /// Evaluates the condition against one row. A column missing from the
    /// header never matches; a malformed numeric operand makes the numeric
    /// operators false rather than failing the run.
    pub fn matches(&self, row: &[Cell], header: &[String]) -> bool {
        let Some(idx) = header.iter().position(|h| h == &self.column) else {
            return false;
        };
        let mut cell = row.get(idx).map(Cell::to_text).unwrap_or_default();
        let mut wanted = self.value.clone().unwrap_or_default();
        if self.case_insensitive {
            cell = cell.to_lowercase();
            wanted = wanted.to_lowercase();
        }

        match self.op {
            ConditionOp::IsNull => cell.trim().is_empty(),
            ConditionOp::IsNotNull => !cell.trim().is_empty(),
            ConditionOp::Equals => cell == wanted,
            ConditionOp::NotEquals => cell != wanted,
            ConditionOp::Contains => cell.contains(&wanted),
            ConditionOp::NotContains => !cell.contains(&wanted),
            ConditionOp::StartsWith => cell.starts_with(&wanted),
            ConditionOp::EndsWith => cell.ends_with(&wanted),
            ConditionOp::GreaterThan => match (cell.trim().parse::<f64>(), wanted.trim().parse::<f64>()) {
                (Ok(left), Ok(right)) => left > right,
                _ => false,
            },
            ConditionOp::LessThan => match (cell.trim().parse::<f64>(), wanted.trim().parse::<f64>()) {
                (Ok(left), Ok(right)) => left < right,
                _ => false,
            },
        }
    }
}

/// A group of conditions and subgroups under one logical operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub op: Option<LogicalOp>,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<FilterCondition>) -> Self {
        Self {
            op: Some(LogicalOp::And),
            conditions,
            groups: Vec::new(),
        }
    }

    pub fn any(conditions: Vec<FilterCondition>) -> Self {
        Self {
            op: Some(LogicalOp::Or),
            conditions,
            groups: Vec::new(),
        }
    }

    /// True when neither this group nor any subgroup holds a condition.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.iter().all(ConditionGroup::is_empty)
    }

    /// Evaluates conditions and subgroups together under the group operator.
    /// A group with no members matches every row.
    pub fn matches(&self, row: &[Cell], header: &[String]) -> bool {
        if self.conditions.is_empty() && self.groups.is_empty() {
            return true;
        }
        let conditions = self.conditions.iter().map(|c| c.matches(row, header));
        let groups = self.groups.iter().map(|g| g.matches(row, header));
        match self.op.unwrap_or(LogicalOp::And) {
            LogicalOp::And => conditions.chain(groups).all(|b| b),
            LogicalOp::Or => conditions.chain(groups).any(|b| b),
        }
    }
}

/// Parses CLI condition strings such as `City contains York`, `Value > 100`,
/// or `Notes is-null`.
pub fn parse_conditions(raw: &[String]) -> Result<Vec<FilterCondition>> {
    raw.iter().map(|c| parse_condition(c)).collect()
}

fn parse_condition(raw: &str) -> Result<FilterCondition> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter condition"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (suffix, op) in [
        (" is-not-null", ConditionOp::IsNotNull),
        (" is-null", ConditionOp::IsNull),
    ] {
        if let Some(column) = lowered.strip_suffix(suffix) {
            return Ok(FilterCondition::new(
                trimmed[..column.len()].trim(),
                op,
                None,
            ));
        }
    }

    for (needle, op) in [
        (" not-contains ", ConditionOp::NotContains),
        (" contains ", ConditionOp::Contains),
        (" startswith ", ConditionOp::StartsWith),
        (" endswith ", ConditionOp::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            let column = trimmed[..idx].trim();
            let value = unquote(trimmed[idx + needle.len()..].trim());
            return Ok(FilterCondition::new(column, op, Some(&value)));
        }
    }

    for (needle, op) in [
        ("!=", ConditionOp::NotEquals),
        ("=", ConditionOp::Equals),
        (">", ConditionOp::GreaterThan),
        ("<", ConditionOp::LessThan),
    ] {
        if let Some(idx) = trimmed.find(needle) {
            let column = trimmed[..idx].trim();
            let value = unquote(trimmed[idx + needle.len()..].trim());
            if column.is_empty() {
                return Err(anyhow!("Missing column in filter condition '{trimmed}'"));
            }
            return Ok(FilterCondition::new(column, op, Some(&value)));
        }
    }

    Err(anyhow!("Failed to parse filter condition '{trimmed}'"))
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
