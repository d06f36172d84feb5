//! Named filter storage.
//!
//! A caller-owned registry of filter expressions keyed by display name. The
//! host decides where (and whether) the registry is persisted; the engine only
//! defines its semantics. Serializes as a plain name-to-expression map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expression::FilterExpr;

/// Saved filters, keyed by trimmed name. Iteration order is save order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterRegistry {
    filters: IndexMap<String, FilterExpr>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a filter under `name`. Names are trimmed before use; a blank
    /// name is ignored. Saving under an existing name replaces the previous
    /// filter in place.
    pub fn save(&mut self, name: &str, expr: FilterExpr) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.filters.insert(name.to_string(), expr);
    }

    pub fn get(&self, name: &str) -> Option<&FilterExpr> {
        self.filters.get(name.trim())
    }

    pub fn remove(&mut self, name: &str) -> Option<FilterExpr> {
        self.filters.shift_remove(name.trim())
    }

    /// Saved names in save order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Counter for default display names ("Rule 1", "Group 2", ...), one sequence
/// per label.
#[derive(Debug, Default)]
pub struct AutoNamer {
    counters: IndexMap<String, usize>,
}

impl AutoNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, label: &str) -> String {
        let counter = self.counters.entry(label.to_string()).or_insert(0);
        *counter += 1;
        format!("{label} {counter}")
    }
}
