//! Fuzzy column auto-mapping.
//!
//! Proposes a 1:1 correspondence between two independently named header
//! lists: exact (trimmed, case-insensitive) matches first, then Jaro-Winkler
//! similarity against the remaining pool. The proposal is advisory; the
//! mapping the comparison engine runs with is whatever the operator confirms.

use serde::Serialize;
use strsim::jaro_winkler;

/// Minimum similarity for a fuzzy binding.
const FUZZY_THRESHOLD: f64 = 0.8;

/// One proposed source-to-target binding with its similarity score
/// (1.0 for exact matches).
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMatch {
    pub source: String,
    pub target: String,
    pub confidence: f64,
}

/// A full mapping proposal, including the columns neither pass could bind.
#[derive(Debug, Clone, Serialize)]
pub struct MappingProposal {
    pub matches: Vec<ColumnMatch>,
    pub unmapped_sources: Vec<String>,
    pub unmapped_targets: Vec<String>,
}

/// Proposes a mapping from `sources` onto `targets`. Each target is consumed
/// by at most one source; sources are considered in declaration order.
pub fn propose_mapping(sources: &[String], targets: &[String]) -> MappingProposal {
    let mut used = vec![false; targets.len()];
    let mut bindings: Vec<Option<ColumnMatch>> = vec![None; sources.len()];

    // Pass 1: exact matches, first unused target wins.
    for (si, source) in sources.iter().enumerate() {
        let wanted = source.trim().to_lowercase();
        for (ti, target) in targets.iter().enumerate() {
            if used[ti] || target.trim().to_lowercase() != wanted {
                continue;
            }
            used[ti] = true;
            bindings[si] = Some(ColumnMatch {
                source: source.clone(),
                target: target.clone(),
                confidence: 1.0,
            });
            break;
        }
    }

    // Pass 2: best fuzzy match above threshold from the remaining pool.
    for (si, source) in sources.iter().enumerate() {
        if bindings[si].is_some() {
            continue;
        }
        let folded = source.trim().to_lowercase();
        let mut best: Option<(usize, f64)> = None;
        for (ti, target) in targets.iter().enumerate() {
            if used[ti] {
                continue;
            }
            let score = jaro_winkler(&folded, &target.trim().to_lowercase());
            if best.is_none_or(|(_, current)| score > current) {
                best = Some((ti, score));
            }
        }
        if let Some((ti, score)) = best
            && score > FUZZY_THRESHOLD
        {
            used[ti] = true;
            bindings[si] = Some(ColumnMatch {
                source: source.clone(),
                target: targets[ti].clone(),
                confidence: score,
            });
        }
    }

    let mut matches = Vec::new();
    let mut unmapped_sources = Vec::new();
    for (si, binding) in bindings.into_iter().enumerate() {
        match binding {
            Some(m) => matches.push(m),
            None => unmapped_sources.push(sources[si].clone()),
        }
    }
    let unmapped_targets = targets
        .iter()
        .enumerate()
        .filter(|(ti, _)| !used[*ti])
        .map(|(_, t)| t.clone())
        .collect();

    MappingProposal {
        matches,
        unmapped_sources,
        unmapped_targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_ignores_case_and_padding() {
        let proposal = propose_mapping(&names(&["Order ID", "Amount"]), &names(&[" amount ", "ORDER id"]));
        assert_eq!(proposal.matches.len(), 2);
        assert_eq!(proposal.matches[0].target, "ORDER id");
        assert_eq!(proposal.matches[0].confidence, 1.0);
        assert_eq!(proposal.matches[1].target, " amount ");
        assert!(proposal.unmapped_sources.is_empty());
    }

    #[test]
    fn fuzzy_match_binds_close_names() {
        let proposal = propose_mapping(&names(&["Customer Name"]), &names(&["CustomerName"]));
        assert_eq!(proposal.matches.len(), 1);
        assert!(proposal.matches[0].confidence > FUZZY_THRESHOLD);
        assert!(proposal.matches[0].confidence < 1.0);
    }

    #[test]
    fn dissimilar_names_stay_unmapped() {
        let proposal = propose_mapping(&names(&["Quantity"]), &names(&["Shipping Address"]));
        assert!(proposal.matches.is_empty());
        assert_eq!(proposal.unmapped_sources, names(&["Quantity"]));
        assert_eq!(proposal.unmapped_targets, names(&["Shipping Address"]));
    }

    #[test]
    fn each_target_is_consumed_once() {
        // Two sources collapse to the same target name; only the first binds.
        let proposal = propose_mapping(&names(&["ID", "id "]), &names(&["Id"]));
        assert_eq!(proposal.matches.len(), 1);
        assert_eq!(proposal.matches[0].source, "ID");
        assert_eq!(proposal.unmapped_sources, names(&["id "]));
    }

    #[test]
    fn exact_pass_runs_before_fuzzy_pass() {
        // "Value" must take its exact twin even though "Values" scores high.
        let proposal = propose_mapping(&names(&["Value", "Values"]), &names(&["Values", "Value"]));
        assert_eq!(proposal.matches[0].source, "Value");
        assert_eq!(proposal.matches[0].target, "Value");
        assert_eq!(proposal.matches[1].source, "Values");
        assert_eq!(proposal.matches[1].target, "Values");
    }
}
