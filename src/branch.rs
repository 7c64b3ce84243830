//! Branch expansion (C3): flattens arrays found at branch leaves into
//! per-element branches, implementing MongoDB's "an operator on an array
//! field matches if any element matches" rule.
//!
//! Grounded in the repeated `if let Value::Array(arr) = v { arr.iter().any(...) }`
//! idiom duplicated across every comparison/array operator in
//! `query/operators.rs`; this factors that shape into one reusable step so
//! C4/C5 implement each operator's predicate once, against a single value,
//! leaving iteration entirely to this module.

use crate::path::{Branch, IndexStep};
use bson::Bson;

/// A branch ready for predicate evaluation: a single, already-flattened
/// value plus the array indices that reach it.
#[derive(Debug, Clone)]
pub struct ExpandedBranch {
    pub value: Option<Bson>,
    pub array_indices: Vec<IndexStep>,
}

/// Which candidates an element matcher wants to see for an array-valued
/// branch (§4.3, §4.4's per-operator expansion requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandMode {
    /// The default: the array itself, plus each of its elements — "any
    /// element matches" (equality, `$lt`/`$gt`/.../`$in`/regex literals).
    Full,
    /// Only the array itself, never its elements — `$size`/`$elemMatch`
    /// must see the whole array to test its length / iterate it themselves.
    SelfOnly,
    /// Only the elements, never the array itself (unless there's nothing to
    /// expand, in which case the value is tested as-is) — `$type`, so that
    /// `{a:[5]}` is judged by its element's type, not the array's.
    ElementsOnly,
}

/// Expand `branches` per §4.3.
pub fn expand(branches: &[Branch], mode: ExpandMode) -> Vec<ExpandedBranch> {
    let mut out = Vec::with_capacity(branches.len());
    for branch in branches {
        let is_expandable_array =
            matches!(&branch.value, Some(Bson::Array(_))) && !branch.dont_iterate;

        let emit_self = match mode {
            ExpandMode::Full | ExpandMode::SelfOnly => true,
            ExpandMode::ElementsOnly => !is_expandable_array,
        };
        if emit_self {
            out.push(ExpandedBranch {
                value: branch.value.clone(),
                array_indices: branch.array_indices.clone(),
            });
        }

        let emit_elements = is_expandable_array
            && matches!(mode, ExpandMode::Full | ExpandMode::ElementsOnly);
        if emit_elements {
            if let Some(Bson::Array(elements)) = &branch.value {
                for (i, element) in elements.iter().enumerate() {
                    let mut indices = branch.array_indices.clone();
                    indices.push(IndexStep::Implicit(i));
                    out.push(ExpandedBranch {
                        value: Some(element.clone()),
                        array_indices: indices,
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(value: Option<Bson>, dont_iterate: bool) -> Branch {
        Branch {
            value,
            array_indices: vec![],
            dont_iterate,
        }
    }

    #[test]
    fn scalar_branch_passes_through_unchanged() {
        let branches = vec![branch(Some(Bson::Int32(5)), false)];
        let expanded = expand(&branches, ExpandMode::Full);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].value, Some(Bson::Int32(5)));
    }

    #[test]
    fn full_mode_emits_self_and_elements() {
        let branches = vec![branch(
            Some(Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)])),
            false,
        )];
        let expanded = expand(&branches, ExpandMode::Full);
        assert_eq!(expanded.len(), 3);
    }

    #[test]
    fn self_only_suppresses_elements() {
        let branches = vec![branch(
            Some(Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)])),
            false,
        )];
        let expanded = expand(&branches, ExpandMode::SelfOnly);
        assert_eq!(expanded.len(), 1);
        assert!(matches!(&expanded[0].value, Some(Bson::Array(_))));
    }

    #[test]
    fn elements_only_suppresses_the_array_itself() {
        let branches = vec![branch(
            Some(Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)])),
            false,
        )];
        let expanded = expand(&branches, ExpandMode::ElementsOnly);
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].value, Some(Bson::Int32(1)));
        assert_eq!(expanded[1].value, Some(Bson::Int32(2)));
    }

    #[test]
    fn elements_only_falls_back_to_self_for_non_arrays() {
        let branches = vec![branch(Some(Bson::Int32(5)), false)];
        let expanded = expand(&branches, ExpandMode::ElementsOnly);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].value, Some(Bson::Int32(5)));
    }

    #[test]
    fn dont_iterate_suppresses_element_expansion_entirely() {
        let branches = vec![branch(
            Some(Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)])),
            true,
        )];
        let expanded = expand(&branches, ExpandMode::Full);
        assert_eq!(expanded.len(), 1);
        assert!(matches!(&expanded[0].value, Some(Bson::Array(_))));
    }
}
