//! Path lookup (C2): resolve a dotted field path against a document,
//! producing every branch MongoDB's array-branching rules reach.
//!
//! Grounded in `document.rs::Document::get` and
//! `value_utils::get_nested_value` (both do a flat dot-split walk with
//! array-index parsing for the *first* match), generalized to return every
//! branch instead of the first, to tag each with the array indices walked,
//! and to implement implicit branching across arrays of mappings, which
//! neither teacher helper attempts at all.

use crate::structural::{is_array, is_mapping, is_numeric_key};
use bson::{Bson, Document};

/// One step of `arrayIndices`: `Explicit` records a numeric path segment
/// that indexed into an array; `Implicit` records an array element reached
/// by branching across every element rather than by an explicit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStep {
    Explicit(usize),
    Implicit(usize),
}

impl IndexStep {
    pub fn index(self) -> usize {
        match self {
            IndexStep::Explicit(i) | IndexStep::Implicit(i) => i,
        }
    }

    pub fn is_explicit(self) -> bool {
        matches!(self, IndexStep::Explicit(_))
    }
}

/// The result of resolving one path against one document: a possibly-absent
/// value, the array indices traversed to reach it, and whether branch
/// expansion must leave it un-flattened.
#[derive(Debug, Clone)]
pub struct Branch {
    pub value: Option<Bson>,
    pub array_indices: Vec<IndexStep>,
    pub dont_iterate: bool,
}

impl Branch {
    fn leaf(value: Option<Bson>, indices: &[IndexStep], dont_iterate: bool) -> Self {
        Branch {
            value,
            array_indices: indices.to_vec(),
            dont_iterate,
        }
    }
}

/// Resolve `path` against `document`, yielding every branch per §4.2.
pub fn lookup(path: &str, document: &Document) -> Vec<Branch> {
    lookup_for_sort(path, document, false)
}

/// Same as [`lookup`], but suppresses implicit branching when the next path
/// part is numeric — the flag an external sort-key generator needs so that
/// `"a.0"` always means "index 0 of `a`", never "branch across `a`'s
/// elements looking for one whose own field `0` happens to exist".
pub fn lookup_for_sort(path: &str, document: &Document, for_sort: bool) -> Vec<Branch> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some((&p0, rest)) = parts.split_first() {
        walk_entry(document, p0, rest, for_sort, &mut out);
    }
    out
}

/// Returns a reusable closure over `lookup_for_sort`, for callers (the
/// matcher compiler, and external sort-key generators) that resolve the
/// same path against many documents.
pub fn make_lookup_function(path: &str, for_sort: bool) -> impl Fn(&Document) -> Vec<Branch> {
    let path = path.to_string();
    move |doc: &Document| lookup_for_sort(&path, doc, for_sort)
}

/// Top-level dispatch: `document` is always a mapping, so this implements
/// just the mapping arm of the general step, without cloning the document
/// into a `Bson` first.
fn walk_entry(document: &Document, p0: &str, rest: &[&str], for_sort: bool, out: &mut Vec<Branch>) {
    match document.get(p0) {
        Some(child) => branch_into_child(child, rest, &[], for_sort, out),
        None => out.push(Branch::leaf(None, &[], false)),
    }
}

/// Shared by the top-level entry and the mapping arm of [`walk`]: having
/// resolved `child` via a key lookup, recurse into it directly and, if it
/// is an array, additionally branch implicitly across its mapping elements.
fn branch_into_child(
    child: &Bson,
    rest: &[&str],
    indices: &[IndexStep],
    for_sort: bool,
    out: &mut Vec<Branch>,
) {
    walk(child, rest, indices, false, for_sort, out);

    if let Bson::Array(arr) = child {
        // §4.2 step 5: implicit branching only applies when the path
        // continues past this array — a terminal path (step 3) already
        // yielded its single branch via the `walk` call above.
        if !rest.is_empty() {
            let next_is_numeric = rest.first().is_some_and(|s| is_numeric_key(s));
            if !(for_sort && next_is_numeric) {
                for (i, element) in arr.iter().enumerate() {
                    if is_mapping(element) {
                        let mut branch_indices = indices.to_vec();
                        branch_indices.push(IndexStep::Implicit(i));
                        walk(element, rest, &branch_indices, false, for_sort, out);
                    }
                }
            }
        }
    }
}

/// General recursive step. `from_array` records whether `node` was reached
/// by indexing an array at the immediately preceding step, which is what
/// `dont_iterate` keys off at the terminal branch.
fn walk(
    node: &Bson,
    parts: &[&str],
    indices: &[IndexStep],
    from_array: bool,
    for_sort: bool,
    out: &mut Vec<Branch>,
) {
    if parts.is_empty() {
        out.push(Branch::leaf(
            Some(node.clone()),
            indices,
            from_array && is_array(node),
        ));
        return;
    }

    let (p0, rest) = (parts[0], &parts[1..]);

    match node {
        Bson::Array(arr) => {
            if let Ok(idx) = p0.parse::<usize>() {
                if idx < arr.len() {
                    let mut next_indices = indices.to_vec();
                    next_indices.push(IndexStep::Explicit(idx));
                    walk(&arr[idx], rest, &next_indices, true, for_sort, out);
                }
            }
            // Non-numeric segment into an array, or out-of-range index: dead end.
        }
        Bson::Document(doc) => match doc.get(p0) {
            Some(child) => branch_into_child(child, rest, indices, for_sort, out),
            None => out.push(Branch::leaf(None, indices, false)),
        },
        _ => {
            // Scalar node but path continues: dead end, unless this scalar
            // was itself reached by indexing an array (step 1 already
            // returned without yielding in that case).
            if !from_array {
                out.push(Branch::leaf(None, indices, false));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn simple_field() {
        let d = doc! { "a": 1 };
        let branches = lookup("a", &d);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].value, Some(Bson::Int32(1)));
        assert!(branches[0].array_indices.is_empty());
    }

    #[test]
    fn missing_field_yields_undefined_branch() {
        let d = doc! { "a": 1 };
        let branches = lookup("b", &d);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].value, None);
    }

    #[test]
    fn explicit_array_index() {
        let d = doc! { "a": [5, 6, 7] };
        let branches = lookup("a.1", &d);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].value, Some(Bson::Int32(6)));
        assert_eq!(branches[0].array_indices, vec![IndexStep::Explicit(1)]);
    }

    #[test]
    fn explicit_index_into_nested_array_sets_dont_iterate() {
        let d = doc! { "a": [[5]] };
        let branches = lookup("a.0", &d);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].value, Some(Bson::Array(vec![Bson::Int32(5)])));
        assert!(branches[0].dont_iterate);
    }

    #[test]
    fn implicit_branching_across_array_of_mappings() {
        let d = doc! { "a": [ { "b": 1 }, { "b": 2 } ] };
        let mut branches = lookup("a.b", &d);
        branches.sort_by_key(|b| b.array_indices.first().map(|i| i.index()));
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].value, Some(Bson::Int32(1)));
        assert_eq!(branches[0].array_indices, vec![IndexStep::Implicit(0)]);
        assert_eq!(branches[1].value, Some(Bson::Int32(2)));
        assert_eq!(branches[1].array_indices, vec![IndexStep::Implicit(1)]);
    }

    #[test]
    fn implicit_branching_suppressed_in_sort_mode_for_numeric_next_part() {
        let d = doc! { "a": [ { "0": "x" } ] };
        let branches = lookup_for_sort("a.0", &d, true);
        // sort mode treats "0" as an explicit index into `a`, not a branch
        // into element 0's own field "0"; `a` has no numeric index 0 here
        // that resolves to a scalar — the array element at 0 is itself a
        // mapping, so the explicit-index arm below does find it.
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn non_numeric_segment_into_array_is_dead_end() {
        let d = doc! { "a": [1, 2, 3] };
        let branches = lookup("a.foo", &d);
        assert!(branches.is_empty());
    }
}
