//! Element matchers (C4): single-value predicates.
//!
//! Grounded in `query/operators.rs`'s `GtOperator/LtOperator/InOperator/
//! ModOperator/SizeOperator/TypeOperator/RegexOperator/ElemMatchOperator`,
//! each kept structurally (one predicate per operator, delegating
//! comparisons to a shared helper) but retargeted at `Option<&bson::Bson>`
//! with the typed `compare` module, and generalized to report a matched
//! *index* for `$elemMatch` — the teacher's `ElemMatchOperator` discards the
//! index entirely since update operators never needed it.

use super::ast::{DocumentNode, ElementNode, RangeOp};
use super::{branched, document};
use crate::compare::{as_f64, cmp, deep_equals, is_numeric, type_code};
use crate::path::Branch;
use crate::regex_cache;
use bson::Bson;

/// What evaluating an element matcher against one branch value produced.
/// `MatchedAt` carries the array element index `$elemMatch` matched at,
/// which the branched layer (C5) uses to seed `arrayIndices` when the
/// branch itself carried none.
pub enum ElementOutcome {
    NoMatch,
    Matched,
    MatchedAt(usize),
}

fn bool_outcome(matched: bool) -> ElementOutcome {
    if matched {
        ElementOutcome::Matched
    } else {
        ElementOutcome::NoMatch
    }
}

pub fn evaluate(node: &ElementNode, value: Option<&Bson>) -> ElementOutcome {
    match node {
        ElementNode::Equality(operand) => {
            let is_null_operand = matches!(operand, Bson::Null);
            let matched = match value {
                None => is_null_operand,
                Some(v) => deep_equals(v, operand),
            };
            bool_outcome(matched)
        }

        ElementNode::RegexLiteral { pattern, options } => {
            let matched = match value {
                Some(Bson::String(s)) => regex_cache::get_or_compile(pattern, options)
                    .map(|re| re.is_match(s))
                    .unwrap_or(false),
                Some(Bson::RegularExpression(re)) => {
                    &re.pattern == pattern && &re.options == options
                }
                _ => false,
            };
            bool_outcome(matched)
        }

        ElementNode::Range(op, operand) => {
            let v = value.cloned().unwrap_or(Bson::Null);
            let same_family = type_code(&v) == type_code(operand) || (is_numeric(&v) && is_numeric(operand));
            if !same_family {
                return ElementOutcome::NoMatch;
            }
            let Some(ord) = cmp(&v, operand) else {
                return ElementOutcome::NoMatch;
            };
            let matched = match op {
                RangeOp::Lt => ord.is_lt(),
                RangeOp::Lte => ord.is_le(),
                RangeOp::Gt => ord.is_gt(),
                RangeOp::Gte => ord.is_ge(),
            };
            bool_outcome(matched)
        }

        ElementNode::In(elements) => {
            let v = value.cloned().unwrap_or(Bson::Null);
            let matched = elements
                .iter()
                .any(|el| matches!(evaluate(el, Some(&v)), ElementOutcome::Matched));
            bool_outcome(matched)
        }

        ElementNode::Mod(divisor, remainder) => {
            let matched = value
                .and_then(as_f64)
                .map(|n| n % divisor == *remainder)
                .unwrap_or(false);
            bool_outcome(matched)
        }

        ElementNode::Size(expected) => {
            let matched = matches!(value, Some(Bson::Array(arr)) if arr.len() as i64 == *expected);
            bool_outcome(matched)
        }

        ElementNode::TypeCode(expected) => {
            let matched = value.map(|v| type_code(v) == *expected).unwrap_or(false);
            bool_outcome(matched)
        }

        ElementNode::ElemMatchValue(inner) => {
            let Some(Bson::Array(arr)) = value else {
                return ElementOutcome::NoMatch;
            };
            for (i, element) in arr.iter().enumerate() {
                let synthetic = Branch {
                    value: Some(element.clone()),
                    array_indices: vec![],
                    dont_iterate: true,
                };
                if branched::evaluate(inner, std::slice::from_ref(&synthetic)).matched {
                    return ElementOutcome::MatchedAt(i);
                }
            }
            ElementOutcome::NoMatch
        }

        ElementNode::ElemMatchDoc(inner) => {
            let Some(Bson::Array(arr)) = value else {
                return ElementOutcome::NoMatch;
            };
            for (i, element) in arr.iter().enumerate() {
                // §4.4.1: a document-matcher $elemMatch operand runs against an
                // element that is itself a mapping *or* an array — a nested array
                // is indexed positionally, so its elements are addressable the
                // same way a mapping's fields are ("0", "1", ...).
                let matched = match element {
                    Bson::Document(d) => evaluate_doc(inner, d),
                    Bson::Array(nested) => evaluate_doc(inner, &indexed_document(nested)),
                    _ => false,
                };
                if matched {
                    return ElementOutcome::MatchedAt(i);
                }
            }
            ElementOutcome::NoMatch
        }
    }
}

fn evaluate_doc(node: &DocumentNode, doc: &bson::Document) -> bool {
    document::evaluate(node, doc).matched
}

/// Views an array positionally as a mapping (`"0" -> arr[0]`, ...) so a
/// document matcher's field-path lookups work against it unchanged.
fn indexed_document(arr: &[Bson]) -> bson::Document {
    let mut doc = bson::Document::new();
    for (i, item) in arr.iter().enumerate() {
        doc.insert(i.to_string(), item.clone());
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_treats_missing_and_null_operand_as_match() {
        let node = ElementNode::Equality(Bson::Null);
        assert!(matches!(evaluate(&node, None), ElementOutcome::Matched));
    }

    #[test]
    fn elem_match_doc_indexes_into_nested_array_elements() {
        let inner = DocumentNode::Field {
            path: "0".into(),
            matcher: super::super::ast::BranchedNode::Element(ElementNode::Range(RangeOp::Gt, Bson::Int32(5))),
        };
        let node = ElementNode::ElemMatchDoc(Box::new(inner));
        let outer = Bson::Array(vec![
            Bson::Array(vec![Bson::Int32(1)]),
            Bson::Array(vec![Bson::Int32(9)]),
        ]);
        assert!(matches!(evaluate(&node, Some(&outer)), ElementOutcome::MatchedAt(1)));
    }

    #[test]
    fn range_rejects_cross_type_comparison() {
        let node = ElementNode::Range(RangeOp::Gt, Bson::Int32(5));
        assert!(matches!(
            evaluate(&node, Some(&Bson::String("x".into()))),
            ElementOutcome::NoMatch
        ));
    }

    #[test]
    fn range_compares_numeric_types_across_subtype() {
        let node = ElementNode::Range(RangeOp::Gt, Bson::Int32(5));
        assert!(matches!(
            evaluate(&node, Some(&Bson::Double(5.5))),
            ElementOutcome::Matched
        ));
    }

    #[test]
    fn size_only_matches_arrays_of_exact_length() {
        let node = ElementNode::Size(2);
        let arr = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]);
        assert!(matches!(evaluate(&node, Some(&arr)), ElementOutcome::Matched));
        assert!(matches!(
            evaluate(&node, Some(&Bson::Int32(2))),
            ElementOutcome::NoMatch
        ));
    }

    #[test]
    fn mod_checks_remainder() {
        let node = ElementNode::Mod(4.0, 2.0);
        assert!(matches!(
            evaluate(&node, Some(&Bson::Int32(10))),
            ElementOutcome::Matched
        ));
        assert!(matches!(
            evaluate(&node, Some(&Bson::Int32(9))),
            ElementOutcome::NoMatch
        ));
    }
}
