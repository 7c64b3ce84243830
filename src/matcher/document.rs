//! Document matchers (C6): compose branched matchers by field path and
//! implement the root logical operators `$and/$or/$nor/$where/$comment` (and
//! the additional `$expr`, see §0.6).
//!
//! Grounded in `query.rs::Query`, generalized from "store the selector as
//! JSON and re-walk it on every call" to "walk a pre-built AST on every
//! call" — the shift the spec's Design Notes call for.

use super::ast::{DocumentNode, ExprCmpOp, ExprNode, MatchResult};
use super::branched;
use crate::compare;
use crate::path::lookup;
use bson::{Bson, Document};

pub fn evaluate(node: &DocumentNode, doc: &Document) -> MatchResult {
    match node {
        DocumentNode::Field { path, matcher } => {
            let branches = lookup(path, doc);
            branched::evaluate(matcher, &branches)
        }
        DocumentNode::And(children) => evaluate_and(children, doc),
        DocumentNode::Or(children) => evaluate_or(children, doc),
        DocumentNode::Nor(children) => {
            let any_matched = children.iter().any(|c| evaluate(c, doc).matched);
            MatchResult::simple(!any_matched)
        }
        DocumentNode::Where(f) => MatchResult::simple(f(doc)),
        DocumentNode::Expr(expr) => MatchResult::simple(eval_expr_bool(expr, doc)),
        DocumentNode::AlwaysTrue => MatchResult::simple(true),
        DocumentNode::NothingMatches => MatchResult::simple(false),
        DocumentNode::Callable(f) => MatchResult::simple(f(doc)),
    }
}

/// Unified AND, mirrored from `branched::evaluate_and`: implicit field
/// conjunction (a mapping's non-`$` keys) and explicit `$and` both reduce
/// through this rule.
fn evaluate_and(children: &[DocumentNode], doc: &Document) -> MatchResult {
    if children.is_empty() {
        return MatchResult::simple(true);
    }
    let mut distance = None;
    let mut array_indices = None;
    for child in children {
        let r = evaluate(child, doc);
        if !r.matched {
            return MatchResult::no_match();
        }
        if distance.is_none() {
            distance = r.distance;
        }
        if r.array_indices.is_some() {
            array_indices = r.array_indices;
        }
    }
    MatchResult {
        matched: true,
        array_indices,
        distance,
    }
}

fn evaluate_or(children: &[DocumentNode], doc: &Document) -> MatchResult {
    if children.len() == 1 {
        return evaluate(&children[0], doc);
    }
    for child in children {
        let r = evaluate(child, doc);
        if r.matched {
            return MatchResult::simple(true);
        }
    }
    MatchResult::no_match()
}

fn eval_expr_value(node: &ExprNode, doc: &Document) -> Option<Bson> {
    match node {
        ExprNode::FieldRef(path) => lookup(path, doc).into_iter().next().and_then(|b| b.value),
        ExprNode::Literal(v) => Some(v.clone()),
        ExprNode::Cmp(..) | ExprNode::And(_) | ExprNode::Or(_) | ExprNode::Not(_) => None,
    }
}

fn eval_expr_bool(node: &ExprNode, doc: &Document) -> bool {
    match node {
        ExprNode::Cmp(op, a, b) => {
            let (va, vb) = (eval_expr_value(a, doc), eval_expr_value(b, doc));
            match (va, vb) {
                (Some(x), Some(y)) => match op {
                    ExprCmpOp::Eq => compare::deep_equals(&x, &y),
                    ExprCmpOp::Ne => !compare::deep_equals(&x, &y),
                    ExprCmpOp::Gt => compare::cmp(&x, &y).map(|o| o.is_gt()).unwrap_or(false),
                    ExprCmpOp::Gte => compare::cmp(&x, &y).map(|o| o.is_ge()).unwrap_or(false),
                    ExprCmpOp::Lt => compare::cmp(&x, &y).map(|o| o.is_lt()).unwrap_or(false),
                    ExprCmpOp::Lte => compare::cmp(&x, &y).map(|o| o.is_le()).unwrap_or(false),
                },
                _ => false,
            }
        }
        ExprNode::And(children) => children.iter().all(|c| eval_expr_bool(c, doc)),
        ExprNode::Or(children) => children.iter().any(|c| eval_expr_bool(c, doc)),
        ExprNode::Not(inner) => !eval_expr_bool(inner, doc),
        ExprNode::FieldRef(_) | ExprNode::Literal(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ast::{BranchedNode, ElementNode};
    use bson::doc;

    #[test]
    fn field_lookup_feeds_branched_matcher() {
        let node = DocumentNode::Field {
            path: "a".into(),
            matcher: BranchedNode::Element(ElementNode::Equality(Bson::Int32(1))),
        };
        assert!(evaluate(&node, &doc! { "a": 1 }).matched);
        assert!(!evaluate(&node, &doc! { "a": 2 }).matched);
    }

    #[test]
    fn or_with_single_child_passes_through_unchanged() {
        let child = DocumentNode::Field {
            path: "a".into(),
            matcher: BranchedNode::Element(ElementNode::Equality(Bson::Int32(1))),
        };
        let node = DocumentNode::Or(vec![child]);
        assert!(evaluate(&node, &doc! { "a": 1 }).matched);
    }

    #[test]
    fn nor_matches_only_when_every_child_fails() {
        let a = DocumentNode::Field {
            path: "a".into(),
            matcher: BranchedNode::Element(ElementNode::Equality(Bson::Int32(1))),
        };
        let node = DocumentNode::Nor(vec![a]);
        assert!(evaluate(&node, &doc! { "a": 2 }).matched);
        assert!(!evaluate(&node, &doc! { "a": 1 }).matched);
    }

    #[test]
    fn expr_compares_two_field_references() {
        let expr = ExprNode::Cmp(
            ExprCmpOp::Gt,
            Box::new(ExprNode::FieldRef("a".into())),
            Box::new(ExprNode::FieldRef("b".into())),
        );
        let node = DocumentNode::Expr(expr);
        assert!(evaluate(&node, &doc! { "a": 5, "b": 3 }).matched);
        assert!(!evaluate(&node, &doc! { "a": 1, "b": 3 }).matched);
    }
}
