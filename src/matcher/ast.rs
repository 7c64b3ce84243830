//! The compiled selector: a tagged AST interpreted by `document`/`branched`/
//! `element`'s `evaluate` functions, one `match` per layer.
//!
//! Grounded in Design Notes' "Closures → tagged variants" guidance: the
//! teacher's `query.rs`/`operators.rs` re-walk a stored `serde_json::Value`
//! selector on every call via a `HashMap<&str, Box<dyn OperatorMatcher>>`
//! Strategy-pattern registry (`query/operators.rs::OPERATOR_REGISTRY`). This
//! AST is what that registry's lookups get compiled *into*, once, so that
//! matching a document never re-parses the selector or re-dispatches on
//! operator name strings.

use crate::path::IndexStep;
use bson::{Bson, Document};
use std::sync::Arc;

/// A user-supplied predicate, used for the top-level callable-selector
/// shape and for registered `$where` callbacks.
pub type WhereFn = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// The outcome of matching a selector (or a sub-selector) against a
/// document or branch list. Mirrors §3's "Match result".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub array_indices: Option<Vec<IndexStep>>,
    pub distance: Option<f64>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        MatchResult::default()
    }

    pub fn simple(matched: bool) -> Self {
        MatchResult {
            matched,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Single-value predicates (C4): the leaves evaluated against one
/// already-expanded branch value.
#[derive(Clone)]
pub enum ElementNode {
    Equality(Bson),
    RegexLiteral { pattern: String, options: String },
    Range(RangeOp, Bson),
    In(Vec<ElementNode>),
    Mod(f64, f64),
    Size(i64),
    TypeCode(i32),
    ElemMatchValue(Box<BranchedNode>),
    ElemMatchDoc(Box<DocumentNode>),
}

/// Predicates lifted across a field's branches (C5).
#[derive(Clone)]
pub enum BranchedNode {
    Element(ElementNode),
    Not(Box<BranchedNode>),
    Exists(bool),
    Near(NearSpec),
    /// Unified AND (§4.7): 0 children is vacuously true, 1 child passes its
    /// result through unchanged, N children AND with first-distance /
    /// last-array-indices propagation.
    And(Vec<BranchedNode>),
}

#[derive(Clone)]
pub struct NearSpec {
    pub mode: NearMode,
    pub max_distance: f64,
}

#[derive(Clone)]
pub enum NearMode {
    GeoJson { geometry: Document },
    Pair { center: (f64, f64) },
}

/// Composition by field path (C6): the root of a compiled `Matcher`.
#[derive(Clone)]
pub enum DocumentNode {
    Field { path: String, matcher: BranchedNode },
    And(Vec<DocumentNode>),
    /// A single child is returned unchanged, including its array indices —
    /// unlike `And`/`Nor`, `Or` with more than one child discards them.
    Or(Vec<DocumentNode>),
    Nor(Vec<DocumentNode>),
    Where(WhereFn),
    Expr(ExprNode),
    AlwaysTrue,
    NothingMatches,
    Callable(WhereFn),
}

/// `$expr` aggregation-comparison expressions (§0.6).
#[derive(Clone)]
pub enum ExprNode {
    FieldRef(String),
    Literal(Bson),
    Cmp(ExprCmpOp, Box<ExprNode>, Box<ExprNode>),
    And(Vec<ExprNode>),
    Or(Vec<ExprNode>),
    Not(Box<ExprNode>),
}

#[derive(Clone, Copy)]
pub enum ExprCmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}
