//! Structural predicates over `bson::Bson` values.
//!
//! These are the shape tests the compiler (C7) and document matcher (C6)
//! use to tell a field path from a logical operator, an operator mapping
//! from a literal document, and so on. Kept as free functions rather than
//! inherent methods since `bson::Bson`/`bson::Document` are foreign types.

use bson::{Bson, Document};

pub fn is_array(v: &Bson) -> bool {
    matches!(v, Bson::Array(_))
}

pub fn is_mapping(v: &Bson) -> bool {
    matches!(v, Bson::Document(_))
}

pub fn is_indexable(v: &Bson) -> bool {
    is_array(v) || is_mapping(v)
}

/// True iff every top-level key of `doc` starts with `$`.
///
/// An empty mapping is treated as an operator mapping only when
/// `allow_empty` is set — MongoDB accepts `{}` as "no constraint" wherever
/// an operator mapping is expected, but rejects it as an ambiguous literal
/// document match site (e.g. `$elemMatch: {}`).
pub fn is_operator_mapping(doc: &Document, allow_empty: bool) -> bool {
    if doc.is_empty() {
        return allow_empty;
    }
    doc.keys().all(|k| k.starts_with('$'))
}

pub fn is_numeric_key(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// True iff `v` is a scalar usable as the `_id` shorthand: string, number,
/// binary, date, or ObjectId. Arrays, documents, booleans, regexes, and
/// null are not valid `_id` shorthand values.
pub fn selector_is_id(v: &Bson) -> bool {
    matches!(
        v,
        Bson::String(_)
            | Bson::Int32(_)
            | Bson::Int64(_)
            | Bson::Double(_)
            | Bson::Binary(_)
            | Bson::DateTime(_)
            | Bson::ObjectId(_)
    )
}
