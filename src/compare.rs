//! Value comparator (C1): typed equality, ordered comparison, and BSON
//! type-code extraction.
//!
//! Grounded in `value_utils::compare_values`/`compare_values_with_none`,
//! generalized from `serde_json::Value`'s three comparable shapes (number,
//! string, bool) to the full BSON type lattice `bson::Bson` exposes, and
//! from "`None` on mismatch" to the explicit type-code check callers (C4's
//! `$lt/$gt/$lte/$gte`) need to decide "incomparable" from "not equal".

use bson::Bson;
use std::cmp::Ordering;

/// The BSON type codes as assigned by the MongoDB wire protocol. Only the
/// codes reachable through `bson::Bson` are listed.
pub const TYPE_DOUBLE: i32 = 1;
pub const TYPE_STRING: i32 = 2;
pub const TYPE_OBJECT: i32 = 3;
pub const TYPE_ARRAY: i32 = 4;
pub const TYPE_BINARY: i32 = 5;
pub const TYPE_OBJECT_ID: i32 = 7;
pub const TYPE_BOOLEAN: i32 = 8;
pub const TYPE_DATE: i32 = 9;
pub const TYPE_NULL: i32 = 10;
pub const TYPE_REGEX: i32 = 11;
pub const TYPE_INT32: i32 = 16;
pub const TYPE_TIMESTAMP: i32 = 17;
pub const TYPE_INT64: i32 = 18;
pub const TYPE_DECIMAL128: i32 = 19;

/// BSON type number of `v`, per <https://www.mongodb.com/docs/manual/reference/bson-types/>.
pub fn type_code(v: &Bson) -> i32 {
    match v {
        Bson::Double(_) => TYPE_DOUBLE,
        Bson::String(_) => TYPE_STRING,
        Bson::Document(_) => TYPE_OBJECT,
        Bson::Array(_) => TYPE_ARRAY,
        Bson::Binary(_) => TYPE_BINARY,
        Bson::ObjectId(_) => TYPE_OBJECT_ID,
        Bson::Boolean(_) => TYPE_BOOLEAN,
        Bson::DateTime(_) => TYPE_DATE,
        Bson::Null => TYPE_NULL,
        Bson::RegularExpression(_) => TYPE_REGEX,
        Bson::Int32(_) => TYPE_INT32,
        Bson::Timestamp(_) => TYPE_TIMESTAMP,
        Bson::Int64(_) => TYPE_INT64,
        Bson::Decimal128(_) => TYPE_DECIMAL128,
        // Everything else (JavaScriptCode, Symbol, MinKey/MaxKey, Undefined, ...)
        // shares a catch-all code; this crate never needs to distinguish them.
        _ => 0,
    }
}

pub fn is_binary(v: &Bson) -> bool {
    matches!(v, Bson::Binary(_))
}

pub fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_))
}

pub fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Double(n) => Some(*n),
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        _ => None,
    }
}

/// Deep, extended-JSON-aware equality. Numbers compare across width
/// (`Int32(1) == Int64(1) == Double(1.0)`); regex literals compare
/// pattern+options; binary blobs compare bytewise; arrays/documents compare
/// element-wise and key-order-sensitively for documents (BSON document
/// equality is order-sensitive, unlike JSON object equality).
pub fn deep_equals(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Null, Bson::Null) => true,
        (a, b) if as_f64(a).is_some() && as_f64(b).is_some() => as_f64(a) == as_f64(b),
        (Bson::String(x), Bson::String(y)) => x == y,
        (Bson::Boolean(x), Bson::Boolean(y)) => x == y,
        (Bson::DateTime(x), Bson::DateTime(y)) => x == y,
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x == y,
        (Bson::Binary(x), Bson::Binary(y)) => x.subtype == y.subtype && x.bytes == y.bytes,
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => {
            x.pattern == y.pattern && x.options == y.options
        }
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(i, j)| deep_equals(i, j))
        }
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && deep_equals(va, vb))
        }
        _ => false,
    }
}

/// Orders two values of the *same* type code. Returns `None` when the type
/// codes differ (callers must check `type_code` themselves before relying
/// on an ordering — this mirrors C4's `$lt/$gt/$lte/$gte` contract, which
/// treats cross-type comparisons as "does not match" rather than falling
/// back to some ambient total order).
pub fn cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if type_code(a) != type_code(b) {
        // Numbers of different BSON subtypes (Int32 vs Int64 vs Double)
        // still compare numerically — MongoDB treats "number" as one
        // comparable family regardless of wire subtype.
        if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
            return x.partial_cmp(&y);
        }
        return None;
    }
    match (a, b) {
        (Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_), _) => {
            as_f64(a)?.partial_cmp(&as_f64(b)?)
        }
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Binary(x), Bson::Binary(y)) => Some(x.bytes.cmp(&y.bytes)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Sort-helper ordering used outside the matcher proper (e.g. by an
/// external sort key generator): `None` sorts before any value, and
/// incomparable pairs are treated as equal rather than panicking.
pub fn cmp_with_none(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => cmp(x, y).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{bson, Bson};

    #[test]
    fn numeric_equality_crosses_width() {
        assert!(deep_equals(&Bson::Int32(5), &Bson::Int64(5)));
        assert!(deep_equals(&Bson::Int32(5), &Bson::Double(5.0)));
        assert!(!deep_equals(&Bson::Int32(5), &Bson::Double(5.5)));
    }

    #[test]
    fn document_equality_is_order_sensitive() {
        let a = bson!({ "x": 1, "y": 2 });
        let b = bson!({ "y": 2, "x": 1 });
        assert!(!deep_equals(&a, &b));
        assert!(deep_equals(&a, &a));
    }

    #[test]
    fn cmp_rejects_mismatched_type_codes() {
        assert_eq!(cmp(&Bson::String("x".into()), &Bson::Int32(1)), None);
    }

    #[test]
    fn cmp_numbers_cross_subtype() {
        assert_eq!(
            cmp(&Bson::Int32(5), &Bson::Int64(3)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn regex_literal_equality_is_pattern_and_options() {
        let a = Bson::RegularExpression(bson::Regex {
            pattern: "^a".into(),
            options: "i".into(),
        });
        let b = Bson::RegularExpression(bson::Regex {
            pattern: "^a".into(),
            options: "i".into(),
        });
        let c = Bson::RegularExpression(bson::Regex {
            pattern: "^a".into(),
            options: "m".into(),
        });
        assert!(deep_equals(&a, &b));
        assert!(!deep_equals(&a, &c));
    }
}
