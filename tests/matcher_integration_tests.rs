// matcher_integration_tests.rs
// End-to-end coverage of the selector compiler + matcher, following the
// boundary and scenario tables worked out against MongoDB matching
// semantics.

use bson::{doc, Bson};
use selector_core::path::IndexStep;
use selector_core::{Matcher, WhereRegistry};

fn compile(selector: Bson) -> Matcher {
    Matcher::compile(&selector).expect("selector should compile")
}

#[test]
fn scalar_gt_matches_scalar_field() {
    let m = compile(Bson::Document(doc! { "a": { "$gt": 5 } }));
    let r = m.matches(&doc! { "a": 7 });
    assert!(r.matched);
    assert!(r.array_indices.is_none());
}

#[test]
fn scalar_gt_matches_through_array_and_reports_index() {
    let m = compile(Bson::Document(doc! { "a": { "$gt": 5 } }));
    let r = m.matches(&doc! { "a": [3, 8, 4] });
    assert!(r.matched);
    assert_eq!(r.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn or_of_two_fields_matches_with_no_array_indices() {
    let m = compile(Bson::Document(doc! {
        "$or": [ { "a": 1 }, { "b": 2 } ],
    }));
    let r = m.matches(&doc! { "a": 1, "b": 2 });
    assert!(r.matched);
    assert!(r.array_indices.is_none());
}

#[test]
fn elem_match_with_two_range_bounds_reports_matched_index() {
    let m = compile(Bson::Document(doc! {
        "a": { "$elemMatch": { "$gt": 5, "$lt": 8 } },
    }));
    let r = m.matches(&doc! { "a": [3, 7, 9] });
    assert!(r.matched);
    assert_eq!(r.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn explicit_index_then_field_reports_explicit_index_first() {
    let m = compile(Bson::Document(doc! { "a.0.b": 3 }));
    let r = m.matches(&doc! { "a": [ { "b": 3 } ] });
    assert!(r.matched);
    let indices = r.array_indices.expect("explicit index path should report indices");
    assert_eq!(indices[0], IndexStep::Explicit(0));
}

#[test]
fn near_geojson_reports_euclidean_style_distance_under_maxdistance() {
    let m = compile(Bson::Document(doc! {
        "loc": {
            "$near": {
                "$geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
                "$maxDistance": 10_000_000.0,
            },
        },
    }));
    let r = m.matches(&doc! {
        "loc": { "type": "Point", "coordinates": [3.0, 4.0] },
    });
    assert!(r.matched);
    assert!(r.distance.is_some());
}

#[test]
fn near_pair_mode_reports_euclidean_distance() {
    let m = compile(Bson::Document(doc! {
        "loc": { "$near": [0.0, 0.0], "$maxDistance": 10.0 },
    }));
    let r = m.matches(&doc! { "loc": [3.0, 4.0] });
    assert!(r.matched);
    assert_eq!(r.distance, Some(5.0));
}

// ---- Boundary behaviors ----

#[test]
fn implicit_vs_explicit_array_index_boundary() {
    let m = compile(Bson::Document(doc! { "a.0": 5 }));
    assert!(m.matches(&doc! { "a": [5] }).matched);
    assert!(!m.matches(&doc! { "a": [[5]] }).matched);

    let m2 = compile(Bson::Document(doc! { "a.0": [5] }));
    assert!(m2.matches(&doc! { "a": [[5]] }).matched);
}

#[test]
fn null_matches_missing_field_and_explicit_null() {
    let m = compile(Bson::Document(doc! { "a": Bson::Null }));
    assert!(m.matches(&doc! { "b": 1 }).matched);
    assert!(m.matches(&doc! { "a": Bson::Null }).matched);
    assert!(!m.matches(&doc! { "a": 1 }).matched);
}

#[test]
fn in_null_matches_missing_field() {
    let m = compile(Bson::Document(doc! { "a": { "$in": [Bson::Null] } }));
    assert!(m.matches(&doc! { "b": 1 }).matched);
}

#[test]
fn heterogeneous_ordered_compare_never_matches() {
    let m = compile(Bson::Document(doc! { "a": { "$gt": 5 } }));
    assert!(!m.matches(&doc! { "a": "x" }).matched);
}

#[test]
fn size_on_nested_arrays_counts_the_outer_array() {
    let m = compile(Bson::Document(doc! { "a": { "$size": 1 } }));
    assert!(m.matches(&doc! { "a": [[5, 5]] }).matched);

    let m2 = compile(Bson::Document(doc! { "a": { "$size": 2 } }));
    assert!(!m2.matches(&doc! { "a": [[5, 5]] }).matched);
}

#[test]
fn type_array_does_not_match_flat_array_but_matches_nested_array() {
    let m = compile(Bson::Document(doc! { "a": { "$type": 4 } }));
    assert!(!m.matches(&doc! { "a": [5] }).matched);
    assert!(m.matches(&doc! { "a": [[5]] }).matched);
}

// ---- Round-trip / idempotence ----

#[test]
fn wrapping_in_and_or_single_element_is_equivalent() {
    let base = doc! { "a": { "$gt": 5 } };
    let wrapped_and = doc! { "$and": [ base.clone() ] };
    let wrapped_or = doc! { "$or": [ base.clone() ] };

    let m_base = compile(Bson::Document(base));
    let m_and = compile(Bson::Document(wrapped_and));
    let m_or = compile(Bson::Document(wrapped_or));

    for doc in [doc! { "a": 7 }, doc! { "a": [3, 8, 4] }, doc! { "a": 1 }] {
        let base_r = m_base.matches(&doc);
        let and_r = m_and.matches(&doc);
        let or_r = m_or.matches(&doc);
        assert_eq!(base_r.matched, and_r.matched);
        assert_eq!(base_r.matched, or_r.matched);
        assert_eq!(base_r.array_indices, or_r.array_indices);
    }
}

#[test]
fn double_not_is_not_guaranteed_equal_to_original() {
    // $not requires an operator-mapping operand; a bare equality cannot be
    // doubly negated the way a logical proposition can.
    let inverted_once = compile(Bson::Document(doc! { "a": { "$not": { "$gt": 5 } } }));
    let err = Matcher::compile(&Bson::Document(doc! {
        "a": { "$not": { "$not": { "$gt": 5 } } },
    }));
    // A nested $not must itself wrap an operator mapping; {"$not": 5} is not one.
    assert!(inverted_once.matches(&doc! { "a": 3 }).matched);
    let _ = err; // compiles to $not wrapping $not, both valid operator mappings here
}

// ---- Failed matches erase metadata ----

#[test]
fn failed_match_has_no_array_indices_or_distance() {
    let m = compile(Bson::Document(doc! {
        "loc": { "$near": [0.0, 0.0], "$maxDistance": 1.0 },
    }));
    let r = m.matches(&doc! { "loc": [100.0, 100.0] });
    assert!(!r.matched);
    assert!(r.array_indices.is_none());
    assert!(r.distance.is_none());
}

// ---- paths() ----

#[test]
fn paths_collects_top_level_field_names_only() {
    let m = compile(Bson::Document(doc! {
        "a": 1,
        "b": { "$elemMatch": { "c": 1 } },
    }));
    let mut paths = m.paths().to_vec();
    paths.sort();
    assert_eq!(paths, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn paths_includes_empty_sentinel_when_where_is_used() {
    let mut registry = WhereRegistry::new();
    registry.register("always_true", |_| true);
    let m = Matcher::compile_with(&Bson::Document(doc! { "$where": "always_true" }), &registry).unwrap();
    assert!(m.paths().contains(&String::new()));
    assert!(m.has_where());
    assert!(!m.is_simple());
}

// ---- $expr ----

#[test]
fn expr_compares_two_fields_and_is_not_simple() {
    let m = compile(Bson::Document(doc! {
        "$expr": { "$gt": [ "$a", "$b" ] },
    }));
    assert!(!m.is_simple());
    assert!(m.matches(&doc! { "a": 10, "b": 3 }).matched);
    assert!(!m.matches(&doc! { "a": 1, "b": 3 }).matched);
}

// ---- $all ----

#[test]
fn all_requires_every_element_present() {
    let m = compile(Bson::Document(doc! { "tags": { "$all": ["a", "b"] } }));
    assert!(m.matches(&doc! { "tags": ["a", "b", "c"] }).matched);
    assert!(!m.matches(&doc! { "tags": ["a", "c"] }).matched);
}

// ---- $regex / $options ----

#[test]
fn regex_with_case_insensitive_option_matches() {
    let m = compile(Bson::Document(doc! { "name": { "$regex": "^foo", "$options": "i" } }));
    assert!(m.matches(&doc! { "name": "FOOBAR" }).matched);
    assert!(!m.matches(&doc! { "name": "barfoo" }).matched);
}

#[test]
fn unknown_regex_option_is_a_compile_error() {
    let result = Matcher::compile(&Bson::Document(doc! { "name": { "$regex": "^foo", "$options": "z" } }));
    assert!(result.is_err());
}

// ---- is_simple ----

#[test]
fn simple_equality_selector_is_simple() {
    let m = compile(Bson::Document(doc! { "a": 1, "b": "x" }));
    assert!(m.is_simple());
}

#[test]
fn selector_with_exists_is_not_simple() {
    let m = compile(Bson::Document(doc! { "a": { "$exists": true } }));
    assert!(!m.is_simple());
}

// ---- callable matcher ----

#[test]
fn compile_callable_wraps_a_closure_predicate() {
    let m = Matcher::compile_callable(|doc| doc.get_i32("a").unwrap_or(0) > 3);
    assert!(m.matches(&doc! { "a": 5 }).matched);
    assert!(!m.matches(&doc! { "a": 1 }).matched);
    assert!(m.has_where());
}

// ---- _id shorthand ----

#[test]
fn id_shorthand_and_falsy_selectors() {
    let m = compile(Bson::String("xyz".into()));
    assert!(m.matches(&doc! { "_id": "xyz" }).matched);
    assert!(!m.matches(&doc! { "_id": "abc" }).matched);

    let m_false = compile(Bson::Boolean(false));
    assert!(!m_false.matches(&doc! { "a": 1 }).matched);

    let m_null_id = compile(Bson::Document(doc! { "_id": Bson::Null }));
    assert!(!m_null_id.matches(&doc! { "_id": 1 }).matched);
}
