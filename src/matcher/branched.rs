//! Branched matchers (C5): lift element matchers across a field's branches,
//! and implement the operators that only make sense across a whole branch
//! list (`$not`, `$exists`, `$all`, `$near`).
//!
//! Grounded in the teacher's `NotOperator`/`ExistsOperator`/`AllOperator`
//! (the "wrap and invert/quantify" shape they already use), generalized
//! from a plain `Result<bool>` to the branch/`arrayIndices`/`distance`
//! propagation the teacher's flat signature has no room for at all.

use super::ast::{BranchedNode, ElementNode, MatchResult, NearMode, NearSpec};
use super::element::{self, ElementOutcome};
use crate::branch::{expand, ExpandMode};
use crate::geo;
use crate::path::{Branch, IndexStep};
use bson::Bson;

fn expand_mode_for(el: &ElementNode) -> ExpandMode {
    match el {
        ElementNode::Size(_) | ElementNode::ElemMatchValue(_) | ElementNode::ElemMatchDoc(_) => {
            ExpandMode::SelfOnly
        }
        ElementNode::TypeCode(_) => ExpandMode::ElementsOnly,
        _ => ExpandMode::Full,
    }
}

fn non_empty(indices: Vec<IndexStep>) -> Option<Vec<IndexStep>> {
    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

pub fn evaluate(node: &BranchedNode, branches: &[Branch]) -> MatchResult {
    match node {
        BranchedNode::Element(el) => evaluate_element(el, branches),
        BranchedNode::Not(inner) => {
            let inverted = !evaluate(inner, branches).matched;
            MatchResult::simple(inverted)
        }
        BranchedNode::Exists(expected) => {
            let present = branches.iter().any(|b| b.value.is_some());
            MatchResult::simple(present == *expected)
        }
        BranchedNode::Near(spec) => evaluate_near(spec, branches),
        BranchedNode::And(children) => evaluate_and(children, branches),
    }
}

fn evaluate_element(el: &ElementNode, branches: &[Branch]) -> MatchResult {
    let expanded = expand(branches, expand_mode_for(el));
    for candidate in &expanded {
        match element::evaluate(el, candidate.value.as_ref()) {
            ElementOutcome::Matched => {
                return MatchResult {
                    matched: true,
                    array_indices: non_empty(candidate.array_indices.clone()),
                    distance: None,
                };
            }
            ElementOutcome::MatchedAt(idx) => {
                let mut indices = candidate.array_indices.clone();
                if indices.is_empty() {
                    indices.push(IndexStep::Implicit(idx));
                }
                return MatchResult {
                    matched: true,
                    array_indices: non_empty(indices),
                    distance: None,
                };
            }
            ElementOutcome::NoMatch => {}
        }
    }
    MatchResult::no_match()
}

/// Unified AND (§4.7): shared between `$all`'s sub-matchers, an operator
/// mapping's entries (§4.8), and document-level `$and`/implicit field
/// conjunction (C6 reuses the same rule, see `document::evaluate_and`).
fn evaluate_and(children: &[BranchedNode], branches: &[Branch]) -> MatchResult {
    if children.is_empty() {
        return MatchResult::simple(true);
    }
    let mut distance = None;
    let mut array_indices = None;
    for child in children {
        let r = evaluate(child, branches);
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

fn evaluate_near(spec: &NearSpec, branches: &[Branch]) -> MatchResult {
    let expanded = expand(branches, ExpandMode::Full);
    let mut best: Option<(f64, Vec<IndexStep>)> = None;

    for candidate in &expanded {
        let Some(value) = &candidate.value else {
            continue;
        };
        let distance = match &spec.mode {
            NearMode::GeoJson { geometry } => near_geojson_distance(geometry, value, spec.max_distance),
            NearMode::Pair { center } => geo::coerce_pair(value).map(|p| geo::pair_distance(*center, p)),
        };
        let Some(d) = distance else {
            continue;
        };
        if d > spec.max_distance {
            continue;
        }
        let replace = match &best {
            Some((best_d, _)) => d < *best_d,
            None => true,
        };
        if replace {
            best = Some((d, candidate.array_indices.clone()));
        }
    }

    match best {
        Some((d, indices)) => MatchResult {
            matched: true,
            array_indices: non_empty(indices),
            distance: Some(d),
        },
        None => MatchResult::no_match(),
    }
}

fn near_geojson_distance(geometry: &bson::Document, candidate: &Bson, max_distance: f64) -> Option<f64> {
    let center = geo::coerce_geojson_point(&Bson::Document(geometry.clone()))?;
    match geo::geojson_type(candidate) {
        Some("Point") => {
            let point = geo::coerce_geojson_point(candidate)?;
            Some(geo::point_distance(center, point))
        }
        Some(_) => {
            let candidate_geom = candidate.as_document()?;
            if geo::geometry_within_radius(candidate_geom, center, max_distance) {
                Some(0.0)
            } else {
                Some(max_distance + 1.0)
            }
        }
        None => None,
    }
}
