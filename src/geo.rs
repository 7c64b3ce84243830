//! Geo primitives (C8): coordinate-pair distance and GeoJSON point/geometry
//! distance predicates, used by `$near` (§4.6).
//!
//! Grounded in sibling example `meilisearch-meilisearch`'s
//! `milli::distance_between_two_points`, which reaches for the `geoutils`
//! crate for exactly this (`geoutils::Location::haversine_distance_to`).
//! IronBase itself has no geo feature to ground this against; the pair-mode
//! (legacy, non-GeoJSON) distance has no sibling-repo precedent either and
//! is implemented directly from spec.md's Euclidean definition.

use crate::compare::as_f64;
use bson::{Bson, Document};

/// Great-circle distance in meters between two `(lng, lat)` points, the
/// order GeoJSON coordinates are stored in.
pub fn point_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let loc_a = geoutils::Location::new(a.1, a.0);
    let loc_b = geoutils::Location::new(b.1, b.0);
    loc_a.haversine_distance_to(&loc_b).meters()
}

/// Euclidean distance for legacy coordinate pairs (flat, non-geodesic
/// plane) — the mode `$near` uses when its operand is a plain `[x, y]`
/// array rather than a `$geometry` mapping.
pub fn pair_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Coerces a legacy coordinate value — a 2-element array, or a mapping with
/// numeric `x`/`y` keys — into an `(x, y)` pair. Returns `None` for anything
/// else (non-numeric components, wrong arity), matching §4.6's "null is
/// treated as no distance".
pub fn coerce_pair(v: &Bson) -> Option<(f64, f64)> {
    match v {
        Bson::Array(arr) if arr.len() == 2 => Some((as_f64(&arr[0])?, as_f64(&arr[1])?)),
        Bson::Document(doc) => Some((as_f64(doc.get("x")?)?, as_f64(doc.get("y")?)?)),
        _ => None,
    }
}

/// Extracts `(lng, lat)` from a GeoJSON `Point` value: `{type: "Point",
/// coordinates: [lng, lat]}`.
pub fn coerce_geojson_point(v: &Bson) -> Option<(f64, f64)> {
    let doc = v.as_document()?;
    if doc.get_str("type").ok()? != "Point" {
        return None;
    }
    let coords = doc.get_array("coordinates").ok()?;
    if coords.len() < 2 {
        return None;
    }
    Some((as_f64(&coords[0])?, as_f64(&coords[1])?))
}

pub fn geojson_type(v: &Bson) -> Option<&str> {
    v.as_document()?.get_str("type").ok()
}

/// Approximates "is `geometry` within `radius` meters of `center`" by
/// testing the geometry's centroid rather than its full boundary — true
/// geodesic polygon/circle intersection is an explicit non-goal. Supports
/// `Point`, `LineString`, and `Polygon` (outer ring only) GeoJSON values.
pub fn geometry_within_radius(geometry: &Document, center: (f64, f64), radius: f64) -> bool {
    let Some(centroid) = geometry_centroid(geometry) else {
        return false;
    };
    point_distance(center, centroid) <= radius
}

fn geometry_centroid(geometry: &Document) -> Option<(f64, f64)> {
    match geometry.get_str("type").ok()? {
        "Point" => {
            let coords = geometry.get_array("coordinates").ok()?;
            Some((as_f64(&coords[0])?, as_f64(&coords[1])?))
        }
        "LineString" => {
            let coords = geometry.get_array("coordinates").ok()?;
            average_points(coords)
        }
        "Polygon" => {
            let rings = geometry.get_array("coordinates").ok()?;
            let outer = rings.first()?.as_array()?;
            average_points(outer)
        }
        _ => None,
    }
}

fn average_points(coords: &[Bson]) -> Option<(f64, f64)> {
    if coords.is_empty() {
        return None;
    }
    let mut sum = (0.0, 0.0);
    let mut n = 0usize;
    for c in coords {
        let arr = c.as_array()?;
        if arr.len() < 2 {
            return None;
        }
        sum.0 += as_f64(&arr[0])?;
        sum.1 += as_f64(&arr[1])?;
        n += 1;
    }
    Some((sum.0 / n as f64, sum.1 / n as f64))
}
