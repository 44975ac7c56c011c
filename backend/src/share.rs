//! Compact, URL-safe encoding of waypoint lists for share links.
//!
//! Points are truncated to six decimal places (about 10 cm) and written with
//! the polyline algorithm at precision 6.

use geo_types::Coord;
use reqwest::Url;

use crate::models::Coordinate;

const PRECISION: u32 = 6;
const SCALE: f64 = 1e6;

/// Query parameter carrying an encoded route in share URLs.
pub const ROUTE_PARAM: &str = "route";

fn truncate(value: f64) -> f64 {
    (value * SCALE).trunc() / SCALE
}

/// Encodes `points` as a polyline string. Empty input gives an empty string,
/// and so do coordinates outside the valid lat/lon range.
pub fn compress_route(points: &[Coordinate]) -> String {
    if points.is_empty() {
        return String::new();
    }
    if let Some(index) = points.iter().position(|p| !p.is_valid()) {
        tracing::warn!("cannot encode route for sharing: point {index} is out of range");
        return String::new();
    }

    // polyline expects (x, y) = (lon, lat).
    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(|p| Coord {
            x: truncate(p.lon),
            y: truncate(p.lat),
        })
        .collect();

    polyline::encode_coordinates(coords, PRECISION).unwrap_or_else(|err| {
        tracing::warn!("cannot encode route for sharing: {err}");
        String::new()
    })
}

// Every byte of a polyline is in 63..=126; bytes below 95 end a value, and
// values come in lat/lon pairs.
fn is_well_formed(encoded: &str) -> bool {
    let bytes = encoded.as_bytes();
    let terminators = bytes.iter().filter(|&&b| b < 95).count();
    !bytes.is_empty()
        && bytes.iter().all(|b| (63..=126).contains(b))
        && bytes.last().is_some_and(|&b| b < 95)
        && terminators % 2 == 0
}

fn decode(encoded: &str) -> Option<Vec<Coordinate>> {
    if !is_well_formed(encoded) {
        return None;
    }
    let line = polyline::decode_polyline(encoded, PRECISION).ok()?;
    Some(line.coords().map(|c| Coordinate::new(c.y, c.x)).collect())
}

/// Best-effort decoding: empty or malformed input yields no points.
pub fn decompress_route(encoded: &str) -> Vec<Coordinate> {
    if encoded.is_empty() {
        return Vec::new();
    }
    match decode(encoded) {
        Some(points) if points.iter().all(|p| p.is_valid()) => points,
        _ => {
            tracing::debug!("ignoring undecodable route string ({} bytes)", encoded.len());
            Vec::new()
        }
    }
}

/// Tells a well-formed, non-empty polyline apart from empty or garbage input.
pub fn is_valid_polyline(encoded: &str) -> bool {
    decode(encoded).is_some_and(|points| !points.is_empty() && points.iter().all(|p| p.is_valid()))
}

/// Builds a share link by adding `route=<encoded>` to the query of `base`.
///
/// Existing query pairs and any fragment of `base` are kept.
pub fn share_url(base: &Url, points: &[Coordinate]) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(ROUTE_PARAM, &compress_route(points));
    url
}

/// Extracts the initial route from a share link.
///
/// A missing parameter or an undecodable value means "no initial route".
pub fn route_from_url(url: &Url) -> Vec<Coordinate> {
    url.query_pairs()
        .find(|(key, _)| key == ROUTE_PARAM)
        .map(|(_, encoded)| decompress_route(&encoded))
        .unwrap_or_default()
}
