use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::error::RouteError;
use crate::models::{Coordinate, ElevationSample};
use crate::routing::haversine_km;

const CREATOR: &str = "runroute";

/// Writes `path` as a single-track GPX 1.1 document and returns it base64
/// encoded.
///
/// Track points get an elevation interpolated from `samples` by distance along
/// the route; points outside the sampled range are written without one.
pub fn encode_route_as_gpx(
    name: &str,
    path: &[Coordinate],
    samples: &[ElevationSample],
) -> Result<String, RouteError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(name.to_string()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    let mut distance_km = 0.0;
    for (i, coord) in path.iter().enumerate() {
        if i > 0 {
            distance_km += haversine_km(path[i - 1], *coord);
        }
        let mut waypoint = to_waypoint(coord);
        waypoint.elevation = elevation_at_distance(samples, distance_km);
        segment.points.push(waypoint);
    }
    track.segments.push(segment);
    gpx.tracks.push(track);

    let mut buffer = Vec::new();
    gpx::write(&gpx, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}

// Samples are ordered by distance.
fn elevation_at_distance(samples: &[ElevationSample], distance_km: f64) -> Option<f64> {
    const EPS_KM: f64 = 1e-6;

    let first = samples.first()?;
    let last = samples.last()?;
    if distance_km < first.distance_km - EPS_KM || distance_km > last.distance_km + EPS_KM {
        return None;
    }

    let idx = samples.partition_point(|s| s.distance_km < distance_km);
    if idx == 0 {
        return Some(first.elevation_m);
    }
    let Some(after) = samples.get(idx) else {
        return Some(last.elevation_m);
    };
    let before = &samples[idx - 1];
    let span = after.distance_km - before.distance_km;
    if span <= 0.0 {
        return Some(before.elevation_m);
    }
    let t = (distance_km - before.distance_km) / span;
    Some(before.elevation_m + (after.elevation_m - before.elevation_m) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(encoded: &str) -> Gpx {
        let bytes = BASE64.decode(encoded).unwrap();
        gpx::read(bytes.as_slice()).unwrap()
    }

    fn sample(distance_km: f64, elevation_m: f64) -> ElevationSample {
        ElevationSample {
            distance_km,
            elevation_m,
            coordinate: Coordinate::new(0.0, 0.0),
        }
    }

    #[test]
    fn writes_single_named_track() {
        let path = [Coordinate::new(45.0, 5.0), Coordinate::new(45.001, 5.001)];
        let gpx = decode(&encode_route_as_gpx("Morning loop", &path, &[]).unwrap());

        assert_eq!(gpx.creator.as_deref(), Some(CREATOR));
        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].name.as_deref(), Some("Morning loop"));

        let points = &gpx.tracks[0].segments[0].points;
        assert_eq!(points.len(), 2);
        assert!((points[1].point().y() - 45.001).abs() < 1e-9);
        assert!((points[1].point().x() - 5.001).abs() < 1e-9);
        assert!(points.iter().all(|p| p.elevation.is_none()));
    }

    #[test]
    fn attaches_elevation_from_samples() {
        let path = [Coordinate::new(45.0, 5.0), Coordinate::new(45.0, 5.01)];
        let length_km = haversine_km(path[0], path[1]);
        let samples = [sample(0.0, 100.0), sample(length_km, 140.0)];

        let gpx = decode(&encode_route_as_gpx("ridge", &path, &samples).unwrap());
        let points = &gpx.tracks[0].segments[0].points;
        assert_eq!(points[0].elevation, Some(100.0));
        assert!((points[1].elevation.unwrap() - 140.0).abs() < 1e-6);
    }

    #[test]
    fn interpolates_between_samples() {
        let samples = [sample(0.0, 0.0), sample(1.0, 50.0), sample(2.0, 50.0)];
        assert_eq!(elevation_at_distance(&samples, 0.5), Some(25.0));
        assert_eq!(elevation_at_distance(&samples, 1.5), Some(50.0));
        assert_eq!(elevation_at_distance(&samples, 3.0), None);
        assert_eq!(elevation_at_distance(&[], 0.0), None);
    }

    #[test]
    fn empty_path_is_still_a_document() {
        let gpx = decode(&encode_route_as_gpx("empty", &[], &[]).unwrap());
        assert!(gpx.tracks[0].segments[0].points.is_empty());
    }
}
