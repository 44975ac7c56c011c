use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Segments shorter than this (in meters) are treated as a single point.
const MIN_SEGMENT_M: f64 = 1e-6;

/// Great-circle distance in kilometres (Haversine).
///
/// NaN components propagate to a NaN result; callers at the API boundary
/// reject non-finite coordinates before reaching the geometry code.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn approximate_distance_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Returns the point lying `target_m` meters along `path`.
///
/// Targets at or below zero clamp to the first point, targets past the end
/// clamp to the last one. `None` only for an empty path.
pub fn interpolate_at_distance(path: &[Coordinate], target_m: f64) -> Option<Coordinate> {
    PathCursor::new(path).advance_to(target_m)
}

/// Interpolates along `path` for a series of non-decreasing target distances,
/// walking each segment at most once.
pub struct PathCursor<'a> {
    path: &'a [Coordinate],
    segment: usize,
    walked_m: f64,
}

impl<'a> PathCursor<'a> {
    pub fn new(path: &'a [Coordinate]) -> Self {
        Self {
            path,
            segment: 0,
            walked_m: 0.0,
        }
    }

    /// Same result as [`interpolate_at_distance`] as long as targets never
    /// decrease between calls.
    pub fn advance_to(&mut self, target_m: f64) -> Option<Coordinate> {
        let first = *self.path.first()?;
        if target_m <= 0.0 {
            return Some(first);
        }

        while let Some(w) = self.path.get(self.segment..self.segment + 2) {
            let (start, end) = (w[0], w[1]);
            let segment_m = haversine_km(start, end) * 1000.0;

            if self.walked_m + segment_m >= target_m {
                if segment_m < MIN_SEGMENT_M {
                    return Some(start);
                }
                let t = (target_m - self.walked_m) / segment_m;
                return Some(start.interpolate(end, t));
            }
            self.walked_m += segment_m;
            self.segment += 1;
        }

        self.path.last().copied()
    }
}
