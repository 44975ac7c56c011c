use std::time::Duration;

use tokio::sync::watch;

use crate::models::{Coordinate, ElevationProfile, ElevationSample};
use crate::routing::{approximate_distance_km, PathCursor};

/// Distance between two elevation samples along a route.
pub const DEFAULT_SAMPLE_INTERVAL_M: f64 = 30.0;

/// Elevation lookups against terrain data that is already resident in memory.
///
/// Lookups never block or suspend. Before the backing data is loaded
/// `is_ready` is false and lookups report nothing.
pub trait TerrainOracle: Send + Sync {
    fn elevation_at(&self, coord: Coordinate) -> Option<f64>;

    fn is_ready(&self) -> bool {
        true
    }

    /// Channel flipping to `true` once terrain data becomes available.
    fn ready_signal(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}

/// Oracle used when no terrain source is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTerrain;

impl TerrainOracle for NoTerrain {
    fn elevation_at(&self, _coord: Coordinate) -> Option<f64> {
        None
    }

    fn is_ready(&self) -> bool {
        false
    }
}

/// Waits up to `timeout` for the oracle to signal readiness.
pub async fn await_terrain(oracle: &dyn TerrainOracle, timeout: Duration) -> bool {
    if oracle.is_ready() {
        return true;
    }
    let Some(mut ready) = oracle.ready_signal() else {
        return false;
    };
    let outcome = tokio::time::timeout(timeout, ready.wait_for(|loaded| *loaded)).await;
    matches!(outcome, Ok(Ok(_)))
}

/// Samples terrain every `interval_m` meters along `path`.
///
/// Targets are `i * interval_m` up to the route length, the last one clamped
/// to the end of the route. Points the oracle cannot answer are left out
/// rather than zero-filled. An oracle that is not ready yields no samples.
pub fn sample_elevation(
    path: &[Coordinate],
    oracle: &dyn TerrainOracle,
    interval_m: f64,
) -> Vec<ElevationSample> {
    if path.is_empty() || !oracle.is_ready() || interval_m.is_nan() || interval_m <= 0.0 {
        return Vec::new();
    }

    let total_m = approximate_distance_km(path) * 1000.0;
    let steps = (total_m / interval_m).ceil() as usize;

    let mut cursor = PathCursor::new(path);
    let mut samples = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let target_m = (i as f64 * interval_m).min(total_m);
        let Some(coordinate) = cursor.advance_to(target_m) else {
            continue;
        };
        if let Some(elevation_m) = oracle.elevation_at(coordinate) {
            samples.push(ElevationSample {
                distance_km: target_m / 1000.0,
                elevation_m,
                coordinate,
            });
        }
    }

    let skipped = steps + 1 - samples.len();
    if skipped > 0 {
        tracing::debug!("terrain had no elevation for {skipped} of {} samples", steps + 1);
    }
    samples
}

/// Summarises a sample list into min/max and cumulative climb.
pub fn build_profile(samples: Vec<ElevationSample>) -> ElevationProfile {
    let min_elevation = samples.iter().map(|s| s.elevation_m).reduce(f64::min);
    let max_elevation = samples.iter().map(|s| s.elevation_m).reduce(f64::max);

    let mut total_ascent = 0.0;
    let mut total_descent = 0.0;
    for window in samples.windows(2) {
        let diff = window[1].elevation_m - window[0].elevation_m;
        if diff > 0.0 {
            total_ascent += diff;
        } else {
            total_descent += diff.abs();
        }
    }

    ElevationProfile {
        samples,
        min_elevation,
        max_elevation,
        total_ascent,
        total_descent,
    }
}
