use std::time::Duration;

use crate::directions::{DirectionsError, DirectionsProvider, MAX_WAYPOINTS_PER_REQUEST};
use crate::models::{Coordinate, DirectionsRoute, StitchedRoute};

#[derive(Debug, Clone, Copy)]
pub struct StitchConfig {
    pub max_waypoints: usize,
    /// Pause between consecutive chunk requests, to stay under provider rate limits.
    pub request_delay: Duration,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            max_waypoints: MAX_WAYPOINTS_PER_REQUEST,
            request_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    #[error("a route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("directions request for chunk {chunk} failed: {source}")]
    Directions {
        chunk: usize,
        #[source]
        source: DirectionsError,
    },
    #[error("directions provider found no route for chunk {chunk}")]
    NoRoute { chunk: usize },
}

/// Splits `points` into chunks of at most `max` points.
///
/// Each chunk after the first starts at the last point of the previous one, so
/// the fetched segments meet end to end.
pub fn chunk_waypoints(points: &[Coordinate], max: usize) -> Vec<&[Coordinate]> {
    let max = max.max(2);
    if points.len() < 2 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(points.len() / (max - 1) + 1);
    let mut start = 0;
    while start < points.len() - 1 {
        let end = (start + max).min(points.len());
        chunks.push(&points[start..end]);
        start = end - 1;
    }
    chunks
}

/// Concatenates per-chunk routes into one path.
///
/// The first coordinate of every segment after the first repeats the previous
/// segment's last coordinate and is dropped.
pub fn merge_segments(segments: &[DirectionsRoute]) -> StitchedRoute {
    let mut stitched = StitchedRoute::default();
    for (idx, segment) in segments.iter().enumerate() {
        let coords = segment.coordinates();
        if idx == 0 {
            stitched.path.extend(coords);
        } else {
            stitched.path.extend(coords.into_iter().skip(1));
        }
        stitched.distance_m += segment.distance_m;
        stitched.duration_s += segment.duration_s;
    }
    stitched
}

/// Fetches a walking path through every waypoint, splitting the request when
/// it exceeds the provider's waypoint limit.
///
/// Chunks are fetched one at a time with `config.request_delay` between
/// requests. Any failed or empty chunk aborts the whole route: no retry and no
/// partial result.
pub async fn stitch_route<P: DirectionsProvider>(
    provider: &P,
    waypoints: &[Coordinate],
    config: StitchConfig,
) -> Result<StitchedRoute, StitchError> {
    if waypoints.len() < 2 {
        return Err(StitchError::TooFewWaypoints(waypoints.len()));
    }

    let chunks = chunk_waypoints(waypoints, config.max_waypoints);
    tracing::debug!(
        "stitching {} waypoints in {} chunk(s)",
        waypoints.len(),
        chunks.len()
    );

    let mut segments = Vec::with_capacity(chunks.len());
    for (chunk, points) in chunks.into_iter().enumerate() {
        if chunk > 0 && !config.request_delay.is_zero() {
            tokio::time::sleep(config.request_delay).await;
        }

        let response = provider
            .directions(points)
            .await
            .map_err(|source| StitchError::Directions { chunk, source })?;
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(StitchError::NoRoute { chunk })?;

        tracing::debug!(
            "chunk {chunk}: {} coordinates, {:.0} m",
            route.geometry.len(),
            route.distance_m
        );
        segments.push(route);
    }

    Ok(merge_segments(&segments))
}
