use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::directions::DirectionsProvider;
use crate::elevation::{
    DEFAULT_SAMPLE_INTERVAL_M, TerrainOracle, await_terrain, build_profile, sample_elevation,
};
use crate::error::RouteError;
use crate::gpx_export::encode_route_as_gpx;
use crate::models::{Coordinate, RouteRequest, RouteResponse};
use crate::pace::{Pace, format_duration};
use crate::share::compress_route;
use crate::slope::{SlopeConfig, find_steep_segments};
use crate::stitching::{StitchConfig, stitch_route};

const GPX_TRACK_NAME: &str = "runroute";

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub stitch: StitchConfig,
    pub sample_interval_m: f64,
    pub slope: SlopeConfig,
    /// How long a route computation waits for terrain that is still loading.
    pub terrain_wait: Duration,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            stitch: StitchConfig::default(),
            sample_interval_m: DEFAULT_SAMPLE_INTERVAL_M,
            slope: SlopeConfig::default(),
            terrain_wait: Duration::from_secs(2),
        }
    }
}

fn validate_waypoints(waypoints: &[Coordinate]) -> Result<(), RouteError> {
    if waypoints.len() < 2 {
        return Err(RouteError::TooFewWaypoints(waypoints.len()));
    }
    match waypoints.iter().position(|c| !c.is_valid()) {
        Some(index) => Err(RouteError::InvalidWaypoint { index }),
        None => Ok(()),
    }
}

/// Turns clicked waypoints into a full route: walking path, elevation profile,
/// steep stretches, pace estimate, share string and GPX export.
///
/// With `close_loop` set the first waypoint is appended again unless the
/// route already ends there.
pub async fn build_route<P: DirectionsProvider>(
    provider: &P,
    terrain: &dyn TerrainOracle,
    settings: &PlannerSettings,
    request: &RouteRequest,
) -> Result<RouteResponse, RouteError> {
    validate_waypoints(&request.waypoints)?;
    let pace = request
        .pace
        .as_deref()
        .map(Pace::parse)
        .transpose()?
        .unwrap_or_default();

    let mut waypoints = request.waypoints.clone();
    if request.close_loop && waypoints.first() != waypoints.last() {
        waypoints.push(waypoints[0]);
    }

    let stitched = stitch_route(provider, &waypoints, settings.stitch).await?;
    let distance_km = stitched.distance_m / 1000.0;

    if !await_terrain(terrain, settings.terrain_wait).await {
        tracing::warn!("terrain not available, returning route without elevation");
    }
    let samples = sample_elevation(&stitched.path, terrain, settings.sample_interval_m);
    let steep_segments = find_steep_segments(&samples, settings.slope);
    let gpx_base64 = encode_route_as_gpx(GPX_TRACK_NAME, &stitched.path, &samples)?;
    let elevation_profile = (!samples.is_empty()).then(|| build_profile(samples));

    tracing::info!(
        "planned route: {} waypoints, {:.2} km, {} steep segment(s)",
        waypoints.len(),
        distance_km,
        steep_segments.len()
    );

    Ok(RouteResponse {
        share: compress_route(&waypoints),
        estimated_time: (distance_km > 0.0)
            .then(|| format_duration(pace.estimated_duration(distance_km))),
        path: stitched.path,
        distance_km,
        duration_s: stitched.duration_s,
        elevation_profile,
        steep_segments,
        gpx_base64,
    })
}

pub type CurrentRoute = Option<Arc<RouteResponse>>;

/// Route computations for one planning session.
///
/// Every call to [`RoutePlanner::plan`] takes a new generation number. Only
/// the newest generation may publish: a computation that finishes after a
/// newer one started is discarded with [`RouteError::Superseded`]. The
/// current route is exposed as a `watch` value for rendering layers.
pub struct RoutePlanner<P> {
    provider: Arc<P>,
    terrain: Arc<dyn TerrainOracle>,
    settings: PlannerSettings,
    generation: AtomicU64,
    current: watch::Sender<CurrentRoute>,
}

impl<P: DirectionsProvider> RoutePlanner<P> {
    pub fn new(
        provider: Arc<P>,
        terrain: Arc<dyn TerrainOracle>,
        settings: PlannerSettings,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            provider,
            terrain,
            settings,
            generation: AtomicU64::new(0),
            current,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CurrentRoute> {
        self.current.subscribe()
    }

    pub fn current(&self) -> CurrentRoute {
        self.current.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn plan(&self, request: &RouteRequest) -> Result<Arc<RouteResponse>, RouteError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = build_route(
            self.provider.as_ref(),
            self.terrain.as_ref(),
            &self.settings,
            request,
        )
        .await;

        if self.generation() != generation {
            tracing::debug!("discarding route generation {generation}");
            return Err(RouteError::Superseded);
        }
        let route = Arc::new(result?);

        // The check is repeated under the channel lock so a newer generation
        // that started meanwhile still wins.
        let published = self.current.send_if_modified(|slot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *slot = Some(Arc::clone(&route));
            true
        });
        if published {
            Ok(route)
        } else {
            Err(RouteError::Superseded)
        }
    }

    /// Drops the current route and invalidates any computation in flight.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.current.send_replace(None);
    }
}
