pub use shared::{
    ApiError, Coordinate, ElevationProfile, ElevationSample, NewRoute, RouteRequest,
    RouteResponse, RouteUpdate, ShareLink, ShareRequest, SharedRoute, SteepSegment, StoredRoute,
};
use serde::{Deserialize, Serialize};

/// One alternative returned by the directions provider.
///
/// `geometry` is in `[lon, lat]` order, as received on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Vec<[f64; 2]>,
}

impl DirectionsRoute {
    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.geometry
            .iter()
            .copied()
            .map(Coordinate::from_lng_lat)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    pub routes: Vec<DirectionsRoute>,
}

/// A continuous path assembled from one or more directions responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchedRoute {
    pub path: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
}
