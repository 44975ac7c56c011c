use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-facing point in degrees. Serialized as `{ "lat": .., "lon": .. }`.
///
/// Directions providers and GeoJSON speak `[lon, lat]` pairs instead; use
/// [`Coordinate::from_lng_lat`] and [`Coordinate::to_lng_lat`] at that seam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a coordinate from a `[lon, lat]` pair.
    pub const fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lon: pair[0],
        }
    }

    /// Returns the `[lon, lat]` pair used on the directions wire format.
    pub const fn to_lng_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Serde adapter writing a [`Coordinate`] as a `[lon, lat]` array.
pub mod lng_lat {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Coordinate;

    pub fn serialize<S: Serializer>(coord: &Coordinate, serializer: S) -> Result<S::Ok, S::Error> {
        coord.to_lng_lat().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Coordinate, D::Error> {
        <[f64; 2]>::deserialize(deserializer).map(Coordinate::from_lng_lat)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub close_loop: bool,
    /// Target pace as `m:ss` per kilometre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub distance_km: f64,
    pub elevation_m: f64,
    #[serde(with = "lng_lat")]
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    pub samples: Vec<ElevationSample>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub total_ascent: f64,
    pub total_descent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteepSegment {
    pub start_distance_km: f64,
    pub end_distance_km: f64,
    pub average_slope: f64,
    pub max_slope: f64,
}

impl SteepSegment {
    pub fn length_km(&self) -> f64 {
        self.end_distance_km - self.start_distance_km
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub duration_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_profile: Option<ElevationProfile>,
    #[serde(default)]
    pub steep_segments: Vec<SteepSegment>,
    /// Encoded waypoints for the `route=` share parameter.
    pub share: String,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRoute {
    pub id: Uuid,
    pub name: String,
    pub points: Vec<Coordinate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoute {
    pub name: String,
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Coordinate>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub encoded: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedRoute {
    pub points: Vec<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
