use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::models::{Coordinate, DirectionsResponse, DirectionsRoute};

/// Upper bound on waypoints accepted by a single directions request.
pub const MAX_WAYPOINTS_PER_REQUEST: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directions provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("directions request needs between 2 and {max} waypoints, got {count}")]
    WaypointCount { count: usize, max: usize },
}

/// Source of walking paths between waypoints.
///
/// Implementations must:
/// - accept between 2 and [`MAX_WAYPOINTS_PER_REQUEST`] waypoints
/// - return geometries in `[lon, lat]` order
/// - report an empty `routes` list when no path exists rather than erroring
pub trait DirectionsProvider: Send + Sync {
    fn directions(
        &self,
        waypoints: &[Coordinate],
    ) -> impl Future<Output = Result<DirectionsResponse, DirectionsError>> + Send;
}

#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    pub base_url: String,
    /// Provider routing profile, e.g. `mapbox/walking`.
    pub profile: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            profile: "mapbox/walking".to_string(),
            access_token: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Client for a Mapbox-compatible `directions/v5` HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDirections {
    client: Client,
    config: DirectionsConfig,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    distance: f64,
    duration: f64,
    geometry: ApiGeometry,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl HttpDirections {
    pub fn new(config: DirectionsConfig) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn request_url(&self, waypoints: &[Coordinate]) -> String {
        let coords = waypoints
            .iter()
            .map(|c| format!("{:.6},{:.6}", c.lon, c.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/directions/v5/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }
}

impl DirectionsProvider for HttpDirections {
    async fn directions(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<DirectionsResponse, DirectionsError> {
        if waypoints.len() < 2 || waypoints.len() > MAX_WAYPOINTS_PER_REQUEST {
            return Err(DirectionsError::WaypointCount {
                count: waypoints.len(),
                max: MAX_WAYPOINTS_PER_REQUEST,
            });
        }

        let url = self.request_url(waypoints);
        let mut query = vec![("geometries", "geojson"), ("overview", "full")];
        if let Some(token) = self.config.access_token.as_deref() {
            query.push(("access_token", token));
        }

        tracing::debug!("directions request with {} waypoints", waypoints.len());
        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectionsError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse = response.json().await?;
        Ok(DirectionsResponse {
            routes: body
                .routes
                .into_iter()
                .map(|route| DirectionsRoute {
                    distance_m: route.distance,
                    duration_s: route.duration,
                    geometry: route.geometry.coordinates,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_uses_lon_lat_order() {
        let directions = HttpDirections::new(DirectionsConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = directions.request_url(&[
            Coordinate::new(59.9139, 10.7522),
            Coordinate::new(59.92, 10.76),
        ]);
        assert_eq!(
            url,
            "http://localhost:9000/directions/v5/mapbox/walking/10.752200,59.913900;10.760000,59.920000"
        );
    }

    #[test]
    fn parses_provider_payload() {
        let payload = r#"{
            "code": "Ok",
            "routes": [{
                "distance": 1234.5,
                "duration": 900.0,
                "geometry": {"type": "LineString", "coordinates": [[5.0, 45.0], [5.01, 45.01]]}
            }]
        }"#;
        let parsed: ApiResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.routes.len(), 1);
        assert_eq!(parsed.routes[0].geometry.coordinates[1], [5.01, 45.01]);
    }

    #[tokio::test]
    async fn rejects_single_waypoint_without_network() {
        let directions = HttpDirections::new(DirectionsConfig::default()).unwrap();
        let err = directions
            .directions(&[Coordinate::new(45.0, 5.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, DirectionsError::WaypointCount { count: 1, .. }));
    }
}
