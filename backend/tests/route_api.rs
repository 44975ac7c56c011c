use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::Request,
};
use hyper::StatusCode;
use runroute::{
    create_router,
    dem::DemGrid,
    directions::{DirectionsError, DirectionsProvider},
    models::{
        ApiError, Coordinate, DirectionsResponse, DirectionsRoute, RouteResponse, ShareLink,
        SharedRoute, StoredRoute,
    },
    planner::PlannerSettings,
    routing::approximate_distance_km,
    stitching::StitchConfig,
    storage::{LocalRouteStore, StoreBackend},
    AppState,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

const SLOPED_GRID: &str = "ncols 3
nrows 3
xllcorner 5.0
yllcorner 45.0
cellsize 0.01
NODATA_value -9999
200 200 200
100 100 100
0 0 0
";

/// Straight lines between the requested waypoints, or a provider outage.
struct FakeDirections {
    fail: bool,
}

impl DirectionsProvider for FakeDirections {
    async fn directions(
        &self,
        waypoints: &[Coordinate],
    ) -> Result<DirectionsResponse, DirectionsError> {
        if self.fail {
            return Err(DirectionsError::Status {
                status: 503,
                message: "provider down".into(),
            });
        }
        let distance_m = approximate_distance_km(waypoints) * 1000.0;
        Ok(DirectionsResponse {
            routes: vec![DirectionsRoute {
                distance_m,
                duration_s: distance_m / 1.4,
                geometry: waypoints.iter().map(|c| c.to_lng_lat()).collect(),
            }],
        })
    }
}

struct TestApp {
    router: axum::Router,
    _dir: tempfile::TempDir,
}

fn test_app_with(fail: bool, quota_bytes: Option<u64>) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalRouteStore::new(dir.path().join("routes.json"), quota_bytes);
    let grid = DemGrid::from_reader(SLOPED_GRID.as_bytes()).expect("grid");

    let state = AppState {
        directions: Arc::new(FakeDirections { fail }),
        terrain: Arc::new(grid),
        store: Arc::new(StoreBackend::Local(store)),
        planner: Arc::new(PlannerSettings {
            stitch: StitchConfig {
                request_delay: Duration::ZERO,
                ..Default::default()
            },
            ..Default::default()
        }),
        public_url: Arc::new(Url::parse("https://run.example/").unwrap()),
    };
    TestApp {
        router: create_router(state),
        _dir: dir,
    }
}

fn test_app() -> TestApp {
    test_app_with(false, None)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, bytes)
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn route_endpoint_returns_full_route() {
    let app = test_app();
    let payload = json!({
        "waypoints": [{"lat": 45.0, "lon": 5.01}, {"lat": 45.02, "lon": 5.01}],
        "pace": "5:00"
    });

    let (status, bytes) = send(&app, json_request("POST", "/api/route", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let body: RouteResponse = parse(&bytes);
    assert!(body.distance_km > 2.0);
    assert!(!body.gpx_base64.is_empty());
    assert!(!body.share.is_empty());
    assert_eq!(body.estimated_time.as_deref(), Some("11:07"));

    let profile = body.elevation_profile.expect("elevation profile");
    assert!(profile.samples.len() > 70);
    assert!(profile
        .samples
        .windows(2)
        .all(|w| w[1].distance_km >= w[0].distance_km));
    assert_eq!(body.steep_segments.len(), 1);
}

#[tokio::test]
async fn route_with_one_waypoint_is_rejected() {
    let app = test_app();
    let payload = json!({ "waypoints": [{"lat": 45.0, "lon": 5.0}] });

    let (status, bytes) = send(&app, json_request("POST", "/api/route", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: ApiError = parse(&bytes);
    assert!(body.message.contains("at least 2 waypoints"));
}

#[tokio::test]
async fn provider_outage_is_bad_gateway() {
    let app = test_app_with(true, None);
    let payload = json!({
        "waypoints": [{"lat": 45.0, "lon": 5.0}, {"lat": 45.01, "lon": 5.0}]
    });

    let (status, _) = send(&app, json_request("POST", "/api/route", payload)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn share_link_round_trip() {
    let app = test_app();
    let points = json!([{"lat": 59.9139, "lon": 10.7522}, {"lat": 60.3913, "lon": 5.3221}]);

    let (status, bytes) = send(
        &app,
        json_request("POST", "/api/share", json!({ "points": points })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let link: ShareLink = parse(&bytes);
    assert!(link.url.starts_with("https://run.example/?route="));

    let query = link.url.split_once('?').unwrap().1;
    let (status, bytes) = send(&app, empty_request("GET", &format!("/api/share?{query}"))).await;
    assert_eq!(status, StatusCode::OK);
    let shared: SharedRoute = parse(&bytes);
    assert_eq!(shared.points.len(), 2);
    assert!((shared.points[1].lat - 60.3913).abs() < 1e-5);
}

#[tokio::test]
async fn bad_share_parameter_means_no_route() {
    let app = test_app();
    for uri in ["/api/share", "/api/share?route=", "/api/share?route=%21%21%21"] {
        let (status, bytes) = send(&app, empty_request("GET", uri)).await;
        assert_eq!(status, StatusCode::OK);
        let shared: SharedRoute = parse(&bytes);
        assert!(shared.points.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn saved_route_lifecycle() {
    let app = test_app();
    let new_route = json!({
        "name": "Riverside",
        "points": [{"lat": 45.0, "lon": 5.0}, {"lat": 45.01, "lon": 5.0}]
    });

    let (status, bytes) = send(&app, json_request("POST", "/api/routes", new_route)).await;
    assert_eq!(status, StatusCode::CREATED);
    let saved: StoredRoute = parse(&bytes);
    assert!((saved.distance_km.unwrap() - 1.112).abs() < 0.01);

    let (status, bytes) = send(&app, empty_request("GET", "/api/routes")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<StoredRoute> = parse(&bytes);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);

    let uri = format!("/api/routes/{}", saved.id);
    let (status, bytes) = send(
        &app,
        json_request("PATCH", &uri, json!({ "name": "Riverside long" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: StoredRoute = parse(&bytes);
    assert_eq!(updated.name, "Riverside long");
    assert_eq!(updated.points, saved.points);

    let (status, bytes) = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse::<StoredRoute>(&bytes).name, "Riverside long");

    let (status, _) = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_single_point_route_is_rejected() {
    let app = test_app();
    let payload = json!({ "name": "dot", "points": [{"lat": 45.0, "lon": 5.0}] });

    let (status, _) = send(&app, json_request("POST", "/api/routes", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, bytes) = send(&app, empty_request("GET", "/api/routes")).await;
    assert!(parse::<Vec<StoredRoute>>(&bytes).is_empty());
}

#[tokio::test]
async fn quota_exceeded_asks_user_to_free_space() {
    let app = test_app_with(false, Some(64));
    let payload = json!({
        "name": "too big for the quota",
        "points": [{"lat": 45.0, "lon": 5.0}, {"lat": 45.01, "lon": 5.0}]
    });

    let (status, bytes) = send(&app, json_request("POST", "/api/routes", payload)).await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    let body: ApiError = parse(&bytes);
    assert!(body.message.contains("free up space"));
}

#[tokio::test]
async fn malformed_route_id_is_rejected() {
    let app = test_app();
    let (status, _) = send(&app, empty_request("GET", "/api/routes/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
