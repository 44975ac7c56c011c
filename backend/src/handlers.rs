use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::directions::DirectionsProvider;
use crate::error::RouteError;
use crate::models::{
    ApiError, NewRoute, RouteRequest, RouteResponse, RouteUpdate, ShareLink, ShareRequest,
    SharedRoute, StoredRoute,
};
use crate::planner::build_route;
use crate::share::{compress_route, decompress_route, share_url};
use crate::storage::{RouteStore, StorageError};
use crate::AppState;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.into(),
        }),
    )
}

fn route_error(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = if err.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else {
        match err {
            RouteError::Stitch(_) => StatusCode::BAD_GATEWAY,
            RouteError::Superseded => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    if status.is_server_error() {
        tracing::error!("route planning failed: {err}");
    }
    api_error(status, err.to_string())
}

fn storage_error(err: StorageError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        StorageError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
        StorageError::TooFewPoints(_) | StorageError::InvalidPoint { .. } => {
            StatusCode::BAD_REQUEST
        }
        StorageError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::Io(_) | StorageError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("route storage failed: {err}");
    }
    api_error(status, err.to_string())
}

fn not_found(id: Uuid) -> (StatusCode, Json<ApiError>) {
    api_error(StatusCode::NOT_FOUND, format!("Route with ID {id} not found"))
}

/// POST /api/route
pub async fn plan_route<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(req): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    build_route(
        state.directions.as_ref(),
        state.terrain.as_ref(),
        &state.planner,
        &req,
    )
    .await
    .map(Json)
    .map_err(route_error)
}

/// POST /api/share
pub async fn create_share_link<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<Json<ShareLink>> {
    if let Some(index) = req.points.iter().position(|p| !p.is_valid()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("point {index} is not a valid coordinate"),
        ));
    }
    Ok(Json(ShareLink {
        encoded: compress_route(&req.points),
        url: share_url(&state.public_url, &req.points).into(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    pub route: Option<String>,
}

/// GET /api/share?route=...
///
/// A missing or undecodable parameter yields an empty point list.
pub async fn open_share_link(Query(query): Query<ShareQuery>) -> Json<SharedRoute> {
    let points = query
        .route
        .as_deref()
        .map(decompress_route)
        .unwrap_or_default();
    Json(SharedRoute { points })
}

/// GET /api/routes
pub async fn list_routes<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
) -> ApiResult<Json<Vec<StoredRoute>>> {
    state.store.list().await.map(Json).map_err(storage_error)
}

/// POST /api/routes
pub async fn save_route<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(route): Json<NewRoute>,
) -> ApiResult<(StatusCode, Json<StoredRoute>)> {
    state
        .store
        .save(route)
        .await
        .map(|saved| (StatusCode::CREATED, Json(saved)))
        .map_err(storage_error)
}

/// GET /api/routes/:id
pub async fn get_route<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StoredRoute>> {
    state
        .store
        .get(id)
        .await
        .map_err(storage_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PATCH /api/routes/:id
pub async fn update_route<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(id): Path<Uuid>,
    Json(update): Json<RouteUpdate>,
) -> ApiResult<Json<StoredRoute>> {
    state
        .store
        .update(id, update)
        .await
        .map_err(storage_error)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/routes/:id
pub async fn delete_route<P: DirectionsProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    match state.store.delete(id).await.map_err(storage_error)? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(not_found(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitching::StitchError;

    #[test]
    fn route_errors_map_to_status() {
        assert_eq!(route_error(RouteError::TooFewWaypoints(1)).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            route_error(RouteError::Stitch(StitchError::NoRoute { chunk: 0 })).0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            route_error(RouteError::Stitch(StitchError::TooFewWaypoints(0))).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(route_error(RouteError::Superseded).0, StatusCode::CONFLICT);
    }

    #[test]
    fn storage_errors_map_to_status() {
        let (status, Json(body)) = storage_error(StorageError::QuotaExceeded {
            needed: 10,
            limit: Some(5),
        });
        assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
        assert!(body.message.contains("free up space"));

        assert_eq!(storage_error(StorageError::TooFewPoints(1)).0, StatusCode::BAD_REQUEST);
        assert_eq!(
            storage_error(StorageError::Database(sqlx::Error::PoolTimedOut)).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
