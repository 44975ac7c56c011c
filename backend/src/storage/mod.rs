//! Saved-route persistence.
//!
//! A session talks to exactly one backend, chosen from configuration at
//! startup: a JSON file on the local machine or the Postgres account store.

pub mod local;
pub mod remote;

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Coordinate, NewRoute, RouteUpdate, StoredRoute};
use crate::routing::approximate_distance_km;

pub use local::LocalRouteStore;
pub use remote::Database;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(
        "storage quota exceeded ({needed} bytes needed); free up space by deleting saved routes"
    )]
    QuotaExceeded { needed: u64, limit: Option<u64> },
    #[error("a saved route needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("point {index} is not a valid coordinate")]
    InvalidPoint { index: usize },
    #[error("route file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize routes: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Save, fetch, update, delete and list named routes.
///
/// Implementations reject point lists shorter than two points or containing
/// invalid coordinates, on save and on update.
///
/// `update` and `delete` report an unknown id through their return value
/// (`None` / `false`) rather than an error.
pub trait RouteStore: Send + Sync {
    fn save(
        &self,
        route: NewRoute,
    ) -> impl Future<Output = Result<StoredRoute, StorageError>> + Send;

    fn get(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<StoredRoute>, StorageError>> + Send;

    fn update(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> impl Future<Output = Result<Option<StoredRoute>, StorageError>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// All routes, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<StoredRoute>, StorageError>> + Send;
}

pub(crate) fn validate_points(points: &[Coordinate]) -> Result<(), StorageError> {
    if points.len() < 2 {
        return Err(StorageError::TooFewPoints(points.len()));
    }
    match points.iter().position(|p| !p.is_valid()) {
        Some(index) => Err(StorageError::InvalidPoint { index }),
        None => Ok(()),
    }
}

pub(crate) fn route_distance_km(points: &[Coordinate]) -> Option<f64> {
    (points.len() >= 2).then(|| approximate_distance_km(points))
}

/// The configured store for this process.
pub enum StoreBackend {
    Local(LocalRouteStore),
    Remote(Database),
}

impl StoreBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }
}

impl RouteStore for StoreBackend {
    async fn save(&self, route: NewRoute) -> Result<StoredRoute, StorageError> {
        match self {
            Self::Local(store) => store.save(route).await,
            Self::Remote(db) => db.save(route).await,
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredRoute>, StorageError> {
        match self {
            Self::Local(store) => store.get(id).await,
            Self::Remote(db) => db.get(id).await,
        }
    }

    async fn update(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> Result<Option<StoredRoute>, StorageError> {
        match self {
            Self::Local(store) => store.update(id, update).await,
            Self::Remote(db) => db.update(id, update).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        match self {
            Self::Local(store) => store.delete(id).await,
            Self::Remote(db) => db.delete(id).await,
        }
    }

    async fn list(&self) -> Result<Vec<StoredRoute>, StorageError> {
        match self {
            Self::Local(store) => store.list().await,
            Self::Remote(db) => db.list().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_or_invalid_point_lists() {
        assert!(matches!(validate_points(&[]), Err(StorageError::TooFewPoints(0))));
        assert!(matches!(
            validate_points(&[Coordinate::new(45.0, 5.0)]),
            Err(StorageError::TooFewPoints(1))
        ));
        assert!(matches!(
            validate_points(&[Coordinate::new(45.0, 5.0), Coordinate::new(95.0, 5.0)]),
            Err(StorageError::InvalidPoint { index: 1 })
        ));
        assert!(validate_points(&[Coordinate::new(45.0, 5.0), Coordinate::new(45.1, 5.0)]).is_ok());
    }

    #[test]
    fn distance_is_derived_from_points() {
        assert_eq!(route_distance_km(&[Coordinate::new(0.0, 0.0)]), None);
        let km =
            route_distance_km(&[Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)]).unwrap();
        assert!((km - 111.19).abs() < 0.01);
    }

    #[test]
    fn quota_message_tells_user_what_to_do() {
        let err = StorageError::QuotaExceeded {
            needed: 2048,
            limit: Some(1024),
        };
        assert!(err.to_string().contains("free up space"));
    }
}
