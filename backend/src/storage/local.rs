use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RouteStore, StorageError, route_distance_km, validate_points};
use crate::models::{NewRoute, RouteUpdate, StoredRoute};

/// Routes kept in a single JSON file on this machine.
///
/// A missing or corrupt file reads as an empty list. Any other read failure
/// is an error, and a mutation never overwrites a file it could not read.
/// Writes replace the file through a temporary sibling and a rename, so
/// readers never see a half-written document.
pub struct LocalRouteStore {
    path: PathBuf,
    quota_bytes: Option<u64>,
    lock: Mutex<()>,
}

impl LocalRouteStore {
    pub fn new(path: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Self {
        Self {
            path: path.into(),
            quota_bytes,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<StoredRoute>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                tracing::error!("cannot read {}: {err}", self.path.display());
                return Err(StorageError::Io(err));
            }
        };
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            tracing::warn!(
                "ignoring corrupt route file {}: {err}",
                self.path.display()
            );
            Vec::new()
        }))
    }

    async fn write_all(&self, routes: &[StoredRoute]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(routes)?;
        let needed = bytes.len() as u64;
        if let Some(limit) = self.quota_bytes {
            if needed > limit {
                tracing::warn!("route file would grow to {needed} bytes, quota is {limit}");
                return Err(StorageError::QuotaExceeded {
                    needed,
                    limit: Some(limit),
                });
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| storage_io_error(err, needed))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|err| storage_io_error(err, needed))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| storage_io_error(err, needed))?;
        Ok(())
    }
}

fn storage_io_error(err: io::Error, needed: u64) -> StorageError {
    if err.kind() == io::ErrorKind::StorageFull {
        StorageError::QuotaExceeded {
            needed,
            limit: None,
        }
    } else {
        StorageError::Io(err)
    }
}

impl RouteStore for LocalRouteStore {
    async fn save(&self, route: NewRoute) -> Result<StoredRoute, StorageError> {
        validate_points(&route.points)?;
        let _guard = self.lock.lock().await;

        let now = Utc::now();
        let stored = StoredRoute {
            id: Uuid::new_v4(),
            name: route.name,
            distance_km: route_distance_km(&route.points),
            points: route.points,
            created_at: now,
            updated_at: now,
        };

        let mut routes = self.read_all().await?;
        routes.push(stored.clone());
        self.write_all(&routes).await?;

        tracing::info!("route saved: {} ({})", stored.name, stored.id);
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredRoute>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|r| r.id == id))
    }

    async fn update(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> Result<Option<StoredRoute>, StorageError> {
        if let Some(points) = &update.points {
            validate_points(points)?;
        }
        let _guard = self.lock.lock().await;

        let mut routes = self.read_all().await?;
        let Some(route) = routes.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            route.name = name;
        }
        if let Some(points) = update.points {
            route.distance_km = route_distance_km(&points);
            route.points = points;
        }
        route.updated_at = Utc::now();
        let updated = route.clone();

        self.write_all(&routes).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;

        let mut routes = self.read_all().await?;
        let before = routes.len();
        routes.retain(|r| r.id != id);
        if routes.len() == before {
            return Ok(false);
        }

        self.write_all(&routes).await?;
        tracing::info!("route deleted: {id}");
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<StoredRoute>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut routes = self.read_all().await?;
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }
}
