// Postgres-backed account store for saved routes.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use super::{RouteStore, StorageError, route_distance_km, validate_points};
use crate::models::{Coordinate, NewRoute, RouteUpdate, StoredRoute};

/// Row as stored in `stored_routes`; `points` is JSONB.
#[derive(Debug, FromRow)]
struct RouteRow {
    id: Uuid,
    name: String,
    points: serde_json::Value,
    distance_km: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RouteRow {
    fn into_stored(self) -> Result<StoredRoute, serde_json::Error> {
        let points: Vec<Coordinate> = serde_json::from_value(self.points)?;
        Ok(StoredRoute {
            id: self.id,
            name: self.name,
            points,
            created_at: self.created_at,
            updated_at: self.updated_at,
            distance_km: self.distance_km,
        })
    }
}

// Rows whose points no longer decode are skipped on list rather than failing
// the whole request.
fn decode_rows(rows: Vec<RouteRow>) -> Vec<StoredRoute> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            row.into_stored()
                .map_err(|err| tracing::warn!("skipping corrupt route {id}: {err}"))
                .ok()
        })
        .collect()
}

/// Database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the routes table if needed.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        // query() cannot run several statements; raw_sql can.
        let migration_sql = include_str!("../../migrations/20250601_create_stored_routes.sql");
        let mut conn = self.pool.acquire().await?;
        sqlx::raw_sql(migration_sql).execute(&mut *conn).await?;

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

impl RouteStore for Database {
    async fn save(&self, route: NewRoute) -> Result<StoredRoute, StorageError> {
        validate_points(&route.points)?;
        let points = serde_json::to_value(&route.points)?;
        let now = Utc::now();

        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            INSERT INTO stored_routes (id, name, points, distance_km, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&route.name)
        .bind(points)
        .bind(route_distance_km(&route.points))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let stored = row.into_stored()?;
        tracing::info!("route saved: {} ({})", stored.name, stored.id);
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredRoute>, StorageError> {
        let row = sqlx::query_as::<_, RouteRow>("SELECT * FROM stored_routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.into_stored()?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> Result<Option<StoredRoute>, StorageError> {
        let distance_km = update.points.as_deref().and_then(route_distance_km);
        let points = match &update.points {
            Some(points) => {
                validate_points(points)?;
                Some(serde_json::to_value(points)?)
            }
            None => None,
        };

        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            UPDATE stored_routes
            SET name = COALESCE($2, name),
                points = COALESCE($3, points),
                distance_km = COALESCE($4, distance_km),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(points)
        .bind(distance_km)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into_stored()?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM stored_routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("route deleted: {id}");
        }
        Ok(deleted)
    }

    async fn list(&self) -> Result<Vec<StoredRoute>, StorageError> {
        let rows = sqlx::query_as::<_, RouteRow>(
            "SELECT * FROM stored_routes ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let routes = decode_rows(rows);
        tracing::debug!("retrieved {} routes", routes.len());
        Ok(routes)
    }
}
