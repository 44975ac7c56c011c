use std::sync::Arc;

use runroute::{
    config::{Config, StorageKind},
    create_router,
    directions::HttpDirections,
    elevation::{NoTerrain, TerrainOracle},
    storage::{Database, LocalRouteStore, StoreBackend},
    terrain::DeferredTerrain,
    AppState,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn open_store(storage: &StorageKind) -> Result<StoreBackend, Box<dyn std::error::Error>> {
    Ok(match storage {
        StorageKind::Local { path, quota_bytes } => {
            tracing::info!("saving routes to {}", path.display());
            StoreBackend::Local(LocalRouteStore::new(path.clone(), *quota_bytes))
        }
        StorageKind::Remote { database_url } => {
            let db = Database::connect(database_url).await?;
            db.migrate().await?;
            StoreBackend::Remote(db)
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runroute=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let terrain: Arc<dyn TerrainOracle> = match &config.dem_path {
        Some(path) => {
            tracing::info!("loading DEM from {} in the background", path.display());
            DeferredTerrain::spawn_load(path.clone())
        }
        None => {
            tracing::warn!("LOCAL_DEM_PATH not set; routes will have no elevation profile");
            Arc::new(NoTerrain)
        }
    };

    let store = open_store(&config.storage).await?;
    tracing::info!("route storage backend: {}", store.kind());

    let state = AppState {
        directions: Arc::new(HttpDirections::new(config.directions.clone())?),
        terrain,
        store: Arc::new(store),
        planner: Arc::new(config.planner.clone()),
        public_url: Arc::new(config.public_url.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state).layer(cors);

    tracing::info!("starting runroute on http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
