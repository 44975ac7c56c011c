//! Terrain that becomes available some time after startup.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::dem::DemGrid;
use crate::elevation::TerrainOracle;
use crate::models::Coordinate;

/// A DEM grid loaded in the background.
///
/// Until the grid is resident every lookup is unavailable and `is_ready` is
/// false; subscribers of [`TerrainOracle::ready_signal`] are woken once it
/// loads. A failed load leaves the terrain permanently unready.
#[derive(Debug)]
pub struct DeferredTerrain {
    grid: OnceLock<DemGrid>,
    ready_tx: watch::Sender<bool>,
}

impl Default for DeferredTerrain {
    fn default() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            grid: OnceLock::new(),
            ready_tx,
        }
    }
}

impl DeferredTerrain {
    /// Installs a grid and wakes every waiter. Later calls are ignored.
    pub fn install(&self, grid: DemGrid) {
        if self.grid.set(grid).is_ok() {
            self.ready_tx.send_replace(true);
        }
    }

    /// Loads the ESRI ASCII grid at `path` on the blocking pool.
    pub fn spawn_load(path: PathBuf) -> Arc<Self> {
        let terrain = Arc::new(Self::default());
        let target = Arc::clone(&terrain);

        tokio::spawn(async move {
            let source = path.display().to_string();
            let loaded = tokio::task::spawn_blocking(move || DemGrid::from_path(&path)).await;
            match loaded {
                Ok(Ok(grid)) => {
                    tracing::info!("loaded DEM grid from {source}");
                    target.install(grid);
                }
                Ok(Err(err)) => tracing::error!("failed to load DEM from {source}: {err}"),
                Err(join_err) => {
                    tracing::error!("DEM loader task for {source} panicked: {join_err}")
                }
            }
        });

        terrain
    }
}

impl TerrainOracle for DeferredTerrain {
    fn elevation_at(&self, coord: Coordinate) -> Option<f64> {
        self.grid.get()?.elevation_at(coord)
    }

    fn is_ready(&self) -> bool {
        self.grid.get().is_some()
    }

    fn ready_signal(&self) -> Option<watch::Receiver<bool>> {
        Some(self.ready_tx.subscribe())
    }
}
