pub mod config;
pub mod dem;
pub mod directions;
pub mod elevation;
pub mod error;
pub mod gpx_export;
pub mod handlers;
pub mod models;
pub mod pace;
pub mod planner;
pub mod routing;
pub mod share;
pub mod slope;
pub mod stitching;
pub mod storage;
pub mod terrain;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Url;

use crate::directions::DirectionsProvider;
use crate::elevation::TerrainOracle;
use crate::planner::PlannerSettings;
use crate::storage::StoreBackend;

pub struct AppState<P> {
    pub directions: Arc<P>,
    pub terrain: Arc<dyn TerrainOracle>,
    pub store: Arc<StoreBackend>,
    pub planner: Arc<PlannerSettings>,
    /// Base URL for share links.
    pub public_url: Arc<Url>,
}

// Manual impl so `P` need not be `Clone`.
impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            directions: Arc::clone(&self.directions),
            terrain: Arc::clone(&self.terrain),
            store: Arc::clone(&self.store),
            planner: Arc::clone(&self.planner),
            public_url: Arc::clone(&self.public_url),
        }
    }
}

pub fn create_router<P: DirectionsProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/api/route", post(handlers::plan_route::<P>))
        .route(
            "/api/share",
            post(handlers::create_share_link::<P>).get(handlers::open_share_link),
        )
        .route(
            "/api/routes",
            get(handlers::list_routes::<P>).post(handlers::save_route::<P>),
        )
        .route(
            "/api/routes/:id",
            get(handlers::get_route::<P>)
                .patch(handlers::update_route::<P>)
                .delete(handlers::delete_route::<P>),
        )
        .with_state(state)
}
