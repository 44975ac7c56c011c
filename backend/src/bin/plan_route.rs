use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::Parser;
use reqwest::Url;
use runroute::config::Config;
use runroute::dem::DemGrid;
use runroute::directions::HttpDirections;
use runroute::elevation::{NoTerrain, TerrainOracle};
use runroute::models::RouteRequest;
use runroute::planner::RoutePlanner;
use runroute::share::route_from_url;
use runroute::slope::slope_color;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a running route from a share link and print its statistics"
)]
struct Args {
    /// Share URL carrying `route=<encoded waypoints>` in its query
    link: Url,

    /// Return to the first waypoint at the end
    #[arg(long)]
    close_loop: bool,

    /// Target pace per km, e.g. 5:30
    #[arg(long)]
    pace: Option<String>,

    /// ESRI ASCII elevation grid covering the route (overrides LOCAL_DEM_PATH)
    #[arg(long)]
    dem: Option<PathBuf>,

    /// Write the route as GPX to this path
    #[arg(long)]
    gpx: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let waypoints = route_from_url(&args.link);
    if waypoints.is_empty() {
        return Err("link does not contain a valid route".into());
    }

    let terrain: Arc<dyn TerrainOracle> = match args.dem.or(config.dem_path) {
        Some(path) => Arc::new(DemGrid::from_path(&path)?),
        None => Arc::new(NoTerrain),
    };

    let planner = RoutePlanner::new(
        Arc::new(HttpDirections::new(config.directions)?),
        terrain,
        config.planner,
    );
    let route = planner
        .plan(&RouteRequest {
            waypoints,
            close_loop: args.close_loop,
            pace: args.pace,
        })
        .await?;

    println!("distance: {:.2} km", route.distance_km);
    if let Some(time) = &route.estimated_time {
        println!("estimated time: {time}");
    }
    if let Some(profile) = &route.elevation_profile {
        println!(
            "elevation: +{:.0} m / -{:.0} m",
            profile.total_ascent, profile.total_descent
        );
    }
    for segment in &route.steep_segments {
        println!(
            "steep: {:.2}-{:.2} km, avg {:.1}%, max {:.1}% {}",
            segment.start_distance_km,
            segment.end_distance_km,
            segment.average_slope,
            segment.max_slope,
            slope_color(segment.max_slope).unwrap_or_default()
        );
    }

    if let Some(path) = args.gpx {
        std::fs::write(&path, BASE64.decode(&route.gpx_base64)?)?;
        tracing::info!("GPX written to {}", path.display());
    }
    Ok(())
}
