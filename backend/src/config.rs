//! Service configuration from environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::directions::{DirectionsConfig, MAX_WAYPOINTS_PER_REQUEST};
use crate::elevation::DEFAULT_SAMPLE_INTERVAL_M;
use crate::planner::PlannerSettings;
use crate::slope::SlopeConfig;
use crate::stitching::StitchConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must be set when ROUTE_STORAGE=remote")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Local { path: PathBuf, quota_bytes: Option<u64> },
    Remote { database_url: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub directions: DirectionsConfig,
    pub planner: PlannerSettings,
    pub dem_path: Option<PathBuf>,
    pub storage: StorageKind,
    /// Base URL share links point at.
    pub public_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);
        let var = |key: &str| vars.get(key);

        let addr = vars
            .parse("RUNROUTE_ADDR")?
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let defaults = DirectionsConfig::default();
        let directions = DirectionsConfig {
            base_url: var("DIRECTIONS_URL").unwrap_or(defaults.base_url),
            profile: var("DIRECTIONS_PROFILE").unwrap_or(defaults.profile),
            access_token: var("DIRECTIONS_TOKEN"),
            ..defaults
        };

        let max_waypoints: usize = vars
            .parse("DIRECTIONS_MAX_WAYPOINTS")?
            .unwrap_or(MAX_WAYPOINTS_PER_REQUEST);
        if !(2..=MAX_WAYPOINTS_PER_REQUEST).contains(&max_waypoints) {
            return Err(ConfigError::Invalid {
                var: "DIRECTIONS_MAX_WAYPOINTS",
                value: max_waypoints.to_string(),
            });
        }
        let stitch_defaults = StitchConfig::default();
        let stitch = StitchConfig {
            max_waypoints,
            request_delay: vars
                .parse("DIRECTIONS_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(stitch_defaults.request_delay),
        };

        let sample_interval_m: f64 = vars
            .parse("ELEVATION_INTERVAL_M")?
            .unwrap_or(DEFAULT_SAMPLE_INTERVAL_M);
        if !sample_interval_m.is_finite() || sample_interval_m <= 0.0 {
            return Err(ConfigError::Invalid {
                var: "ELEVATION_INTERVAL_M",
                value: sample_interval_m.to_string(),
            });
        }
        let planner_defaults = PlannerSettings::default();
        let planner = PlannerSettings {
            stitch,
            sample_interval_m,
            slope: SlopeConfig::default(),
            terrain_wait: vars
                .parse("TERRAIN_WAIT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(planner_defaults.terrain_wait),
        };

        let storage = match var("ROUTE_STORAGE").as_deref() {
            None | Some("local") => StorageKind::Local {
                path: var("ROUTES_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/routes.json")),
                quota_bytes: vars.parse("ROUTES_QUOTA_BYTES")?,
            },
            Some("remote") => StorageKind::Remote {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "ROUTE_STORAGE",
                    value: other.to_string(),
                });
            }
        };

        let public_url = match vars.parse::<Url>("PUBLIC_URL")? {
            Some(url) => url,
            None => {
                let fallback = format!("http://localhost:{}/", addr.port());
                Url::parse(&fallback).map_err(|_| ConfigError::Invalid {
                    var: "PUBLIC_URL",
                    value: fallback,
                })?
            }
        };

        Ok(Self {
            addr,
            directions,
            planner,
            dem_path: var("LOCAL_DEM_PATH").map(PathBuf::from),
            storage,
            public_url,
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Unset and blank variables both read as absent.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, var: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(var)
            .map(|value| {
                value.trim().parse().map_err(|_| ConfigError::Invalid { var, value })
            })
            .transpose()
    }
}
