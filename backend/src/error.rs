use thiserror::Error;

use crate::pace::PaceParseError;
use crate::stitching::StitchError;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("route stitching failed: {0}")]
    Stitch(#[from] StitchError),
    #[error("a route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("waypoint {index} is not a valid coordinate")]
    InvalidWaypoint { index: usize },
    #[error(transparent)]
    InvalidPace(#[from] PaceParseError),
    #[error("route request was superseded by a newer one")]
    Superseded,
}

impl RouteError {
    /// Whether the caller sent something unusable, as opposed to an upstream
    /// or internal failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::TooFewWaypoints(_)
                | Self::InvalidWaypoint { .. }
                | Self::InvalidPace(_)
                | Self::Stitch(StitchError::TooFewWaypoints(_))
        )
    }
}
