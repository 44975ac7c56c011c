use crate::models::{ElevationSample, SteepSegment};

pub const DEFAULT_STEEP_THRESHOLD_PCT: f64 = 6.0;
pub const DEFAULT_MIN_SEGMENT_KM: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeConfig {
    /// Uphill grade, in percent, at which an interval counts as steep.
    pub threshold_pct: f64,
    /// Shortest steep stretch worth reporting.
    pub min_length_km: f64,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_STEEP_THRESHOLD_PCT,
            min_length_km: DEFAULT_MIN_SEGMENT_KM,
        }
    }
}

/// Grade in percent between two samples. Samples at the same distance give 0.
pub fn calculate_slope(from: &ElevationSample, to: &ElevationSample) -> f64 {
    let run_m = (to.distance_km - from.distance_km) * 1000.0;
    if run_m == 0.0 {
        return 0.0;
    }
    (to.elevation_m - from.elevation_m) / run_m * 100.0
}

struct OpenSegment {
    start_km: f64,
    end_km: f64,
    slopes: Vec<f64>,
}

impl OpenSegment {
    fn close(self, min_length_km: f64) -> Option<SteepSegment> {
        let length = self.end_km - self.start_km;
        if length <= 0.0 || length < min_length_km {
            return None;
        }
        let average_slope = self.slopes.iter().sum::<f64>() / self.slopes.len() as f64;
        let max_slope = self.slopes.iter().copied().fold(f64::MIN, f64::max);
        Some(SteepSegment {
            start_distance_km: self.start_km,
            end_distance_km: self.end_km,
            average_slope,
            max_slope,
        })
    }
}

/// Groups consecutive uphill intervals at or above the threshold.
///
/// A flat or downhill interval ends the current run; a run still open after
/// the last sample is closed the same way. Runs shorter than
/// `config.min_length_km` are dropped.
pub fn find_steep_segments(samples: &[ElevationSample], config: SlopeConfig) -> Vec<SteepSegment> {
    let mut segments = Vec::new();
    let mut open: Option<OpenSegment> = None;

    for pair in samples.windows(2) {
        let slope = calculate_slope(&pair[0], &pair[1]);
        if slope > 0.0 && slope >= config.threshold_pct {
            let run = open.get_or_insert_with(|| OpenSegment {
                start_km: pair[0].distance_km,
                end_km: pair[0].distance_km,
                slopes: Vec::new(),
            });
            run.end_km = pair[1].distance_km;
            run.slopes.push(slope);
        } else if let Some(run) = open.take() {
            segments.extend(run.close(config.min_length_km));
        }
    }

    if let Some(run) = open {
        segments.extend(run.close(config.min_length_km));
    }
    segments
}

/// Map colour for a grade, or `None` below the steep threshold.
pub fn slope_color(slope: f64) -> Option<&'static str> {
    match slope {
        s if s >= 15.0 => Some("#dc2626"),
        s if s >= 10.0 => Some("#f97316"),
        s if s >= DEFAULT_STEEP_THRESHOLD_PCT => Some("#fbbf24"),
        _ => None,
    }
}

/// Overlay opacity on the same tiers as [`slope_color`].
pub fn slope_opacity(slope: f64) -> f64 {
    match slope {
        s if s >= 15.0 => 0.9,
        s if s >= 10.0 => 0.75,
        s if s >= DEFAULT_STEEP_THRESHOLD_PCT => 0.6,
        _ => 0.0,
    }
}
