use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid pace {0:?}, expected minutes:seconds per km such as 5:30")]
pub struct PaceParseError(pub String);

/// Running pace, in seconds per kilometre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pace {
    secs_per_km: u32,
}

impl Default for Pace {
    fn default() -> Self {
        Self { secs_per_km: 6 * 60 }
    }
}

impl Pace {
    pub fn from_secs_per_km(secs_per_km: u32) -> Option<Self> {
        (secs_per_km > 0).then_some(Self { secs_per_km })
    }

    pub fn secs_per_km(&self) -> u32 {
        self.secs_per_km
    }

    /// Parses `m:ss` (e.g. `5:30`). Seconds must be below 60 and the pace
    /// must be positive.
    pub fn parse(input: &str) -> Result<Self, PaceParseError> {
        let err = || PaceParseError(input.to_string());
        let (minutes, seconds) = input.trim().split_once(':').ok_or_else(err)?;
        let minutes: u32 = minutes.parse().map_err(|_| err())?;
        if seconds.len() != 2 {
            return Err(err());
        }
        let seconds: u32 = seconds.parse().map_err(|_| err())?;
        if seconds >= 60 {
            return Err(err());
        }
        Self::from_secs_per_km(minutes * 60 + seconds).ok_or_else(err)
    }

    pub fn estimated_duration(&self, distance_km: f64) -> Duration {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(distance_km * f64::from(self.secs_per_km))
    }
}

impl FromStr for Pace {
    type Err = PaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.secs_per_km / 60, self.secs_per_km % 60)
    }
}

/// `h:mm:ss` from one hour upwards, `m:ss` below. Rounded to whole seconds.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64().round() as u64;
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(Pace::parse("5:30").unwrap().secs_per_km(), 330);
        assert_eq!(Pace::parse(" 12:05 ").unwrap().secs_per_km(), 725);
        assert_eq!("4:00".parse::<Pace>().unwrap().to_string(), "4:00");
    }

    #[test]
    fn rejects_malformed_pace() {
        for input in ["", "5", "5:3", "5:60", "0:00", "a:30", "5:-1", "-5:30"] {
            assert!(Pace::parse(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn default_is_six_minutes() {
        assert_eq!(Pace::default().to_string(), "6:00");
    }

    #[test]
    fn duration_for_distance() {
        let pace = Pace::parse("5:00").unwrap();
        assert_eq!(pace.estimated_duration(10.0), Duration::from_secs(3000));
        assert_eq!(pace.estimated_duration(0.0), Duration::ZERO);
        assert_eq!(pace.estimated_duration(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(3000)), "50:00");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
        assert_eq!(format_duration(Duration::from_millis(59_600)), "1:00");
    }
}
