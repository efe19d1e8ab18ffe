//! Clean, rebin and export photometric time series for periodicity searches.

pub mod averaging;
pub mod coords;
pub mod error;
pub mod quality;
pub mod read;
pub mod segments;
pub mod series;
pub mod stats;
pub mod synth;
pub mod target;
pub mod write;

use std::str::FromStr;

use hifitime::{Duration, Unit};

pub use error::PrepError;
pub use series::{BinGrid, TimeSeries};
pub use target::{PrepareParams, Target};

/// The unit of a light curve's time column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    fn hifitime_unit(self) -> Unit {
        match self {
            TimeUnit::Day => Unit::Day,
            TimeUnit::Hour => Unit::Hour,
            TimeUnit::Minute => Unit::Minute,
            TimeUnit::Second => Unit::Second,
        }
    }

    /// Convert a span measured in this unit to a [`Duration`].
    pub fn to_duration(self, value: f64) -> Duration {
        self.hifitime_unit() * value
    }

    /// Express `duration` in this unit.
    pub fn value_of(self, duration: Duration) -> f64 {
        duration.to_unit(self.hifitime_unit())
    }

    /// Convert a span measured in this unit to days.
    pub fn to_days(self, value: f64) -> f64 {
        self.to_duration(value).to_unit(Unit::Day)
    }
}

impl FromStr for TimeUnit {
    type Err = error::IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" | "days" => Ok(TimeUnit::Day),
            "h" | "hr" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "min" | "minute" | "minutes" => Ok(TimeUnit::Minute),
            "s" | "sec" | "second" | "seconds" => Ok(TimeUnit::Second),
            _ => Err(error::IngestionError::UnknownTimeUnit(s.to_string())),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeUnit::Day => "d",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "min",
            TimeUnit::Second => "s",
        };
        write!(f, "{s}")
    }
}

/// Who and where a light curve is of. This is set once when the raw data are
/// ingested and doesn't change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMetadata {
    /// The target identifier (e.g. a TIC ID). Also used as the default output
    /// file name.
    pub id: String,

    /// The target's right ascension \[degrees\].
    pub ra_deg: f64,

    /// The target's declination \[degrees\].
    pub dec_deg: f64,

    /// The unit of every time value in the series.
    pub time_unit: TimeUnit,

    /// The nominal exposure duration of each raw cadence, in `time_unit`.
    /// This is what the instrument reported, not necessarily the width of
    /// bins after rebinning.
    pub exposure_time: f64,

    /// The Julian date that time 0 corresponds to, if known. For TESS data
    /// this is `BJDREFI + BJDREFF` (2457000), i.e. times are BTJD.
    pub time_reference_jd: Option<f64>,
}

impl TargetMetadata {
    /// The right ascension as `hh:mm:ss.ssss`.
    pub fn ra_hms(&self) -> String {
        coords::ra_to_hms(self.ra_deg)
    }

    /// The declination as `±dd:mm:ss.ssss`.
    pub fn dec_dms(&self) -> String {
        coords::dec_to_dms(self.dec_deg)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn time_units() {
        assert_eq!("d".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert_eq!(" Days ".parse::<TimeUnit>().unwrap(), TimeUnit::Day);
        assert_eq!("s".parse::<TimeUnit>().unwrap(), TimeUnit::Second);
        assert!("fortnight".parse::<TimeUnit>().is_err());

        assert_abs_diff_eq!(TimeUnit::Day.to_duration(2.0 / 1440.0).to_seconds(), 120.0, epsilon = 1e-6);
        assert_abs_diff_eq!(TimeUnit::Hour.to_days(36.0), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(TimeUnit::Second.to_duration(90.0).to_seconds(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            TimeUnit::Day.value_of(Duration::from_seconds(120.0)),
            2.0 / 1440.0,
            epsilon = 1e-12
        );
    }
}
