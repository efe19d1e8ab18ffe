//! Quality-flag filtering and uncertainty trimming.
//!
//! TESS (and Kepler before it) attach a bitmask to every cadence describing
//! known instrumental anomalies. Only the lowest twelve bits have a documented
//! meaning for our purposes; any other bit is treated as untrustworthy.

use bitflags::bitflags;
use log::{debug, trace};

use crate::{
    error::{ParameterError, PrepError, StateError},
    series::TimeSeries,
};

/// The fraction of highest-uncertainty samples trimmed by default.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

bitflags! {
    /// The native quality flag vocabulary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QualityFlags: u32 {
        const ATTITUDE_TWEAK = 1;
        const SAFE_MODE = 1 << 1;
        const COARSE_POINT = 1 << 2;
        const EARTH_POINT = 1 << 3;
        const ARGABRIGHTENING = 1 << 4;
        const REACTION_WHEEL_DESATURATION = 1 << 5;
        const APERTURE_COSMIC = 1 << 6;
        const MANUAL_EXCLUDE = 1 << 7;
        const DISCONTINUITY = 1 << 8;
        const IMPULSIVE_OUTLIER = 1 << 9;
        const COLLATERAL_COSMIC = 1 << 10;
        const STRAYLIGHT = 1 << 11;
    }
}

/// Whether samples carrying a flag are kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagAction {
    Keep,
    Drop,
}

/// How a sample's flag value is compared against the disallowed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagMatching {
    /// Treat the value as a bitmask. A sample is dropped if any of its bits is
    /// disallowed or any of its bits is outside the native vocabulary, so e.g.
    /// `EARTH_POINT | REACTION_WHEEL_DESATURATION` (40) is dropped.
    #[default]
    BitTest,

    /// Compare whole values. A sample is dropped if its value equals a
    /// disallowed flag, or if the value is neither 0 nor a single native flag.
    /// Combined values are therefore always dropped as "unknown".
    ExactValue,
}

/// Which quality flags make a sample unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagPolicy {
    disallowed: QualityFlags,
    pub matching: FlagMatching,
}

impl Default for FlagPolicy {
    /// Drop spacecraft Earth-pointing, reaction wheel desaturations, manual
    /// exclusions and impulsive outliers removed before cotrending.
    fn default() -> Self {
        FlagPolicy {
            disallowed: QualityFlags::EARTH_POINT
                | QualityFlags::REACTION_WHEEL_DESATURATION
                | QualityFlags::MANUAL_EXCLUDE
                | QualityFlags::IMPULSIVE_OUTLIER,
            matching: FlagMatching::default(),
        }
    }
}

impl FlagPolicy {
    /// A policy that keeps every native flag. Unknown flag bits are still
    /// dropped.
    pub fn keep_all() -> Self {
        FlagPolicy {
            disallowed: QualityFlags::empty(),
            matching: FlagMatching::default(),
        }
    }

    pub fn set(&mut self, flags: QualityFlags, action: FlagAction) -> &mut Self {
        match action {
            FlagAction::Keep => self.disallowed.remove(flags),
            FlagAction::Drop => self.disallowed.insert(flags),
        }
        self
    }

    pub fn action(&self, flag: QualityFlags) -> FlagAction {
        if self.disallowed.intersects(flag) {
            FlagAction::Drop
        } else {
            FlagAction::Keep
        }
    }

    pub fn disallowed(&self) -> QualityFlags {
        self.disallowed
    }

    /// Should a sample carrying the raw flag value `value` be removed?
    pub fn rejects(&self, value: u32) -> bool {
        match self.matching {
            FlagMatching::BitTest => match QualityFlags::from_bits(value) {
                Some(flags) => flags.intersects(self.disallowed),
                None => true,
            },

            FlagMatching::ExactValue => {
                if value == 0 {
                    return false;
                }
                match QualityFlags::from_bits(value) {
                    Some(flag) if value.is_power_of_two() => self.disallowed.contains(flag),
                    _ => true,
                }
            }
        }
    }
}

/// Remove flagged samples, then the `tolerance` fraction of the remainder
/// with the largest flux uncertainties.
///
/// The number trimmed is `tolerance × N` rounded half to even, where `N` is
/// the number of samples surviving the flag cut. Among equal uncertainties the
/// earlier sample is trimmed first. The result is in time order.
pub fn filter(
    series: &TimeSeries,
    tolerance: f64,
    policy: &FlagPolicy,
) -> Result<TimeSeries, PrepError> {
    if !(0.0..=1.0).contains(&tolerance) {
        return Err(ParameterError::Tolerance(tolerance).into());
    }
    let quality = series.quality().ok_or(StateError::NoQualityFlags)?;
    trace!("Disallowed flags: {:?} ({:?})", policy.disallowed(), policy.matching);

    let mut keep = quality
        .iter()
        .enumerate()
        .filter(|(_, &q)| !policy.rejects(q))
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    debug!(
        "Flag cut removed {} of {} samples",
        series.len() - keep.len(),
        series.len()
    );

    let num_to_trim = (tolerance * keep.len() as f64).round_ties_even() as usize;
    if num_to_trim > 0 {
        let err = series.flux_error();
        // `keep` is in time order and the sort is stable, so ties go to the
        // earlier sample.
        keep.sort_by(|&a, &b| err[b].total_cmp(&err[a]));
        for &i in &keep[..num_to_trim] {
            trace!("Trimming sample at t={} (error {})", series.time()[i], err[i]);
        }
        keep.drain(..num_to_trim);
        keep.sort_unstable();
    }
    debug!("Trimmed {num_to_trim} highest-error samples (tolerance {tolerance})");

    Ok(series.select(&keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with_flags(flags: &[u32]) -> TimeSeries {
        let n = flags.len();
        TimeSeries::new(
            (0..n).map(|i| i as f64).collect(),
            vec![100.0; n],
            vec![1.0; n],
            flags.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn native_vocabulary_is_twelve_bits() {
        assert_eq!(QualityFlags::all().bits(), (1 << 12) - 1);
        assert!(QualityFlags::from_bits(1 << 12).is_none());
    }

    #[test]
    fn default_policy_drops_documented_flags() {
        let policy = FlagPolicy::default();
        for code in [8, 32, 128, 512] {
            assert!(policy.rejects(code), "{code} should be rejected");
        }
        for code in [0, 1, 2, 4, 16, 64, 256, 1024, 2048] {
            assert!(!policy.rejects(code), "{code} should be kept");
        }
        assert_eq!(
            policy.disallowed(),
            QualityFlags::from_bits_retain(8 | 32 | 128 | 512)
        );
        // Unknown bits.
        assert!(policy.rejects(4096));
        assert!(policy.rejects(u32::MAX));
    }

    #[test]
    fn combined_flags_depend_on_matching_mode() {
        let mut policy = FlagPolicy::default();
        // 8 | 32
        assert!(policy.rejects(40));
        // 1 | 2: all native, none disallowed
        assert!(!policy.rejects(3));

        policy.matching = FlagMatching::ExactValue;
        assert!(policy.rejects(40));
        assert!(policy.rejects(3));
        assert!(policy.rejects(8));
        assert!(!policy.rejects(2));
        assert!(!policy.rejects(0));
    }

    #[test]
    fn policy_is_configurable() {
        let mut policy = FlagPolicy::default();
        policy
            .set(QualityFlags::EARTH_POINT, FlagAction::Keep)
            .set(QualityFlags::STRAYLIGHT, FlagAction::Drop);
        assert_eq!(policy.action(QualityFlags::EARTH_POINT), FlagAction::Keep);
        assert_eq!(policy.action(QualityFlags::STRAYLIGHT), FlagAction::Drop);
        assert!(!policy.rejects(8));
        assert!(policy.rejects(2048));

        let all = FlagPolicy::keep_all();
        assert!(!all.rejects(8 | 32 | 128 | 512));
        assert!(all.rejects(1 << 20));
    }

    #[test]
    fn flagged_samples_are_removed() {
        let ts = series_with_flags(&[0, 8, 0, 32, 1, 5000, 128, 0, 512, 0]);
        let out = filter(&ts, 0.0, &FlagPolicy::default()).unwrap();
        assert_eq!(out.time(), &[0.0, 2.0, 4.0, 7.0, 9.0]);
        assert_eq!(out.quality(), Some([0, 0, 1, 0, 0].as_slice()));
    }

    #[test]
    fn every_sample_with_a_disallowed_flag_is_removed() {
        let ts = series_with_flags(&[8; 5]);
        let out = filter(&ts, 0.1, &FlagPolicy::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn trims_largest_errors_and_keeps_time_order() {
        let n = 100;
        // Errors are a permutation of 0..100 so the top ten are unambiguous.
        let err = (0..n).map(|i| ((i * 37) % n) as f64).collect::<Vec<_>>();
        let ts = TimeSeries::new(
            (0..n).map(|i| i as f64).collect(),
            vec![1.0; n],
            err.clone(),
            vec![0; n],
        )
        .unwrap();

        let out = filter(&ts, 0.1, &FlagPolicy::default()).unwrap();
        assert_eq!(out.len(), 90);
        assert!(out.time().windows(2).all(|w| w[0] < w[1]));
        assert!(out.flux_error().iter().all(|&e| e < 90.0));
    }

    #[test]
    fn trim_count_rounds_half_to_even() {
        // 0.1 * 25 = 2.5 -> 2
        let ts = series_with_flags(&[0; 25]);
        assert_eq!(filter(&ts, 0.1, &FlagPolicy::default()).unwrap().len(), 23);
        // 0.1 * 35 = 3.5 -> 4
        let ts = series_with_flags(&[0; 35]);
        assert_eq!(filter(&ts, 0.1, &FlagPolicy::default()).unwrap().len(), 31);
    }

    #[test]
    fn ties_trim_the_earliest_sample() {
        let ts = TimeSeries::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0; 4],
            vec![1.0, 5.0, 5.0, 2.0],
            vec![0; 4],
        )
        .unwrap();
        let out = filter(&ts, 0.25, &FlagPolicy::default()).unwrap();
        assert_eq!(out.time(), &[0.0, 2.0, 3.0]);
    }

    #[test]
    fn filtering_twice_trims_again() {
        let ts = series_with_flags(&[0; 100]);
        let once = filter(&ts, 0.1, &FlagPolicy::default()).unwrap();
        let twice = filter(&once, 0.1, &FlagPolicy::default()).unwrap();
        assert_eq!(once.len(), 90);
        assert_eq!(twice.len(), 81);
    }

    #[test]
    fn bad_tolerance_is_rejected() {
        let ts = series_with_flags(&[0; 4]);
        for tol in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                filter(&ts, tol, &FlagPolicy::default()),
                Err(PrepError::Parameter(ParameterError::Tolerance(_)))
            ));
        }
    }
}
