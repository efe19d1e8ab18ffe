//! Splitting a light curve into contiguous blocks of observation ("nights").

use log::debug;

use crate::{error::ParameterError, series::TimeSeries};

/// The default gap, in days, that separates two segments (about 14 minutes).
pub const DEFAULT_GAP_THRESHOLD: f64 = 0.01;

/// The index ranges of each contiguous segment of `times`. A new segment
/// starts after every consecutive difference larger than `gap_threshold`.
pub fn segment_ranges(times: &[f64], gap_threshold: f64) -> Vec<std::ops::Range<usize>> {
    if times.is_empty() {
        return vec![];
    }

    let mut ranges = vec![];
    let mut start = 0;
    for (i, w) in times.windows(2).enumerate() {
        if w[1] - w[0] > gap_threshold {
            ranges.push(start..i + 1);
            start = i + 1;
        }
    }
    ranges.push(start..times.len());
    ranges
}

/// Split `series` wherever two consecutive samples are more than
/// `gap_threshold` apart. The segments, concatenated in order, are exactly
/// `series`; an empty series gives no segments.
pub fn split(series: &TimeSeries, gap_threshold: f64) -> Result<Vec<TimeSeries>, ParameterError> {
    if !(gap_threshold.is_finite() && gap_threshold > 0.0) {
        return Err(ParameterError::GapThreshold(gap_threshold));
    }

    let ranges = segment_ranges(series.time(), gap_threshold);
    debug!(
        "Found {} segment(s) with gap threshold {gap_threshold}",
        ranges.len()
    );
    Ok(ranges.into_iter().map(|r| series.slice(r)).collect())
}
