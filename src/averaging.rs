//! Rebinning an irregularly-sampled light curve onto a uniform grid.

use std::ops::Range;

use log::{debug, trace};

use crate::{
    error::{ParameterError, PrepError, StateError},
    series::{BinGrid, TimeSeries},
    stats::median,
};

/// Two minutes, in days.
pub const DEFAULT_BIN_WIDTH: f64 = 2.0 / 60.0 / 24.0;

/// What to put in a bin that no samples fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillPolicy {
    /// Use the median of all non-empty bins, separately for each channel.
    #[default]
    MedianReplace,

    /// Use 0.0, which the downstream Fourier tools read as "no data".
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebinParams {
    /// The width of each output bin, in the series' time unit.
    pub bin_width: f64,

    /// The integration time each bin represents. If this is smaller than
    /// `bin_width`, the aggregated flux (and its error) are scaled down by the
    /// duty cycle `exposure_time / bin_width`.
    pub exposure_time: f64,

    /// Where within each bin the output timestamp sits (0.5 is the centre).
    pub bin_phase: f64,

    pub fill_policy: FillPolicy,
}

impl Default for RebinParams {
    fn default() -> Self {
        RebinParams {
            bin_width: DEFAULT_BIN_WIDTH,
            exposure_time: DEFAULT_BIN_WIDTH,
            bin_phase: 0.5,
            fill_policy: FillPolicy::default(),
        }
    }
}

impl RebinParams {
    fn validate(&self) -> Result<(), ParameterError> {
        if !(self.bin_width.is_finite() && self.bin_width > 0.0) {
            return Err(ParameterError::BinWidth(self.bin_width));
        }
        if !(self.exposure_time.is_finite()
            && self.exposure_time > 0.0
            && self.exposure_time <= self.bin_width)
        {
            return Err(ParameterError::ExposureTime {
                exposure_time: self.exposure_time,
                bin_width: self.bin_width,
            });
        }
        if !(0.0..=1.0).contains(&self.bin_phase) {
            return Err(ParameterError::BinPhase(self.bin_phase));
        }
        Ok(())
    }

    /// The fraction of each bin covered by integration.
    pub fn duty_cycle(&self) -> f64 {
        self.exposure_time / self.bin_width
    }
}

/// The most bins [`rebin`] will lay over one series.
pub const MAX_BINS: usize = 100_000_000;

/// A single output bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// The bin index; bin `i` starts at `first_time + i * bin_width`.
    pub index: usize,

    /// The range of indices into the (time-sorted) input samples that fall
    /// into this bin. Empty if the bin has no samples.
    pub range: Range<usize>,

    /// The reported timestamp of the bin, `bin_phase` of the way through it.
    pub timestamp: f64,
}

/// Lay a grid of `bin_width` over sorted `times` starting at the first time,
/// and work out which samples belong to each bin. Every bin up to the one
/// containing the last time is returned, including empty ones.
///
/// `times` must be non-empty and sorted; `bin_width` must be positive.
pub fn times_to_bins(times: &[f64], bin_width: f64, bin_phase: f64) -> Vec<Bin> {
    let (first, last) = match times {
        [] => return vec![],
        [first, .., last] => (*first, *last),
        [only] => (*only, *only),
    };
    let num_bins = ((last - first) / bin_width).floor() as usize + 1;

    let mut bins = Vec::with_capacity(num_bins);
    let mut sample_index = 0;
    for index in 0..num_bins {
        let start = sample_index;
        // Samples past the nominal end of the grid (float rounding on the last
        // edge) go into the final bin.
        while sample_index < times.len()
            && (index + 1 == num_bins || bin_index(times[sample_index], first, bin_width) <= index)
        {
            sample_index += 1;
        }
        bins.push(Bin {
            index,
            range: start..sample_index,
            timestamp: first + (index as f64 + bin_phase) * bin_width,
        });
    }
    debug_assert_eq!(sample_index, times.len());

    bins
}

fn bin_index(time: f64, first: f64, bin_width: f64) -> usize {
    ((time - first) / bin_width).floor() as usize
}

/// Resample `series` onto a uniform grid.
///
/// Each bin's flux is the mean of its samples times the duty cycle; its error
/// is the propagated error of that mean, `sqrt(Σσ²) / n`, times the same duty
/// cycle. Empty bins are filled according to `params.fill_policy`. Time, flux
/// and error share one grid. The output has no quality-flag channel.
pub fn rebin(series: &TimeSeries, params: &RebinParams) -> Result<TimeSeries, PrepError> {
    params.validate()?;
    if series.is_resampled() {
        return Err(StateError::AlreadyResampled.into());
    }
    if series.is_empty() {
        return Err(StateError::Empty("rebin").into());
    }

    let span = series.duration().unwrap_or(0.0);
    let num_bins = (span / params.bin_width).floor() + 1.0;
    if !(num_bins.is_finite() && num_bins <= MAX_BINS as f64) {
        return Err(ParameterError::TooManyBins {
            bins: num_bins,
            bin_width: params.bin_width,
        }
        .into());
    }

    let bins = times_to_bins(series.time(), params.bin_width, params.bin_phase);
    let duty_cycle = params.duty_cycle();
    debug!(
        "Rebinning {} samples into {} bins of width {} (duty cycle {duty_cycle})",
        series.len(),
        bins.len(),
        params.bin_width
    );

    let flux_in = series.flux();
    let err_in = series.flux_error();
    let mut time = Vec::with_capacity(bins.len());
    let mut flux: Vec<Option<f64>> = Vec::with_capacity(bins.len());
    let mut error: Vec<Option<f64>> = Vec::with_capacity(bins.len());
    for bin in &bins {
        time.push(bin.timestamp);
        if bin.range.is_empty() {
            trace!("Bin {} is empty", bin.index);
            flux.push(None);
            error.push(None);
            continue;
        }

        let n = bin.range.len() as f64;
        let mean = flux_in[bin.range.clone()].iter().sum::<f64>() / n;
        let propagated = err_in[bin.range.clone()]
            .iter()
            .map(|e| e * e)
            .sum::<f64>()
            .sqrt()
            / n;
        flux.push(Some(mean * duty_cycle));
        error.push(Some(propagated * duty_cycle));
    }

    let num_empty = flux.iter().filter(|f| f.is_none()).count();
    if num_empty > 0 {
        debug!("{num_empty} of {} bins are empty ({:?})", bins.len(), params.fill_policy);
    }

    let grid = BinGrid {
        bin_width: params.bin_width,
        bin_phase: params.bin_phase,
        exposure_time: params.exposure_time,
    };
    Ok(TimeSeries::from_sorted_parts(
        time,
        fill(flux, params.fill_policy),
        fill(error, params.fill_policy),
        None,
        Some(grid),
    ))
}

fn fill(values: Vec<Option<f64>>, policy: FillPolicy) -> Vec<f64> {
    let replacement = match policy {
        FillPolicy::Zero => 0.0,
        FillPolicy::MedianReplace => {
            let present = values.iter().flatten().copied().collect::<Vec<_>>();
            // There's always at least one non-empty bin, because the first
            // sample defines the first bin.
            median(&present).unwrap_or(0.0)
        }
    };
    values
        .into_iter()
        .map(|v| v.unwrap_or(replacement))
        .collect()
}
