//! The aligned time, flux and uncertainty columns of a light curve.

use std::ops::Range;

use itertools::{izip, Itertools};

use crate::error::IngestionError;

/// The uniform grid a resampled [`TimeSeries`] lives on. All values are in
/// the time unit of the series (normally days).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinGrid {
    /// The width of each bin.
    pub bin_width: f64,

    /// Where within a bin its timestamp sits; 0 is the leading edge, 0.5 the
    /// centre.
    pub bin_phase: f64,

    /// The integration time represented by each bin. Never larger than
    /// `bin_width`.
    pub exposure_time: f64,
}

/// An ordered light curve. The columns are private so that they can only be
/// changed all together; every transformation produces a new value.
///
/// A series is either *raw* (it has a quality-flag channel and no grid) or
/// *resampled* (it has a grid and no quality-flag channel).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_error: Vec<f64>,
    quality: Option<Vec<u32>>,
    grid: Option<BinGrid>,
}

impl TimeSeries {
    /// Create a raw series from unsorted columns. The samples are stably
    /// sorted by time; repeated timestamps are kept.
    pub fn new(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_error: Vec<f64>,
        quality: Vec<u32>,
    ) -> Result<TimeSeries, IngestionError> {
        check_lengths("time series", time.len(), flux.len(), flux_error.len(), quality.len())?;

        let mut samples = izip!(time, flux, flux_error, quality).collect::<Vec<_>>();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (time, flux, flux_error, quality): (Vec<f64>, Vec<f64>, Vec<f64>, Vec<u32>) =
            samples.into_iter().multiunzip();

        Ok(TimeSeries {
            time,
            flux,
            flux_error,
            quality: Some(quality),
            grid: None,
        })
    }

    /// Assemble a series from columns already known to be aligned and sorted.
    pub(crate) fn from_sorted_parts(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_error: Vec<f64>,
        quality: Option<Vec<u32>>,
        grid: Option<BinGrid>,
    ) -> TimeSeries {
        debug_assert_eq!(time.len(), flux.len());
        debug_assert_eq!(time.len(), flux_error.len());
        debug_assert!(quality.as_ref().map_or(true, |q| q.len() == time.len()));
        debug_assert!(quality.is_none() || grid.is_none());
        debug_assert!(time.windows(2).all(|w| w[0] <= w[1]));
        TimeSeries {
            time,
            flux,
            flux_error,
            quality,
            grid,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_error(&self) -> &[f64] {
        &self.flux_error
    }

    /// The quality flags of a raw series. `None` once resampled.
    pub fn quality(&self) -> Option<&[u32]> {
        self.quality.as_deref()
    }

    /// The grid of a resampled series. `None` before resampling.
    pub fn grid(&self) -> Option<&BinGrid> {
        self.grid.as_ref()
    }

    pub fn is_resampled(&self) -> bool {
        self.grid.is_some()
    }

    /// Last time minus first time, in the series' time unit.
    pub fn duration(&self) -> Option<f64> {
        match self.time.as_slice() {
            [] => None,
            [first, .., last] => Some(last - first),
            [_] => Some(0.0),
        }
    }

    /// A copy of the samples in `range`, keeping whatever channels this
    /// series has.
    pub(crate) fn slice(&self, range: Range<usize>) -> TimeSeries {
        TimeSeries {
            time: self.time[range.clone()].to_vec(),
            flux: self.flux[range.clone()].to_vec(),
            flux_error: self.flux_error[range.clone()].to_vec(),
            quality: self.quality.as_ref().map(|q| q[range].to_vec()),
            grid: self.grid,
        }
    }

    /// Keep only the samples at `indices`, which must be ascending.
    pub(crate) fn select(&self, indices: &[usize]) -> TimeSeries {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        let pick = |col: &[f64]| indices.iter().map(|&i| col[i]).collect::<Vec<_>>();
        TimeSeries {
            time: pick(&self.time),
            flux: pick(&self.flux),
            flux_error: pick(&self.flux_error),
            quality: self
                .quality
                .as_ref()
                .map(|q| indices.iter().map(|&i| q[i]).collect()),
            grid: self.grid,
        }
    }

    /// The same series with a different flux column. Time, errors and flags
    /// are untouched.
    pub(crate) fn with_flux(&self, flux: Vec<f64>) -> TimeSeries {
        assert_eq!(flux.len(), self.flux.len());
        TimeSeries {
            flux,
            ..self.clone()
        }
    }
}

pub(crate) fn check_lengths(
    source_name: &str,
    time: usize,
    flux: usize,
    error: usize,
    quality: usize,
) -> Result<(), IngestionError> {
    if flux != time || error != time || quality != time {
        return Err(IngestionError::ColumnLengths {
            source_name: source_name.to_string(),
            time,
            flux,
            error,
            quality,
        });
    }
    Ok(())
}
