//! Errors that can occur while preparing a light curve.

use std::path::PathBuf;

use thiserror::Error;

/// The caller asked for something ambiguous or impossible to resolve.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("No input files were specified")]
    NoInputs,

    #[error("No files matched the pattern '{0}'")]
    NoMatches(String),

    #[error("Invalid wildcard pattern '{pattern}': {err}")]
    BadPattern {
        pattern: String,
        err: glob::PatternError,
    },

    #[error("A wildcard ('{0}') can only be used as the only input; got {1} inputs")]
    WildcardWithOthers(String, usize),
}

/// The raw data can't be turned into a time series.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Source '{source_name}' has no valid (non-NaN) samples")]
    NoValidSamples { source_name: String },

    #[error("Source '{source_name}' has columns of unequal length (time {time}, flux {flux}, error {error}, quality {quality})")]
    ColumnLengths {
        source_name: String,
        time: usize,
        flux: usize,
        error: usize,
        quality: usize,
    },

    #[error("Source '{source_name}' has time unit '{got}', but the first source has '{expected}'")]
    TimeUnitMismatch {
        source_name: String,
        expected: String,
        got: String,
    },

    #[error("Source '{source_name}' is for target '{got}', but the first source is for '{expected}'")]
    TargetMismatch {
        source_name: String,
        expected: String,
        got: String,
    },

    #[error("Unrecognised time unit '{0}'")]
    UnknownTimeUnit(String),

    #[error("'{file}': required key '{key}' is missing")]
    MissingKey { file: PathBuf, key: String },

    #[error("'{file}': couldn't parse key '{key}' value '{value}'")]
    BadKey {
        file: PathBuf,
        key: String,
        value: String,
    },

    #[error("'{file}': {err}")]
    Fits {
        file: PathBuf,
        err: fitsio::errors::Error,
    },
}

/// A numeric parameter is out of range.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("Bin width must be a positive number of days; got {0}")]
    BinWidth(f64),

    #[error("Exposure time must be positive and no larger than the bin width ({bin_width}); got {exposure_time}")]
    ExposureTime { exposure_time: f64, bin_width: f64 },

    #[error("A bin width of {bin_width} would need {bins:e} bins")]
    TooManyBins { bins: f64, bin_width: f64 },

    #[error("Bin phase must be within [0, 1]; got {0}")]
    BinPhase(f64),

    #[error("Tolerance must be within [0, 1]; got {0}")]
    Tolerance(f64),

    #[error("Gap threshold must be a positive number of days; got {0}")]
    GapThreshold(f64),

    #[error("Signal period must be finite and non-zero; got {0}")]
    Period(f64),

    #[error("Amplitude must be finite and non-negative; got {0}")]
    Amplitude(f64),
}

/// An operation was invoked out of sequence.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Cannot rebin: the time series has already been resampled")]
    AlreadyResampled,

    #[error("Cannot quality-filter: the time series has already been resampled and has no quality flags")]
    NoQualityFlags,

    #[error("Cannot {0}: the time series is empty")]
    Empty(&'static str),

    #[error("Cannot export: the time series hasn't been prepared (rebinned) yet")]
    NotPrepared,
}

/// Everything that can go wrong in the pipeline.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Couldn't write '{path}': {err}")]
    Write {
        path: PathBuf,
        err: std::io::Error,
    },
}
