pub mod fits;
pub mod tess;

use std::path::{Path, PathBuf};

use log::{debug, warn};
use vec1::Vec1;

use crate::{
    error::{ArgumentError, IngestionError},
    series::check_lengths,
    TimeUnit,
};

/// Scalar metadata that accompanies each raw light curve.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    /// Where the data came from (normally a file path). Only used in messages.
    pub name: String,
    pub target_id: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub time_unit: TimeUnit,
    /// The nominal exposure duration of a cadence, in `time_unit`.
    pub exposure_time: f64,
    /// The Julian date of time 0, if the source says.
    pub time_reference_jd: Option<f64>,
}

/// The raw columns of one light-curve source. All four columns must have
/// the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumns {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_error: Vec<f64>,
    pub quality: Vec<u32>,
    pub meta: SourceMetadata,
}

impl RawColumns {
    /// Drop every sample whose time, flux or flux error isn't a finite number.
    pub fn screened(self) -> Result<RawColumns, IngestionError> {
        let RawColumns {
            time,
            flux,
            flux_error,
            quality,
            meta,
        } = self;
        check_lengths(&meta.name, time.len(), flux.len(), flux_error.len(), quality.len())?;

        let total = time.len();
        let keep = (0..total)
            .filter(|&i| time[i].is_finite() && flux[i].is_finite() && flux_error[i].is_finite())
            .collect::<Vec<_>>();
        if keep.len() < total {
            debug!(
                "{}: dropped {} of {total} samples with invalid values",
                meta.name,
                total - keep.len()
            );
        }
        if keep.is_empty() {
            return Err(IngestionError::NoValidSamples {
                source_name: meta.name,
            });
        }

        Ok(RawColumns {
            time: keep.iter().map(|&i| time[i]).collect(),
            flux: keep.iter().map(|&i| flux[i]).collect(),
            flux_error: keep.iter().map(|&i| flux_error[i]).collect(),
            quality: keep.iter().map(|&i| quality[i]).collect(),
            meta,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Something that can produce the raw columns of a light curve.
pub trait LightCurveRead: Sync + Send {
    fn read(&self) -> Result<RawColumns, IngestionError>;

    /// The file being read.
    fn path(&self) -> &Path;
}

/// Turn user-supplied input arguments into file paths. Either every argument
/// is a plain path, or there is exactly one argument and it may contain a `*`
/// wildcard. Without a `*`, `?` and `[` are taken literally.
pub fn resolve_inputs<S: AsRef<str>>(args: &[S]) -> Result<Vec1<PathBuf>, ArgumentError> {
    let wildcard = args
        .iter()
        .map(|a| a.as_ref())
        .find(|a| a.contains('*'));

    let paths = match (wildcard, args.len()) {
        (_, 0) => return Err(ArgumentError::NoInputs),

        (Some(pattern), 1) => {
            let matches = glob::glob(pattern).map_err(|err| ArgumentError::BadPattern {
                pattern: pattern.to_string(),
                err,
            })?;
            let mut paths = vec![];
            for entry in matches {
                match entry {
                    Ok(p) => paths.push(p),
                    Err(e) => warn!("Skipping unreadable path {}: {e}", e.path().display()),
                }
            }
            if paths.is_empty() {
                return Err(ArgumentError::NoMatches(pattern.to_string()));
            }
            paths
        }

        (Some(pattern), n) => {
            return Err(ArgumentError::WildcardWithOthers(pattern.to_string(), n))
        }

        (None, _) => args.iter().map(|a| PathBuf::from(a.as_ref())).collect(),
    };

    for p in &paths {
        debug!("Input: {}", p.display());
    }
    Vec1::try_from_vec(paths).map_err(|_| ArgumentError::NoInputs)
}
