//! A single astronomical target and the pipeline that prepares its light curve.

use std::path::{Path, PathBuf};

use hifitime::Duration;
use log::{debug, info, warn};
use rand::Rng;
use vec1::Vec1;

use crate::{
    averaging::{rebin, RebinParams},
    error::{IngestionError, PrepError, StateError},
    quality::{filter, FlagPolicy, DEFAULT_TOLERANCE},
    read::{
        resolve_inputs,
        tess::{FluxColumn, TessLightCurveReader},
        LightCurveRead, RawColumns,
    },
    segments::split,
    series::TimeSeries,
    stats::reduced_chi_squared,
    synth::{self, NoiseSeed},
    write::{write_target, ExportDescriptor, ExportedFiles},
    TargetMetadata,
};

/// Everything [`Target::prepare`] needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareParams {
    /// The fraction of highest-uncertainty samples to trim.
    pub tolerance: f64,
    pub flag_policy: FlagPolicy,
    pub rebin: RebinParams,
}

impl Default for PrepareParams {
    /// 10% tolerance, the default flag policy and 2-minute bins centred on
    /// their timestamps, with empty bins set to the median.
    fn default() -> Self {
        PrepareParams {
            tolerance: DEFAULT_TOLERANCE,
            flag_policy: FlagPolicy::default(),
            rebin: RebinParams::default(),
        }
    }
}

/// A target's metadata together with the current state of its light curve.
///
/// Every operation computes a new [`TimeSeries`] and only replaces the held
/// one if it succeeds, so a failed operation leaves the target as it was.
#[derive(Debug, Clone)]
pub struct Target {
    meta: TargetMetadata,
    series: TimeSeries,
    filtered: bool,
}

impl Target {
    /// Merge raw light curves of the same target into one time-sorted series.
    ///
    /// Each source is screened for non-finite values first. All sources must
    /// agree on the target and the time unit; the position, exposure time and
    /// time reference are taken from the first. Overlapping sources are not
    /// de-duplicated.
    pub fn ingest(sources: Vec1<RawColumns>) -> Result<Target, PrepError> {
        let (first, rest) = sources.split_off_first();
        let first = first.screened()?;

        let meta = TargetMetadata {
            id: first.meta.target_id.clone(),
            ra_deg: first.meta.ra_deg,
            dec_deg: first.meta.dec_deg,
            time_unit: first.meta.time_unit,
            exposure_time: first.meta.exposure_time,
            time_reference_jd: first.meta.time_reference_jd,
        };

        let mut time = first.time;
        let mut flux = first.flux;
        let mut flux_error = first.flux_error;
        let mut quality = first.quality;
        for source in rest {
            let source = source.screened()?;
            if source.meta.time_unit != meta.time_unit {
                return Err(IngestionError::TimeUnitMismatch {
                    source_name: source.meta.name,
                    expected: meta.time_unit.to_string(),
                    got: source.meta.time_unit.to_string(),
                }
                .into());
            }
            if source.meta.target_id != meta.id {
                return Err(IngestionError::TargetMismatch {
                    source_name: source.meta.name,
                    expected: meta.id.clone(),
                    got: source.meta.target_id,
                }
                .into());
            }
            time.extend(source.time);
            flux.extend(source.flux);
            flux_error.extend(source.flux_error);
            quality.extend(source.quality);
        }

        let series = TimeSeries::new(time, flux, flux_error, quality)?;
        info!("Target {}: ingested {} samples", meta.id, series.len());
        if let Some(duration) = series.duration() {
            debug!("Duration: {}", meta.time_unit.to_duration(duration));
        }

        Ok(Target {
            meta,
            series,
            filtered: false,
        })
    }

    /// Resolve `inputs` (plain paths, or a single wildcard pattern), read each
    /// file as a TESS light curve, and [`ingest`](Target::ingest) them.
    pub fn from_inputs<S: AsRef<str>>(
        inputs: &[S],
        flux_column: FluxColumn,
    ) -> Result<Target, PrepError> {
        let paths = resolve_inputs(inputs)?;
        Self::from_paths(&paths, flux_column)
    }

    /// Read each file as a TESS light curve and ingest them.
    pub fn from_paths(paths: &Vec1<PathBuf>, flux_column: FluxColumn) -> Result<Target, PrepError> {
        let sources = paths.try_mapped_ref(|p| {
            let reader = TessLightCurveReader::new(p, flux_column);
            debug!("Reading light curve {}", reader.path().display());
            reader.read()
        })?;
        Self::ingest(sources)
    }

    pub fn meta(&self) -> &TargetMetadata {
        &self.meta
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Has [`filter`](Target::filter) been run on this target?
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// The time spanned by the light curve.
    pub fn duration(&self) -> Option<Duration> {
        self.series
            .duration()
            .map(|d| self.meta.time_unit.to_duration(d))
    }

    /// Remove samples with disallowed quality flags and trim the `tolerance`
    /// fraction with the largest uncertainties. Running this again trims
    /// another `tolerance` fraction.
    pub fn filter(&mut self, tolerance: f64, policy: &FlagPolicy) -> Result<(), PrepError> {
        info!("Filtering data...");
        let filtered = filter(&self.series, tolerance, policy)?;
        debug!("{} -> {} samples", self.series.len(), filtered.len());
        self.series = filtered;
        self.filtered = true;
        Ok(())
    }

    /// Resample onto a uniform grid.
    pub fn rebin(&mut self, params: &RebinParams) -> Result<(), PrepError> {
        info!("Rebinning...");
        self.series = rebin(&self.series, params)?;
        Ok(())
    }

    /// Filter (unless that's already been done) and rebin; afterwards the
    /// target is ready to [`export`](Target::export).
    pub fn prepare(&mut self, params: &PrepareParams) -> Result<(), PrepError> {
        if self.series.is_resampled() {
            return Err(StateError::AlreadyResampled.into());
        }
        let mut next = self.clone();
        if !next.filtered {
            next.filter(params.tolerance, &params.flag_policy)?;
        }
        next.rebin(&params.rebin)?;
        *self = next;
        info!("Done!");
        Ok(())
    }

    /// Add a sinusoid of `amplitude` and `period` (in the time unit) to the
    /// flux.
    pub fn inject_signal(&mut self, amplitude: f64, period: f64) -> Result<(), PrepError> {
        self.series = synth::inject_signal(&self.series, amplitude, period)?;
        Ok(())
    }

    /// Add uniform noise with a full width of `amplitude` to the flux.
    pub fn add_noise(&mut self, amplitude: f64, seed: NoiseSeed) -> Result<(), PrepError> {
        self.series = seed.with_rng(|rng| synth::add_noise(&self.series, amplitude, rng))?;
        Ok(())
    }

    /// A copy of this target whose flux is pure noise, so that only the
    /// window function is left. Its id has a `_WINDOWNOISE` suffix so that
    /// exports don't clash with the real light curve.
    pub fn window_function<R: Rng + ?Sized>(&self, rng: &mut R) -> Target {
        let mut meta = self.meta.clone();
        meta.id.push_str("_WINDOWNOISE");
        Target {
            meta,
            series: synth::window_noise(&self.series, rng),
            filtered: self.filtered,
        }
    }

    /// Split the light curve into contiguous observing blocks. Each block
    /// becomes its own target with the same metadata.
    pub fn split_nights(&self, gap_threshold: f64) -> Result<Vec<Target>, PrepError> {
        let nights = split(&self.series, gap_threshold)?;
        Ok(nights
            .into_iter()
            .map(|series| Target {
                meta: self.meta.clone(),
                series,
                filtered: self.filtered,
            })
            .collect())
    }

    /// How variable the light curve is; see [`reduced_chi_squared`].
    pub fn reduced_chi_squared(&self) -> Option<f64> {
        reduced_chi_squared(self.series.flux(), self.series.flux_error())
    }

    /// Write the `.dat` and `.inf` files. The target must have been prepared.
    ///
    /// Without a destination, files are written to `./<id>.*`. If the
    /// destination is a directory (or ends in `/`), they are written to
    /// `<destination>/<id>.*`. Otherwise the destination, minus any
    /// extension, is the file stem.
    pub fn export(
        &self,
        destination: Option<&Path>,
        descriptor: &ExportDescriptor,
    ) -> Result<ExportedFiles, PrepError> {
        if !self.series.is_resampled() || self.series.is_empty() {
            return Err(StateError::NotPrepared.into());
        }
        if self.series.flux().iter().all(|&f| f == 0.0) {
            warn!("Target {}: every flux value is zero", self.meta.id);
        }
        let stem = output_stem(destination, &self.meta.id);
        write_target(&stem, &self.meta, &self.series, descriptor)
    }
}

/// Work out the output file stem for a target.
pub fn output_stem(destination: Option<&Path>, id: &str) -> PathBuf {
    match destination {
        None => Path::new(".").join(id),
        Some(d) if d.is_dir() || d.as_os_str().to_string_lossy().ends_with('/') => d.join(id),
        Some(d) => d.with_extension(""),
    }
}
