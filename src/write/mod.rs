//! Writing prepared light curves in the `.dat` + `.inf` format understood by
//! PRESTO-style Fourier tools.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use hifitime::MJD_OFFSET;
use log::{debug, trace};

use crate::{error::PrepError, series::TimeSeries, stats::median, TargetMetadata};

/// Flux values are multiplied by this before being written as `f32`.
pub const FLUX_RESCALE: f64 = 1.0e7;

/// The free-form parts of the `.inf` descriptor. Everything else comes from
/// the target and its light curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDescriptor {
    pub telescope: String,
    pub instrument: String,
    pub observer: String,
    pub barycentered: bool,
    /// Whether the written series has breaks. Rebinned series have none
    /// unless empty bins were zero-filled.
    pub breaks: bool,
    pub em_band: String,
    pub filter: String,
    pub field_of_view_arcsec: String,
    pub central_wavelength_nm: String,
    pub bandpass_nm: String,
    pub analyst: String,
    pub notes: String,
}

impl Default for ExportDescriptor {
    fn default() -> Self {
        ExportDescriptor {
            telescope: "TESS".to_string(),
            instrument: "unset".to_string(),
            observer: "unset".to_string(),
            barycentered: false,
            breaks: false,
            em_band: "Optical".to_string(),
            filter: "Other".to_string(),
            field_of_view_arcsec: "180.00".to_string(),
            central_wavelength_nm: "500.0".to_string(),
            bandpass_nm: "400.0".to_string(),
            analyst: "unset".to_string(),
            notes: "none".to_string(),
        }
    }
}

/// The files written for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub dat: PathBuf,
    pub inf: PathBuf,
}

/// The fixed labels of the `.inf` file, in order. Consumers parse by line
/// position, so neither the order nor the text may change.
const INF_LABELS: [&str; 18] = [
    " Data file name without suffix          =  ",
    " Telescope used                         =  ",
    " Instrument used                        =  ",
    " Object being observed                  =  ",
    " J2000 Right Ascension (hh:mm:ss.ssss)  =  ",
    " J2000 Declination     (dd:mm:ss.ssss)  =  ",
    " Data observed by                       =  ",
    " Epoch of observation (MJD)             =  ",
    " Barycentered?           (1 yes, 0 no)  =  ",
    " Number of bins in the time series      =  ",
    " Width of each time series bin (sec)    =  ",
    " Any breaks in the data? (1 yes, 0 no)  =  ",
    " Type of observation (EM band)          =  ",
    " Photometric filter used                =  ",
    " Field-of-view diameter (arcsec)        =  ",
    " Central wavelength (nm)                =  ",
    " Bandpass (nm)                          =  ",
    " Data analyzed by                       =  ",
];

/// Flux as written to the `.dat` file: rescaled by [`FLUX_RESCALE`], with
/// exact zeros (which mean "no data" downstream) replaced by the median of the
/// non-zero values.
pub fn rescaled_flux(flux: &[f64]) -> Vec<f32> {
    let rescaled = flux.iter().map(|f| f * FLUX_RESCALE).collect::<Vec<_>>();
    let non_zero = rescaled
        .iter()
        .copied()
        .filter(|&f| f != 0.0)
        .collect::<Vec<_>>();
    let replacement = median(&non_zero);
    let num_zeros = rescaled.len() - non_zero.len();
    if num_zeros > 0 {
        debug!("Replacing {num_zeros} zero flux value(s) with {replacement:?}");
    }

    rescaled
        .into_iter()
        .map(|f| match (f == 0.0, replacement) {
            (true, Some(r)) => r as f32,
            _ => f as f32,
        })
        .collect()
}

/// The epoch of the first sample as an MJD, if the time reference is known.
/// Otherwise the first timestamp as it is.
fn epoch(meta: &TargetMetadata, first_time: f64) -> f64 {
    match meta.time_reference_jd {
        Some(jd) => meta.time_unit.to_days(first_time) + jd - MJD_OFFSET,
        None => first_time,
    }
}

/// The lines of the `.inf` file.
pub fn inf_lines(
    basename: &str,
    meta: &TargetMetadata,
    series: &TimeSeries,
    descriptor: &ExportDescriptor,
) -> Vec<String> {
    let first_time = series.time().first().copied().unwrap_or(0.0);
    let bin_width_seconds = series
        .grid()
        .map(|g| meta.time_unit.to_duration(g.bin_width).to_seconds())
        .unwrap_or_else(|| meta.time_unit.to_duration(meta.exposure_time).to_seconds());
    let flag = |b: bool| String::from(if b { "1" } else { "0" });

    let values = [
        basename.to_string(),
        descriptor.telescope.clone(),
        descriptor.instrument.clone(),
        meta.id.clone(),
        meta.ra_hms(),
        meta.dec_dms(),
        descriptor.observer.clone(),
        format!("{:.10}", epoch(meta, first_time)),
        flag(descriptor.barycentered),
        series.len().to_string(),
        format!("{bin_width_seconds:.6}"),
        flag(descriptor.breaks),
        descriptor.em_band.clone(),
        descriptor.filter.clone(),
        descriptor.field_of_view_arcsec.clone(),
        descriptor.central_wavelength_nm.clone(),
        descriptor.bandpass_nm.clone(),
        descriptor.analyst.clone(),
    ];

    let mut lines = INF_LABELS
        .iter()
        .zip(values)
        .map(|(label, value)| format!("{label}{value}"))
        .collect::<Vec<_>>();
    lines.push(" Any additional notes:".to_string());
    lines.push(format!("   {}", descriptor.notes));
    lines
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> PrepError + '_ {
    move |err| PrepError::Write {
        path: path.to_path_buf(),
        err,
    }
}

/// `stem` with `suffix` appended. Unlike [`Path::with_extension`], dots already
/// in the stem (e.g. "HD 1234.5") are kept.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Write `<stem>.dat` and `<stem>.inf` for a prepared light curve.
pub fn write_target(
    stem: &Path,
    meta: &TargetMetadata,
    series: &TimeSeries,
    descriptor: &ExportDescriptor,
) -> Result<ExportedFiles, PrepError> {
    let dat = with_suffix(stem, ".dat");
    let inf = with_suffix(stem, ".inf");
    let basename = stem
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| meta.id.clone());

    debug!("Writing {}", dat.display());
    let mut writer = BufWriter::new(File::create(&dat).map_err(write_err(&dat))?);
    for value in rescaled_flux(series.flux()) {
        writer
            .write_all(&value.to_le_bytes())
            .map_err(write_err(&dat))?;
    }
    writer.flush().map_err(write_err(&dat))?;

    debug!("Writing {}", inf.display());
    let mut writer = BufWriter::new(File::create(&inf).map_err(write_err(&inf))?);
    for line in inf_lines(&basename, meta, series, descriptor) {
        trace!("{line}");
        writeln!(writer, "{line}").map_err(write_err(&inf))?;
    }
    writer.flush().map_err(write_err(&inf))?;

    Ok(ExportedFiles { dat, inf })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        averaging::{rebin, RebinParams},
        TimeUnit,
    };

    fn meta() -> TargetMetadata {
        TargetMetadata {
            id: "261136679".to_string(),
            ra_deg: 83.63308,
            dec_deg: -22.0145,
            time_unit: TimeUnit::Day,
            exposure_time: 2.0 / 1440.0,
            time_reference_jd: Some(2457000.0),
        }
    }

    fn prepared() -> TimeSeries {
        let raw = TimeSeries::new(
            vec![1325.0, 1325.5, 1326.0],
            vec![1.0, 2.0, 3.0],
            vec![0.1; 3],
            vec![0; 3],
        )
        .unwrap();
        rebin(
            &raw,
            &RebinParams {
                bin_width: 0.25,
                exposure_time: 0.25,
                ..RebinParams::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn zeros_become_the_non_zero_median() {
        let out = rescaled_flux(&[1.0, 0.0, 3.0, 2.0]);
        assert_eq!(out, vec![1.0e7, 2.0e7, 3.0e7, 2.0e7]);
        // Nothing to take a median of; leave it be.
        assert_eq!(rescaled_flux(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn inf_has_fixed_layout() {
        let series = prepared();
        let lines = inf_lines("261136679", &meta(), &series, &ExportDescriptor::default());
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0], " Data file name without suffix          =  261136679");
        assert_eq!(lines[1], " Telescope used                         =  TESS");
        assert_eq!(lines[3], " Object being observed                  =  261136679");
        assert_eq!(lines[4], " J2000 Right Ascension (hh:mm:ss.ssss)  =  05:34:31.9392");
        assert_eq!(lines[5], " J2000 Declination     (dd:mm:ss.ssss)  =  -22:00:52.2000");
        assert_eq!(lines[8], " Barycentered?           (1 yes, 0 no)  =  0");
        assert_eq!(lines[9], " Number of bins in the time series      =  5");
        assert_eq!(lines[10], " Width of each time series bin (sec)    =  21600.000000");
        assert_eq!(lines[18], " Any additional notes:");
        assert_eq!(lines[19], "   none");

        let epoch: f64 = lines[7].rsplit("=  ").next().unwrap().parse().unwrap();
        // First bin centre is 1325.125 BTJD.
        assert_abs_diff_eq!(epoch, 1325.125 + 2457000.0 - 2400000.5, epsilon = 1e-6);
    }

    #[test]
    fn files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("star");
        let series = prepared();
        let files = write_target(&stem, &meta(), &series, &ExportDescriptor::default()).unwrap();
        assert_eq!(files.dat, dir.path().join("star.dat"));

        let bytes = std::fs::read(&files.dat).unwrap();
        assert_eq!(bytes.len(), 4 * series.len());
        let first = f32::from_le_bytes(bytes[..4].try_into().unwrap());
        assert_eq!(first, 1.0e7);

        let inf = std::fs::read_to_string(&files.inf).unwrap();
        assert_eq!(inf.lines().count(), 20);
        assert!(inf.starts_with(" Data file name without suffix          =  star\n"));
    }

    #[test]
    fn dotted_stems_keep_their_dots() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("HD 1234.5");
        let files = write_target(&stem, &meta(), &prepared(), &ExportDescriptor::default()).unwrap();
        assert_eq!(files.dat, dir.path().join("HD 1234.5.dat"));
        assert_eq!(files.inf, dir.path().join("HD 1234.5.inf"));
        assert!(files.dat.exists());

        let inf = std::fs::read_to_string(&files.inf).unwrap();
        assert!(inf.starts_with(" Data file name without suffix          =  HD 1234.5\n"));
    }

    #[test]
    fn unwritable_destination() {
        let result = write_target(
            Path::new("/no/such/dir/star"),
            &meta(),
            &prepared(),
            &ExportDescriptor::default(),
        );
        assert!(matches!(result, Err(PrepError::Write { .. })));
    }
}
