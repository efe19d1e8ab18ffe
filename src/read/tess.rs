//! Reading TESS SPOC light-curve files.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use super::{
    fits::{fits_get_col, fits_get_optional_key, fits_get_required_key, fits_open, fits_open_hdu},
    LightCurveRead, RawColumns, SourceMetadata,
};
use crate::{error::IngestionError, TimeUnit};

/// Which photometry to take from the light-curve table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluxColumn {
    /// Simple aperture photometry.
    #[default]
    Sap,

    /// Pre-search data conditioned (cotrended) simple aperture photometry.
    Pdcsap,
}

impl FluxColumn {
    fn names(self) -> (&'static str, &'static str) {
        match self {
            FluxColumn::Sap => ("SAP_FLUX", "SAP_FLUX_ERR"),
            FluxColumn::Pdcsap => ("PDCSAP_FLUX", "PDCSAP_FLUX_ERR"),
        }
    }
}

pub struct TessLightCurveReader {
    /// The path to the light-curve file on disk.
    path: PathBuf,

    flux_column: FluxColumn,
}

impl TessLightCurveReader {
    pub fn new<P: AsRef<Path>>(path: P, flux_column: FluxColumn) -> TessLightCurveReader {
        TessLightCurveReader {
            path: path.as_ref().to_path_buf(),
            flux_column,
        }
    }
}

impl LightCurveRead for TessLightCurveReader {
    fn read(&self) -> Result<RawColumns, IngestionError> {
        let file = self.path.as_path();

        let mut fptr = fits_open(file)?;
        let primary_hdu = fits_open_hdu(&mut fptr, file, 0)?;
        let target_id = match fits_get_optional_key::<String>(&mut fptr, file, &primary_hdu, "TICID")? {
            Some(id) => id,
            None => fits_get_required_key::<String>(&mut fptr, file, &primary_hdu, "OBJECT")?,
        };

        let lc_hdu = fits_open_hdu(&mut fptr, file, 1)?;
        let time_unit: TimeUnit = {
            let unit: String = fits_get_required_key(&mut fptr, file, &lc_hdu, "TIMEUNIT")?;
            unit.parse()?
        };
        let ra_deg = fits_get_required_key(&mut fptr, file, &lc_hdu, "RA_OBJ")?;
        let dec_deg = fits_get_required_key(&mut fptr, file, &lc_hdu, "DEC_OBJ")?;
        let exposure_time = fits_get_required_key(&mut fptr, file, &lc_hdu, "TIMEDEL")?;
        let bjdrefi: Option<f64> = fits_get_optional_key(&mut fptr, file, &lc_hdu, "BJDREFI")?;
        let bjdreff: Option<f64> = fits_get_optional_key(&mut fptr, file, &lc_hdu, "BJDREFF")?;
        let time_reference_jd = match (bjdrefi, bjdreff) {
            (None, None) => None,
            (i, f) => Some(i.unwrap_or(0.0) + f.unwrap_or(0.0)),
        };
        trace!("TIMEUNIT {time_unit}, TIMEDEL {exposure_time}, reference JD {time_reference_jd:?}");

        let (flux_name, error_name) = self.flux_column.names();
        let time: Vec<f64> = fits_get_col(&mut fptr, file, &lc_hdu, "TIME")?;
        let flux: Vec<f64> = fits_get_col(&mut fptr, file, &lc_hdu, flux_name)?;
        let flux_error: Vec<f64> = fits_get_col(&mut fptr, file, &lc_hdu, error_name)?;
        let quality: Vec<i32> = fits_get_col(&mut fptr, file, &lc_hdu, "QUALITY")?;
        // A negative value can't be a valid flag; make it one with unknown
        // bits so that it gets filtered.
        let quality = quality
            .into_iter()
            .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
            .collect();
        debug!("{}: {} rows for target {target_id}", file.display(), time.len());

        Ok(RawColumns {
            time,
            flux,
            flux_error,
            quality,
            meta: SourceMetadata {
                name: file.display().to_string(),
                target_id,
                ra_deg,
                dec_deg,
                time_unit,
                exposure_time,
                time_reference_jd,
            },
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_abs_diff_eq;
    use fitsio::{
        tables::{ColumnDataType, ColumnDescription},
        FitsFile,
    };

    use super::*;

    /// Write a minimal TESS-like light curve for tests.
    pub(crate) fn write_test_light_curve(
        path: &Path,
        tic_id: i64,
        time: &[f64],
        flux: &[f64],
        flux_error: &[f64],
        quality: &[i32],
    ) {
        let mut fptr = FitsFile::create(path).open().unwrap();
        let primary = fptr.primary_hdu().unwrap();
        primary.write_key(&mut fptr, "TICID", tic_id).unwrap();

        let columns = [
            ("TIME", ColumnDataType::Double),
            ("SAP_FLUX", ColumnDataType::Double),
            ("SAP_FLUX_ERR", ColumnDataType::Double),
            ("QUALITY", ColumnDataType::Int),
        ]
        .into_iter()
        .map(|(name, kind)| ColumnDescription::new(name).with_type(kind).create().unwrap())
        .collect::<Vec<_>>();
        let hdu = fptr.create_table("LIGHTCURVE", &columns).unwrap();
        hdu.write_col(&mut fptr, "TIME", time).unwrap();
        hdu.write_col(&mut fptr, "SAP_FLUX", flux).unwrap();
        hdu.write_col(&mut fptr, "SAP_FLUX_ERR", flux_error).unwrap();
        hdu.write_col(&mut fptr, "QUALITY", quality).unwrap();
        hdu.write_key(&mut fptr, "TIMEUNIT", "d").unwrap();
        hdu.write_key(&mut fptr, "RA_OBJ", 83.63308).unwrap();
        hdu.write_key(&mut fptr, "DEC_OBJ", 22.0145).unwrap();
        hdu.write_key(&mut fptr, "TIMEDEL", 2.0 / 1440.0).unwrap();
        hdu.write_key(&mut fptr, "BJDREFI", 2457000i64).unwrap();
        hdu.write_key(&mut fptr, "BJDREFF", 0.0).unwrap();
    }

    #[test]
    fn reads_columns_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc.fits");
        write_test_light_curve(
            &path,
            123456789,
            &[1.0, 1.1, f64::NAN],
            &[10.0, 11.0, 12.0],
            &[0.5, 0.6, 0.7],
            &[0, 8, -1],
        );

        let reader = TessLightCurveReader::new(&path, FluxColumn::Sap);
        assert_eq!(reader.path(), path.as_path());
        let raw = reader.read().unwrap();
        assert_eq!(raw.meta.target_id, "123456789");
        assert_eq!(raw.meta.time_unit, TimeUnit::Day);
        assert_abs_diff_eq!(raw.meta.ra_deg, 83.63308, epsilon = 1e-9);
        assert_abs_diff_eq!(raw.meta.dec_deg, 22.0145, epsilon = 1e-9);
        assert_abs_diff_eq!(raw.meta.exposure_time, 2.0 / 1440.0, epsilon = 1e-12);
        assert_eq!(raw.meta.time_reference_jd, Some(2457000.0));
        assert_eq!(raw.flux, vec![10.0, 11.0, 12.0]);
        assert_eq!(raw.quality, vec![0, 8, u32::MAX]);
        assert!(raw.time[2].is_nan());

        let screened = raw.screened().unwrap();
        assert_eq!(screened.len(), 2);
    }

    #[test]
    fn missing_file_is_an_ingestion_error() {
        let result = TessLightCurveReader::new("/does/not/exist.fits", FluxColumn::Sap).read();
        assert!(matches!(result, Err(IngestionError::Fits { .. })));
    }
}
