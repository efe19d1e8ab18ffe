//! Thin wrappers around `fitsio` that attach the file name to errors.

use std::{fmt::Display, path::Path};

use fitsio::{hdu::*, FitsFile};

use crate::error::IngestionError;

fn fits_err(file: &Path, err: fitsio::errors::Error) -> IngestionError {
    IngestionError::Fits {
        file: file.to_path_buf(),
        err,
    }
}

/// Open a fits file.
pub(crate) fn fits_open(file: &Path) -> Result<FitsFile, IngestionError> {
    FitsFile::open(file).map_err(|e| fits_err(file, e))
}

/// Open a fits file's HDU.
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu_description: T,
) -> Result<FitsHdu, IngestionError> {
    fits_fptr
        .hdu(hdu_description)
        .map_err(|e| fits_err(file, e))
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword that may
/// or may not exist, pull out the value of the keyword, parsing it into the
/// desired type.
pub(crate) fn fits_get_optional_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Option<T>, IngestionError> {
    let unparsed_value: String = match hdu.read_key(fits_fptr, keyword) {
        Ok(key_value) => key_value,
        Err(e) => match &e {
            // KEY_NO_EXIST or VALUE_UNDEFINED
            fitsio::errors::Error::Fits(fe) if matches!(fe.status, 202 | 204) => return Ok(None),
            _ => return Err(fits_err(file, e)),
        },
    };

    match unparsed_value.trim().parse() {
        Ok(parsed_value) => Ok(Some(parsed_value)),
        Err(_) => Err(IngestionError::BadKey {
            file: file.to_path_buf(),
            key: keyword.to_string(),
            value: unparsed_value,
        }),
    }
}

/// Given a FITS file pointer, a HDU that belongs to it, and a keyword, pull out
/// the value of the keyword, parsing it into the desired type.
pub(crate) fn fits_get_required_key<T: std::str::FromStr>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<T, IngestionError> {
    match fits_get_optional_key(fits_fptr, file, hdu, keyword)? {
        Some(value) => Ok(value),
        None => Err(IngestionError::MissingKey {
            file: file.to_path_buf(),
            key: keyword.to_string(),
        }),
    }
}

/// Get a column from a fits file's HDU.
pub(crate) fn fits_get_col<T: fitsio::tables::ReadsCol>(
    fits_fptr: &mut FitsFile,
    file: &Path,
    hdu: &FitsHdu,
    keyword: &str,
) -> Result<Vec<T>, IngestionError> {
    hdu.read_col(fits_fptr, keyword)
        .map_err(|e| fits_err(file, e))
}
