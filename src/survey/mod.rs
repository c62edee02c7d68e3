//! # Survey catalogue ingestion
//!
//! Readers for the externally-produced photometric catalogue of one tile,
//! dispatched on the configured file type:
//!
//! - `.fits` — binary-table HDU, selected by index ([`fits_reader`]),
//! - `.csv` — plain CSV with a header line ([`csv_reader`]).
//!
//! Any other extension is rejected with
//! [`AstrodiffError::UnsupportedFileType`] when the configuration is built,
//! **before** any file is opened. A file that does not match its declared
//! format is a fatal [`AstrodiffError::WrongCatalogueFormat`].
//!
//! Column names are configurable. RA, Dec and magnitude are required;
//! flags, class-star, FWHM and signal-to-noise are optional and feed the
//! quality selection only when configured.
pub mod csv_reader;
pub mod fits_reader;

use std::str::FromStr;

use camino::Utf8Path;

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::Degree;

/// Supported survey catalogue file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyFileType {
    Fits,
    Csv,
}

impl FromStr for SurveyFileType {
    type Err = AstrodiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ".fits" => Ok(SurveyFileType::Fits),
            ".csv" => Ok(SurveyFileType::Csv),
            other => Err(AstrodiffError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Column-name configuration of the survey catalogue.
///
/// The optional members mirror the optional CLI flags: when a name is
/// `None`, the corresponding quality filter is skipped with a warning.
#[derive(Debug, Clone)]
pub struct SurveyColumns {
    pub ra: String,
    pub dec: String,
    pub mag: String,
    pub flags: Option<String>,
    pub clstar: Option<String>,
    pub fwhm: Option<String>,
    pub sn: Option<String>,
}

impl Default for SurveyColumns {
    fn default() -> Self {
        SurveyColumns {
            ra: "RA".to_string(),
            dec: "DEC".to_string(),
            mag: "MAG_AUTO".to_string(),
            flags: None,
            clstar: None,
            fwhm: None,
            sn: None,
        }
    }
}

/// One survey source read from disk.
///
/// Required values that failed to parse are kept as NaN so they fall out of
/// the magnitude cut and the cross-match instead of aborting the tile.
#[derive(Debug, Clone)]
pub struct SurveyEntry {
    pub ra: Degree,
    pub dec: Degree,
    pub mag: f64,
    pub flags: Option<f64>,
    pub clstar: Option<f64>,
    pub fwhm: Option<f64>,
    pub sn: Option<f64>,
}

/// Read a survey catalogue, dispatching on the declared file type.
///
/// Arguments
/// ---------
/// * `path`: path to the catalogue file
/// * `filetype`: declared format; must already have been validated
/// * `hdu`: HDU index for FITS files (0 is the primary, 1 the first
///   extension), ignored for CSV
/// * `columns`: column-name configuration
///
/// Return
/// ------
/// * The catalogue rows, or a fatal error when the file does not match the
///   declared format
pub fn read_survey(
    path: &Utf8Path,
    filetype: SurveyFileType,
    hdu: usize,
    columns: &SurveyColumns,
) -> Result<Vec<SurveyEntry>, AstrodiffError> {
    match filetype {
        SurveyFileType::Fits => fits_reader::read_fits_catalogue(path, hdu, columns),
        SurveyFileType::Csv => csv_reader::read_csv_catalogue(path, columns),
    }
}
