//! CSV reader for survey catalogues.
//!
//! The header line drives the column lookup. Required columns (RA, Dec,
//! magnitude) must be present; a configured optional column that is absent
//! from the file is an error, since the user explicitly asked for it.
use camino::Utf8Path;
use csv::StringRecord;

use crate::astrodiff_errors::AstrodiffError;

use super::{SurveyColumns, SurveyEntry};

/// Read a CSV survey catalogue.
///
/// Arguments
/// ---------
/// * `path`: path to the CSV file
/// * `columns`: column-name configuration
///
/// Return
/// ------
/// * The parsed rows; a file that cannot be read as CSV is reported as a
///   [`AstrodiffError::WrongCatalogueFormat`]
pub fn read_csv_catalogue(
    path: &Utf8Path,
    columns: &SurveyColumns,
) -> Result<Vec<SurveyEntry>, AstrodiffError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| wrong_format(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| wrong_format(e.to_string()))?
        .clone();

    let required = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AstrodiffError::MissingColumn(name.to_string()))
    };
    let optional = |name: &Option<String>| -> Result<Option<usize>, AstrodiffError> {
        match name {
            None => Ok(None),
            Some(n) => required(n).map(Some),
        }
    };

    let ra_idx = required(&columns.ra)?;
    let dec_idx = required(&columns.dec)?;
    let mag_idx = required(&columns.mag)?;
    let flags_idx = optional(&columns.flags)?;
    let clstar_idx = optional(&columns.clstar)?;
    let fwhm_idx = optional(&columns.fwhm)?;
    let sn_idx = optional(&columns.sn)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| wrong_format(e.to_string()))?;
        entries.push(SurveyEntry {
            ra: field(&record, ra_idx),
            dec: field(&record, dec_idx),
            mag: field(&record, mag_idx),
            flags: flags_idx.map(|i| field(&record, i)),
            clstar: clstar_idx.map(|i| field(&record, i)),
            fwhm: fwhm_idx.map(|i| field(&record, i)),
            sn: sn_idx.map(|i| field(&record, i)),
        });
    }
    Ok(entries)
}

fn field(record: &StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .and_then(|f| f.trim().parse().ok())
        .unwrap_or(f64::NAN)
}

fn wrong_format(reason: String) -> AstrodiffError {
    AstrodiffError::WrongCatalogueFormat {
        expected: "CSV".to_string(),
        reason,
    }
}

#[cfg(test)]
mod csv_reader_test {
    use super::*;
    use std::io::Write;

    fn write_catalogue(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp catalogue");
        file.write_all(content.as_bytes()).expect("write catalogue");
        file
    }

    #[test]
    fn reads_required_and_configured_columns() {
        let file = write_catalogue("RA,DEC,MAG_AUTO,FLAGS\n10.0,20.0,17.5,0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let columns = SurveyColumns {
            flags: Some("FLAGS".to_string()),
            ..SurveyColumns::default()
        };

        let entries = read_csv_catalogue(path, &columns).expect("read catalogue");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mag, 17.5);
        assert_eq!(entries[0].flags, Some(0.0));
        assert_eq!(entries[0].clstar, None);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let file = write_catalogue("RA,DEC\n10.0,20.0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let err = read_csv_catalogue(path, &SurveyColumns::default()).unwrap_err();
        assert!(matches!(err, AstrodiffError::MissingColumn(c) if c == "MAG_AUTO"));
    }

    #[test]
    fn unparseable_values_become_nan() {
        let file = write_catalogue("RA,DEC,MAG_AUTO\n10.0,20.0,not-a-number\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let entries = read_csv_catalogue(path, &SurveyColumns::default()).expect("read");
        assert!(entries[0].mag.is_nan());
    }
}
