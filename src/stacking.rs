//! # Stacking of per-tile result tables
//!
//! Row-wise concatenation of every per-tile difference table into one
//! stacked CSV. No deduplication is performed; tiles are stacked in path
//! order so repeated runs produce identical output. The stacked table is
//! written only when absent, like the per-tile tables. An empty input set
//! is a loud error rather than a crash deep inside the writer.
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::astrodiff_errors::AstrodiffError;
use crate::differencer::DifferenceRecord;

/// Collect the per-tile result tables under `results_dir`, sorted.
///
/// Only files matching the `*_diff.csv` naming of the differencer are
/// considered.
pub fn collect_result_files(results_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, AstrodiffError> {
    let mut files = Vec::new();
    if results_dir.is_dir() {
        for entry in results_dir.read_dir_utf8()? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.as_str().ends_with("_diff.csv") {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Stack the per-tile tables into `stacked_path`.
///
/// Arguments
/// ---------
/// * `results_dir`: directory holding the per-tile tables
/// * `stacked_path`: destination of the combined table
///
/// Return
/// ------
/// * The number of stacked rows. An existing destination is left untouched
///   and reported with the row count it already contains.
pub fn stack_results(
    results_dir: &Utf8Path,
    stacked_path: &Utf8Path,
) -> Result<usize, AstrodiffError> {
    if stacked_path.is_file() {
        info!(path = %stacked_path, "stacked table already exists, skipping");
        return read_stacked(stacked_path).map(|records| records.len());
    }

    let files = collect_result_files(results_dir)?;
    if files.is_empty() {
        return Err(AstrodiffError::EmptyStackInput(results_dir.to_path_buf()));
    }

    let mut writer = csv::Writer::from_path(stacked_path)?;
    let mut rows = 0usize;
    for file in &files {
        debug!(path = %file, "stacking table");
        let mut reader = csv::Reader::from_path(file)?;
        for record in reader.deserialize::<DifferenceRecord>() {
            writer.serialize(record?)?;
            rows += 1;
        }
    }
    writer.flush()?;
    info!(path = %stacked_path, rows, tables = files.len(), "stacked table written");
    Ok(rows)
}

/// Read a stacked table back into memory.
pub fn read_stacked(path: &Utf8Path) -> Result<Vec<DifferenceRecord>, AstrodiffError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

#[cfg(test)]
mod stacking_test {
    use super::*;

    fn record(radiff: f64) -> DifferenceRecord {
        DifferenceRecord {
            ra: 10.0,
            dec: 20.0,
            raj2000: 10.0,
            dej2000: 20.0,
            radiff,
            dediff: 0.1,
            abspm: 2.0,
        }
    }

    fn write_table(path: &Utf8Path, records: &[DifferenceRecord]) {
        let mut writer = csv::Writer::from_path(path).expect("writer");
        for r in records {
            writer.serialize(r).expect("serialize");
        }
        writer.flush().expect("flush");
    }

    #[test]
    fn stacks_all_tables_row_wise() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 path");
        write_table(&root.join("A_gaia355_diff.csv"), &[record(0.1), record(0.2)]);
        write_table(&root.join("B_gaia355_diff.csv"), &[record(0.3)]);

        let stacked = root.join("stacked.csv");
        let rows = stack_results(root, &stacked).expect("stack");
        assert_eq!(rows, 3);

        let back = read_stacked(&stacked).expect("read stacked");
        assert_eq!(back.len(), 3);
        // path order: A rows first
        assert_eq!(back[0].radiff, 0.1);
        assert_eq!(back[2].radiff, 0.3);
    }

    #[test]
    fn empty_input_fails_loudly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 path");
        let err = stack_results(root, &root.join("stacked.csv")).unwrap_err();
        assert!(matches!(err, AstrodiffError::EmptyStackInput(_)));
    }

    #[test]
    fn existing_stacked_table_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 path");
        let stacked = root.join("stacked.csv");
        write_table(&stacked, &[record(9.9)]);
        // a result table that would change the output if re-stacked
        write_table(&root.join("A_gaia355_diff.csv"), &[record(0.1)]);

        let rows = stack_results(root, &stacked).expect("stack");
        assert_eq!(rows, 1);
        let back = read_stacked(&stacked).expect("read stacked");
        assert_eq!(back[0].radiff, 9.9);
    }
}
