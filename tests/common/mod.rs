//! Shared fixtures: synthetic FITS catalogues and small on-disk run trees.
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

fn card(key: &str, value: &str) -> [u8; CARD_SIZE] {
    let mut out = [b' '; CARD_SIZE];
    let text = format!("{key:<8}= {value:>20}");
    out[..text.len()].copy_from_slice(text.as_bytes());
    out
}

fn bare_card(key: &str) -> [u8; CARD_SIZE] {
    let mut out = [b' '; CARD_SIZE];
    out[..key.len()].copy_from_slice(key.as_bytes());
    out
}

fn pad_to_block(bytes: &mut Vec<u8>) {
    while bytes.len() % BLOCK_SIZE != 0 {
        bytes.push(b' ');
    }
}

/// Build a FITS file with an empty primary HDU and one BINTABLE extension
/// holding the named double-precision columns, one `f64` per cell.
pub fn fits_catalogue(columns: &[(&str, Vec<f64>)]) -> Vec<u8> {
    let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    assert!(columns.iter().all(|(_, v)| v.len() == rows));

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&card("SIMPLE", "T"));
    bytes.extend_from_slice(&card("BITPIX", "8"));
    bytes.extend_from_slice(&card("NAXIS", "0"));
    bytes.extend_from_slice(&bare_card("END"));
    pad_to_block(&mut bytes);

    bytes.extend_from_slice(&card("XTENSION", "'BINTABLE'"));
    bytes.extend_from_slice(&card("BITPIX", "8"));
    bytes.extend_from_slice(&card("NAXIS", "2"));
    bytes.extend_from_slice(&card("NAXIS1", &(8 * columns.len()).to_string()));
    bytes.extend_from_slice(&card("NAXIS2", &rows.to_string()));
    bytes.extend_from_slice(&card("PCOUNT", "0"));
    bytes.extend_from_slice(&card("GCOUNT", "1"));
    bytes.extend_from_slice(&card("TFIELDS", &columns.len().to_string()));
    for (n, (name, _)) in columns.iter().enumerate() {
        bytes.extend_from_slice(&card(&format!("TTYPE{}", n + 1), &format!("'{name}'")));
        bytes.extend_from_slice(&card(&format!("TFORM{}", n + 1), "'D'"));
    }
    bytes.extend_from_slice(&bare_card("END"));
    pad_to_block(&mut bytes);

    for row in 0..rows {
        for (_, values) in columns {
            bytes.extend_from_slice(&values[row].to_be_bytes());
        }
    }
    pad_to_block(&mut bytes);
    bytes
}

/// Write a footprint table with one tile at the given center (RA in hours).
pub fn write_footprint(dir: &Utf8Path, tile: &str, ra_hours: f64, dec: f64) -> Utf8PathBuf {
    let path = dir.join("footprint.csv");
    std::fs::write(&path, format!("NAME,RA,DEC\n{tile},{ra_hours},{dec}\n")).expect("footprint");
    path
}

/// Write a one-tile tile list.
pub fn write_tile_list(dir: &Utf8Path, tiles: &[&str]) -> Utf8PathBuf {
    let path = dir.join("tiles.txt");
    std::fs::write(&path, tiles.join("\n")).expect("tile list");
    path
}

/// Seed the per-tile Gaia cache so no remote query is needed.
///
/// Rows are (RAJ2000, DEJ2000, pmRA, pmDE).
pub fn seed_gaia_cache(workdir: &Utf8Path, release: &str, tile: &str, rows: &[(f64, f64, f64, f64)]) {
    let dir = workdir.join(format!("gaia_{release}"));
    std::fs::create_dir_all(&dir).expect("cache dir");
    let mut file = std::fs::File::create(dir.join(format!("{tile}.csv"))).expect("cache file");
    writeln!(file, "RAJ2000,DEJ2000,pmRA,pmDE,Gmag").expect("header");
    for (ra, dec, pm_ra, pm_dec) in rows {
        writeln!(file, "{ra},{dec},{pm_ra},{pm_dec},17.0").expect("row");
    }
}

/// Write a CSV survey catalogue with the default column names.
///
/// Rows are (RA, DEC, MAG_AUTO).
pub fn write_csv_survey(path: &Utf8Path, rows: &[(f64, f64, f64)]) {
    let mut file = std::fs::File::create(path).expect("survey file");
    writeln!(file, "RA,DEC,MAG_AUTO").expect("header");
    for (ra, dec, mag) in rows {
        writeln!(file, "{ra},{dec},{mag}").expect("row");
    }
}
