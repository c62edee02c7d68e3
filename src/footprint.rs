//! # Survey footprint and tile list
//!
//! Readers for the two small text tables driving a run:
//!
//! - the **footprint** table, one row per survey tile with columns `NAME`,
//!   `RA` (hours) and `DEC` (degrees), whitespace- or comma-delimited, with a
//!   header line;
//! - the **tile list**, a plain text file of tile names to process.
//!
//! Tile names are normalized on ingestion (underscores become hyphens) so
//! that list entries and footprint rows compare equal regardless of which
//! convention the producing survey pipeline used.
//!
//! ## Lookup semantics
//!
//! [`Footprint::resolve`] requires **exactly one** matching row. Zero matches
//! yield [`AstrodiffError::TileNotInFootprint`], several matches yield
//! [`AstrodiffError::AmbiguousTile`]; both abort the tile instead of silently
//! picking a row.
use std::fs;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use itertools::Itertools;

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::{Degree, DEG_PER_HOUR};

/// One survey pointing: a name and its center coordinate.
///
/// The right ascension is stored in degrees; the footprint file carries it
/// in hours and the conversion happens at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub name: String,
    pub ra: Degree,
    pub dec: Degree,
}

/// The survey footprint: every known tile center, immutable for the run.
#[derive(Debug, Clone)]
pub struct Footprint {
    tiles: Vec<Tile>,
}

/// Replace underscores by hyphens in a tile name.
pub fn normalize_tile_name(name: &str) -> String {
    name.replace('_', "-")
}

impl Footprint {
    /// Read the footprint table from disk.
    ///
    /// Arguments
    /// ---------
    /// * `path`: path to the footprint file. The first non-comment line must
    ///   be a header naming at least `NAME`, `RA` and `DEC` (any order,
    ///   case-insensitive). Fields are separated by commas or whitespace.
    ///
    /// Return
    /// ------
    /// * The parsed footprint, or [`AstrodiffError::FootprintNotFound`] if the
    ///   file does not exist (the binary maps this to exit code 1).
    pub fn from_file(path: &Utf8Path) -> Result<Self, AstrodiffError> {
        if !path.is_file() {
            return Err(AstrodiffError::FootprintNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(fs::File::open(path)?);

        let mut header: Option<(usize, usize, usize)> = None;
        let mut tiles = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields = split_fields(trimmed);
            match header {
                None => {
                    let find = |name: &str| {
                        fields
                            .iter()
                            .position(|f| f.eq_ignore_ascii_case(name))
                            .ok_or_else(|| {
                                AstrodiffError::InvalidFootprintRow(format!(
                                    "header is missing column {name}: '{trimmed}'"
                                ))
                            })
                    };
                    header = Some((find("NAME")?, find("RA")?, find("DEC")?));
                }
                Some((name_idx, ra_idx, dec_idx)) => {
                    let field = |idx: usize| {
                        fields.get(idx).copied().ok_or_else(|| {
                            AstrodiffError::InvalidFootprintRow(trimmed.to_string())
                        })
                    };
                    let ra_hours: f64 = field(ra_idx)?.parse().map_err(|_| {
                        AstrodiffError::InvalidFootprintRow(trimmed.to_string())
                    })?;
                    let dec: f64 = field(dec_idx)?.parse().map_err(|_| {
                        AstrodiffError::InvalidFootprintRow(trimmed.to_string())
                    })?;
                    tiles.push(Tile {
                        name: normalize_tile_name(field(name_idx)?),
                        ra: ra_hours * DEG_PER_HOUR,
                        dec,
                    });
                }
            }
        }

        Ok(Footprint { tiles })
    }

    /// Resolve a tile center by exact (normalized) name.
    ///
    /// Return
    /// ------
    /// * The unique matching tile, an error on zero or multiple matches.
    pub fn resolve(&self, name: &str) -> Result<&Tile, AstrodiffError> {
        let wanted = normalize_tile_name(name);
        let mut matches = self.tiles.iter().filter(|t| t.name == wanted);
        match (matches.next(), matches.next()) {
            (Some(tile), None) => Ok(tile),
            (None, _) => Err(AstrodiffError::TileNotInFootprint(wanted)),
            (Some(_), Some(_)) => {
                let count = self.tiles.iter().filter(|t| t.name == wanted).count();
                Err(AstrodiffError::AmbiguousTile(wanted, count))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

/// Read the tile list: whitespace-separated names, one or more per line.
///
/// Names are normalized the same way as the footprint rows and duplicates
/// are dropped, first occurrence wins.
pub fn read_tile_list(path: &Utf8Path) -> Result<Vec<String>, AstrodiffError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .split_whitespace()
        .map(normalize_tile_name)
        .unique()
        .collect())
}

fn split_fields(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

#[cfg(test)]
mod footprint_test {
    use super::*;
    use std::io::Write;

    fn write_footprint(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp footprint");
        file.write_all(content.as_bytes()).expect("write footprint");
        file
    }

    #[test]
    fn parses_whitespace_table_and_converts_ra_hours() {
        let file = write_footprint("NAME RA DEC\nSTRIPE82_0001 1.5 -35.0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let footprint = Footprint::from_file(path).expect("parse footprint");

        let tile = footprint.resolve("STRIPE82-0001").expect("resolve tile");
        assert_eq!(tile.ra, 22.5);
        assert_eq!(tile.dec, -35.0);
    }

    #[test]
    fn underscores_in_lookup_names_are_normalized() {
        let file = write_footprint("NAME,RA,DEC\nSTRIPE82-0001,1.0,0.0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let footprint = Footprint::from_file(path).expect("parse footprint");
        assert!(footprint.resolve("STRIPE82_0001").is_ok());
    }

    #[test]
    fn missing_tile_fails_loudly() {
        let file = write_footprint("NAME RA DEC\nTILE-A 1.0 0.0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let footprint = Footprint::from_file(path).expect("parse footprint");
        assert!(matches!(
            footprint.resolve("TILE-B"),
            Err(AstrodiffError::TileNotInFootprint(_))
        ));
    }

    #[test]
    fn duplicate_tile_fails_loudly() {
        let file = write_footprint("NAME RA DEC\nTILE-A 1.0 0.0\nTILE-A 2.0 1.0\n");
        let path = Utf8Path::from_path(file.path()).expect("utf8 path");
        let footprint = Footprint::from_file(path).expect("parse footprint");
        assert!(matches!(
            footprint.resolve("TILE-A"),
            Err(AstrodiffError::AmbiguousTile(_, 2))
        ));
    }

    #[test]
    fn missing_footprint_file_is_a_dedicated_error() {
        let result = Footprint::from_file(Utf8Path::new("/nonexistent/footprint.csv"));
        assert!(matches!(
            result,
            Err(AstrodiffError::FootprintNotFound(_))
        ));
    }
}
