//! # Gaia reference catalogue access
//!
//! High-level entry point for obtaining the astrometric reference catalogue
//! of one tile. The design emphasizes *idempotent caching*:
//!
//! 1. If the per-(release, tile) cache CSV exists under
//!    `<workdir>/gaia_<release>/<tile>.csv`, it is read back and the remote
//!    service is **not** contacted.
//! 2. Otherwise the tile is fetched from the remote cone-search service
//!    ([`vizier`]) and persisted to that cache path before being returned.
//!
//! Entries whose RA **and** Dec are both invalid are dropped at fetch time;
//! a coordinate that could not be parsed is stored as NaN and ignored later
//! by the cross-match.
//!
//! ## See also
//! ------------
//! * [`vizier`] – Remote cone-search query and TSV response parsing.
//! * [`crate::differencer`] – Consumer of the per-tile reference catalogue.
pub mod vizier;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::{Degree, MasPerYear};
use crate::env_state::AstrodiffEnv;
use crate::footprint::Tile;

/// One row of the Gaia reference catalogue.
///
/// Coordinates are J2000 degrees; proper motions are mas/yr and may be
/// absent for sources without a full astrometric solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaiaEntry {
    #[serde(rename = "RAJ2000")]
    pub raj2000: Degree,
    #[serde(rename = "DEJ2000")]
    pub dej2000: Degree,
    #[serde(rename = "pmRA")]
    pub pm_ra: Option<MasPerYear>,
    #[serde(rename = "pmDE")]
    pub pm_dec: Option<MasPerYear>,
    #[serde(rename = "Gmag")]
    pub g_mag: Option<f64>,
}

impl GaiaEntry {
    /// Summed absolute proper motion, NaN when either component is missing.
    pub fn abs_pm(&self) -> f64 {
        match (self.pm_ra, self.pm_dec) {
            (Some(pm_ra), Some(pm_dec)) => pm_ra.abs() + pm_dec.abs(),
            _ => f64::NAN,
        }
    }
}

/// Deterministic cache path for one (release, tile) pair.
pub fn cache_path(workdir: &Utf8Path, release: &str, tile_name: &str) -> Utf8PathBuf {
    workdir
        .join(format!("gaia_{release}"))
        .join(format!("{tile_name}.csv"))
}

/// Obtain the reference catalogue of a tile, from cache or remotely.
///
/// Arguments
/// ---------
/// * `env`: shared environment holding the HTTP client
/// * `workdir`: root of the cache tree
/// * `base_url`: root URL of the cone-search service
/// * `release`: catalogue release identifier as registered at the service
///   (e.g. "355" for Gaia DR3)
/// * `tile`: the tile whose center drives the cone query
/// * `radius`: search radius in degrees
///
/// Return
/// ------
/// * The catalogue entries within `radius` of the tile center. A transient
///   failure of the remote query propagates unretried.
pub fn load_or_fetch(
    env: &AstrodiffEnv,
    workdir: &Utf8Path,
    base_url: &str,
    release: &str,
    tile: &Tile,
    radius: Degree,
) -> Result<Vec<GaiaEntry>, AstrodiffError> {
    let path = cache_path(workdir, release, &tile.name);
    if path.is_file() {
        debug!(tile = %tile.name, path = %path, "reading gaia catalogue from cache");
        return read_cache(&path);
    }

    info!(tile = %tile.name, release, "querying remote gaia catalogue");
    let entries = vizier::cone_search(env, base_url, release, tile, radius)?;
    if entries.is_empty() {
        return Err(AstrodiffError::EmptyRemoteCatalogue(tile.name.clone()));
    }
    write_cache(&path, &entries)?;
    Ok(entries)
}

/// Read a cached per-tile catalogue CSV.
pub fn read_cache(path: &Utf8Path) -> Result<Vec<GaiaEntry>, AstrodiffError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        entries.push(record?);
    }
    Ok(entries)
}

/// Persist a per-tile catalogue to its cache path, creating directories as
/// needed. An already-existing directory is benign.
pub fn write_cache(path: &Utf8Path, entries: &[GaiaEntry]) -> Result<(), AstrodiffError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod gaia_cache_test {
    use super::*;

    fn entry(ra: f64, dec: f64) -> GaiaEntry {
        GaiaEntry {
            raj2000: ra,
            dej2000: dec,
            pm_ra: Some(1.5),
            pm_dec: None,
            g_mag: Some(17.2),
        }
    }

    #[test]
    fn cache_roundtrip_preserves_optional_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workdir = Utf8Path::from_path(dir.path()).expect("utf8 path");
        let path = cache_path(workdir, "355", "TILE-0001");

        write_cache(&path, &[entry(150.1, -33.4)]).expect("write cache");
        let back = read_cache(&path).expect("read cache");

        assert_eq!(back.len(), 1);
        assert_eq!(back[0].raj2000, 150.1);
        assert_eq!(back[0].pm_ra, Some(1.5));
        assert_eq!(back[0].pm_dec, None);
    }

    #[test]
    fn abs_pm_is_nan_without_full_solution() {
        assert!(entry(0.0, 0.0).abs_pm().is_nan());
        let full = GaiaEntry {
            pm_dec: Some(-2.5),
            ..entry(0.0, 0.0)
        };
        assert_eq!(full.abs_pm(), 4.0);
    }
}
