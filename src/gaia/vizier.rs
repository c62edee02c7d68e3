//! # VizieR cone-search client
//!
//! Builds the ASU TSV cone-search request for one tile and parses the
//! tab-separated response into [`GaiaEntry`] rows.
//!
//! The response format interleaves comment lines (`#`), a column-name line,
//! a units line and a dash ruler before the data block. Parsing is driven by
//! the column-name line; any later line whose RA **and** Dec fields both
//! fail to parse (units line, ruler, truncated row) is dropped, which is
//! exactly the invalid-coordinate policy of the pipeline.
use tracing::debug;

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::{
    Degree, GAIA_DEC_COLUMN, GAIA_GMAG_COLUMN, GAIA_PMDEC_COLUMN, GAIA_PMRA_COLUMN,
    GAIA_RA_COLUMN,
};
use crate::env_state::AstrodiffEnv;
use crate::footprint::Tile;

use super::GaiaEntry;

/// Default root URL of the VizieR service.
pub const DEFAULT_BASE_URL: &str = "https://vizier.cds.unistra.fr";

/// Query the cone-search service around a tile center.
///
/// Arguments
/// ---------
/// * `env`: shared environment holding the HTTP client
/// * `base_url`: service root, overridable for tests
/// * `release`: catalogue release identifier (`I/<release>` at the service)
/// * `tile`: tile whose center coordinate is queried
/// * `radius`: search radius in degrees
///
/// Return
/// ------
/// * The parsed entries; rows with both coordinates invalid are dropped
pub fn cone_search(
    env: &AstrodiffEnv,
    base_url: &str,
    release: &str,
    tile: &Tile,
    radius: Degree,
) -> Result<Vec<GaiaEntry>, AstrodiffError> {
    let url = query_url(base_url, release, tile.ra, tile.dec, radius);
    debug!(url = %url, "vizier cone search");
    let body = env.get_from_url(&url)?;
    Ok(parse_tsv(&body))
}

/// Assemble the ASU TSV request URL.
pub fn query_url(
    base_url: &str,
    release: &str,
    ra: Degree,
    dec: Degree,
    radius: Degree,
) -> String {
    format!(
        "{base}/viz-bin/asu-tsv?-source=I/{release}&-c={ra:.6}{dec:+.6}&-c.rd={radius}&-out={cols}&-out.max=unlimited",
        base = base_url.trim_end_matches('/'),
        cols = [
            GAIA_RA_COLUMN,
            GAIA_DEC_COLUMN,
            GAIA_PMRA_COLUMN,
            GAIA_PMDEC_COLUMN,
            GAIA_GMAG_COLUMN,
        ]
        .join(",")
    )
}

/// Parse a TSV response body into catalogue entries.
///
/// The first non-comment line naming the RA column is taken as the header;
/// everything before it is ignored. Data rows keep NaN for a single
/// unparseable coordinate and are dropped only when **both** coordinates are
/// invalid.
pub fn parse_tsv(body: &str) -> Vec<GaiaEntry> {
    let mut columns: Option<TsvColumns> = None;
    let mut entries = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match &columns {
            None => {
                let fields: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
                if let Some(found) = TsvColumns::from_header(&fields) {
                    columns = Some(found);
                }
            }
            Some(cols) => {
                let fields: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
                let ra = parse_field(&fields, cols.ra);
                let dec = parse_field(&fields, cols.dec);
                if ra.is_nan() && dec.is_nan() {
                    continue;
                }
                entries.push(GaiaEntry {
                    raj2000: ra,
                    dej2000: dec,
                    pm_ra: parse_optional(&fields, cols.pm_ra),
                    pm_dec: parse_optional(&fields, cols.pm_dec),
                    g_mag: parse_optional(&fields, cols.g_mag),
                });
            }
        }
    }

    entries
}

struct TsvColumns {
    ra: usize,
    dec: usize,
    pm_ra: Option<usize>,
    pm_dec: Option<usize>,
    g_mag: Option<usize>,
}

impl TsvColumns {
    fn from_header(fields: &[&str]) -> Option<Self> {
        let position = |name: &str| fields.iter().position(|f| *f == name);
        Some(TsvColumns {
            ra: position(GAIA_RA_COLUMN)?,
            dec: position(GAIA_DEC_COLUMN)?,
            pm_ra: position(GAIA_PMRA_COLUMN),
            pm_dec: position(GAIA_PMDEC_COLUMN),
            g_mag: position(GAIA_GMAG_COLUMN),
        })
    }
}

fn parse_field(fields: &[&str], idx: usize) -> f64 {
    fields
        .get(idx)
        .and_then(|f| f.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_optional(fields: &[&str], idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| fields.get(i)).and_then(|f| f.parse().ok())
}

#[cfg(test)]
mod vizier_parse_test {
    use super::*;

    const BODY: &str = "\
#INFO queried catalogue I/355
RAJ2000\tDEJ2000\tpmRA\tpmDE\tGmag
deg\tdeg\tmas/yr\tmas/yr\tmag
-------\t-------\t-----\t-----\t-----
150.000100\t-33.500200\t1.2\t-3.4\t16.5
150.100000\t-33.400000\t\t\t18.1
\t\t5.0\t5.0\t12.0
";

    #[test]
    fn parses_data_rows_and_skips_decoration() {
        let entries = parse_tsv(BODY);
        // units line, ruler and the both-coordinates-invalid row are dropped
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].raj2000, 150.0001);
        assert_eq!(entries[0].pm_dec, Some(-3.4));
        assert_eq!(entries[1].pm_ra, None);
    }

    #[test]
    fn query_url_names_release_and_center() {
        let url = query_url("https://vizier.example/", "355", 150.5, -33.25, 1.0);
        assert!(url.contains("-source=I/355"));
        assert!(url.contains("-c=150.500000-33.250000"));
        assert!(url.contains("-c.rd=1"));
    }
}
