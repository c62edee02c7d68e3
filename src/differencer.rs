//! # Per-tile astrometric differencer
//!
//! The only non-trivial stage of the pipeline. For one tile it walks the
//! state machine
//!
//! ```text
//! PENDING → (cache check) → MATCHED → FILTERED → OUTLIER-TRIMMED → WRITTEN
//! ```
//!
//! or short-circuits to `SKIPPED` when the per-tile result table already
//! exists: a written tile is never recomputed and never triggers a remote
//! query again.
//!
//! ## Stages
//! -----------------
//! 1. Resolve the tile center from the footprint (exactly one row, or fail).
//! 2. Obtain the reference catalogue, cache first ([`crate::gaia`]).
//! 3. Load the survey catalogue ([`crate::survey`]).
//! 4. Nearest-neighbour match within 5 arcsec ([`crate::crossmatch`]).
//! 5. Quality selection ([`passes_quality`]): the magnitude window is always
//!    applied; flags, class-star, FWHM and S/N only when their column is
//!    configured, otherwise that stage is skipped with a warning.
//! 6. Proper-motion outlier trim ([`trim_proper_motion_outliers`]): entries
//!    with non-finite summed proper motion are masked, the 95th percentile
//!    is computed over the valid ones, and only valid entries strictly below
//!    the cutoff survive.
//! 7. Difference computation ([`compute_difference`]): declination-corrected
//!    RA offset and plain Dec offset, both in arcseconds.
//! 8. One CSV row per surviving pair.
//!
//! ## See also
//! ------------
//! * [`crate::runner`] – Worker pool driving this per tile.
//! * [`crate::stacking`] – Concatenation of the per-tile outputs.
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::astrodiff_errors::AstrodiffError;
use crate::cli::Config;
use crate::constants::{
    ArcSec, Degree, ARCSEC_PER_DEG, CLASS_STAR_MIN, FWHM_MAX_ARCSEC, MAG_BRIGHT_LIMIT,
    MAG_FAINT_LIMIT, MATCH_RADIUS_ARCSEC, PM_OUTLIER_PERCENTILE, RADEG,
};
use crate::crossmatch::match_catalogues;
use crate::env_state::AstrodiffEnv;
use crate::footprint::Footprint;
use crate::gaia::{self, GaiaEntry};
use crate::stats;
use crate::survey::{self, SurveyColumns, SurveyEntry};

/// Thresholds of the quality selection and the outlier trim.
///
/// Built with a fluent builder; every threshold defaults to the pipeline
/// constant and only the signal-to-noise limit is commonly overridden:
///
/// ```rust
/// use astrodiff::differencer::SelectionParams;
///
/// let params = SelectionParams::builder().sn_limit(5.0).build();
/// assert_eq!(params.mag_faint, 19.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionParams {
    /// Bright edge of the magnitude window (exclusive)
    pub mag_bright: f64,
    /// Faint edge of the magnitude window (exclusive)
    pub mag_faint: f64,
    /// Minimum CLASS_STAR value (exclusive)
    pub clstar_min: f64,
    /// Maximum FWHM in arcseconds (exclusive)
    pub fwhm_max_arcsec: ArcSec,
    /// Minimum signal-to-noise (exclusive)
    pub sn_limit: f64,
    /// Percentile of the summed proper motion used as outlier cutoff
    pub pm_percentile: f64,
}

impl Default for SelectionParams {
    fn default() -> Self {
        SelectionParams {
            mag_bright: MAG_BRIGHT_LIMIT,
            mag_faint: MAG_FAINT_LIMIT,
            clstar_min: CLASS_STAR_MIN,
            fwhm_max_arcsec: FWHM_MAX_ARCSEC,
            sn_limit: 10.0,
            pm_percentile: PM_OUTLIER_PERCENTILE,
        }
    }
}

impl SelectionParams {
    pub fn builder() -> SelectionParamsBuilder {
        SelectionParamsBuilder::new()
    }
}

/// Fluent builder for [`SelectionParams`].
#[derive(Debug, Clone, Default)]
pub struct SelectionParamsBuilder {
    params: SelectionParams,
}

impl SelectionParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mag_bright(mut self, v: f64) -> Self {
        self.params.mag_bright = v;
        self
    }

    pub fn mag_faint(mut self, v: f64) -> Self {
        self.params.mag_faint = v;
        self
    }

    pub fn clstar_min(mut self, v: f64) -> Self {
        self.params.clstar_min = v;
        self
    }

    pub fn fwhm_max_arcsec(mut self, v: ArcSec) -> Self {
        self.params.fwhm_max_arcsec = v;
        self
    }

    pub fn sn_limit(mut self, v: f64) -> Self {
        self.params.sn_limit = v;
        self
    }

    pub fn pm_percentile(mut self, v: f64) -> Self {
        self.params.pm_percentile = v;
        self
    }

    pub fn build(self) -> SelectionParams {
        self.params
    }
}

/// One row of the per-tile output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferenceRecord {
    /// Survey right ascension \[deg\]
    #[serde(rename = "RA")]
    pub ra: Degree,
    /// Survey declination \[deg\]
    #[serde(rename = "DEC")]
    pub dec: Degree,
    /// Reference right ascension \[deg\]
    #[serde(rename = "RAJ2000")]
    pub raj2000: Degree,
    /// Reference declination \[deg\]
    #[serde(rename = "DEJ2000")]
    pub dej2000: Degree,
    /// Declination-corrected RA offset \[arcsec\]
    pub radiff: ArcSec,
    /// Dec offset \[arcsec\]
    pub dediff: ArcSec,
    /// Summed absolute proper motion \[mas/yr\]
    pub abspm: f64,
}

/// Outcome of one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    /// The result table already existed; nothing was recomputed.
    Skipped,
    /// A fresh result table was written with this many rows.
    Written { rows: usize },
}

/// Quality selection of one matched survey source.
///
/// The magnitude window is always applied. Each optional criterion is
/// applied only when its column was configured (the value is `Some`); an
/// unconfigured criterion never rejects a source. NaN values fail every
/// comparison, so a configured column with an unparseable cell rejects the
/// row, mirroring masked-array semantics upstream.
pub fn passes_quality(entry: &SurveyEntry, params: &SelectionParams) -> bool {
    let mut keep = entry.mag > params.mag_bright && entry.mag < params.mag_faint;
    if let Some(flags) = entry.flags {
        keep &= flags == 0.0;
    }
    if let Some(clstar) = entry.clstar {
        keep &= clstar > params.clstar_min;
    }
    if let Some(fwhm) = entry.fwhm {
        // survey FWHM column is in degrees
        keep &= fwhm * ARCSEC_PER_DEG < params.fwhm_max_arcsec;
    }
    if let Some(sn) = entry.sn {
        keep &= sn > params.sn_limit;
    }
    keep
}

/// Mask of entries surviving the proper-motion outlier trim.
///
/// Non-finite sums are masked out; the percentile cutoff is computed over
/// the finite entries only; survivors are finite AND strictly below the
/// cutoff. An all-invalid input keeps nothing.
pub fn trim_proper_motion_outliers(abspm: &[f64], percentile: f64) -> Vec<bool> {
    let finite: Vec<f64> = abspm.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return vec![false; abspm.len()];
    }
    let cutoff = stats::percentile(&finite, percentile);
    abspm
        .iter()
        .map(|v| v.is_finite() && *v < cutoff)
        .collect()
}

/// Astrometric offsets of one matched pair, in arcseconds.
///
/// The RA offset carries the cosine-declination correction evaluated at the
/// **reference** declination:
/// `radiff = 3600·(ra_survey − ra_ref)·cos(dec_ref)`,
/// `dediff = 3600·(dec_survey − dec_ref)`.
pub fn compute_difference(survey: &SurveyEntry, gaia: &GaiaEntry) -> DifferenceRecord {
    let dediff = ARCSEC_PER_DEG * (survey.dec - gaia.dej2000);
    let radiff = ARCSEC_PER_DEG * (survey.ra - gaia.raj2000) * (gaia.dej2000 * RADEG).cos();
    DifferenceRecord {
        ra: survey.ra,
        dec: survey.dec,
        raj2000: gaia.raj2000,
        dej2000: gaia.dej2000,
        radiff,
        dediff,
        abspm: gaia.abs_pm(),
    }
}

/// Run the full differencing pipeline for one tile.
///
/// Arguments
/// ---------
/// * `env`: shared environment holding the HTTP client
/// * `config`: validated run configuration
/// * `footprint`: the survey footprint, loaded once per run
/// * `tile_name`: normalized name of the tile to process
///
/// Return
/// ------
/// * [`TileOutcome::Skipped`] when the output already exists, otherwise
///   [`TileOutcome::Written`] with the number of surviving pairs
pub fn process_tile(
    env: &AstrodiffEnv,
    config: &Config,
    footprint: &Footprint,
    tile_name: &str,
) -> Result<TileOutcome, AstrodiffError> {
    let out_path = config.result_path(tile_name);
    if out_path.is_file() {
        info!(tile = tile_name, "result table already exists, skipping");
        return Ok(TileOutcome::Skipped);
    }

    let tile = footprint.resolve(tile_name)?;
    let gaia_entries = gaia::load_or_fetch(
        env,
        &config.workdir,
        &config.vizier_url,
        &config.gaia_release,
        tile,
        config.angle,
    )?;

    let survey_path = config.survey_catalogue_path(tile_name);
    let survey_entries =
        survey::read_survey(&survey_path, config.filetype, config.hdu, &config.columns)?;

    warn_unconfigured_columns(&config.columns);
    let params = SelectionParams::builder().sn_limit(config.sn_limit).build();

    let pairs = match_catalogues(&survey_entries, &gaia_entries, MATCH_RADIUS_ARCSEC);
    let selected: Vec<_> = pairs
        .into_iter()
        .filter(|p| passes_quality(&survey_entries[p.survey_idx], &params))
        .collect();

    let abspm: Vec<f64> = selected
        .iter()
        .map(|p| gaia_entries[p.gaia_idx].abs_pm())
        .collect();
    let keep = trim_proper_motion_outliers(&abspm, params.pm_percentile);

    let records: Vec<DifferenceRecord> = selected
        .iter()
        .zip(&keep)
        .filter(|(_, keep)| **keep)
        .map(|(p, _)| {
            compute_difference(&survey_entries[p.survey_idx], &gaia_entries[p.gaia_idx])
        })
        .collect();

    std::fs::create_dir_all(config.results_dir())?;
    let mut writer = csv::Writer::from_path(&out_path)?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(tile = tile_name, rows = records.len(), path = %out_path, "result table written");

    Ok(TileOutcome::Written {
        rows: records.len(),
    })
}

fn warn_unconfigured_columns(columns: &SurveyColumns) {
    if columns.flags.is_none() {
        warn!("FLAGS column not configured, skipping flags selection");
    }
    if columns.clstar.is_none() {
        warn!("CLASS_STAR column not configured, skipping star-galaxy selection");
    }
    if columns.fwhm.is_none() {
        warn!("FWHM column not configured, skipping seeing selection");
    }
    if columns.sn.is_none() {
        warn!("S/N column not configured, skipping signal-to-noise selection");
    }
}
