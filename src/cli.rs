//! # Command line interface and run configuration
//!
//! [`Cli`] is the raw clap surface, one flag per knob of the original
//! pipeline; [`Config`] is the validated runtime configuration derived from
//! it. Validation happens **before** any file is touched: in particular an
//! unsupported `--filetype` value is rejected while building the
//! configuration, not when the first survey catalogue is opened.
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::Degree;
use crate::gaia::vizier::DEFAULT_BASE_URL;
use crate::survey::{SurveyColumns, SurveyFileType};

/// Calculate astrometric differences between a survey catalogue and Gaia.
#[derive(Parser, Debug, Clone)]
#[command(name = "astrodiff", version, about)]
pub struct Cli {
    /// List of tiles to be processed (one name per whitespace-separated entry)
    #[arg(short, long)]
    pub tiles: Utf8PathBuf,

    /// Footprint file containing the positions of the survey tiles
    #[arg(short, long)]
    pub footprint: Utf8PathBuf,

    /// Workdir path
    #[arg(short, long, default_value = ".")]
    pub workdir: Utf8PathBuf,

    /// Data directory holding the survey catalogues. Default is workdir
    #[arg(short, long)]
    pub datadir: Option<Utf8PathBuf>,

    /// Gaia catalogue number as registered at the remote service
    /// (345 = Gaia DR2, 355 = Gaia DR3)
    #[arg(short, long, default_value = "355")]
    pub gaia_dr: String,

    /// Prefix of the survey catalogue file name
    #[arg(short = 'p', long, default_value = "")]
    pub cat_name_prefix: String,

    /// Suffix of the survey catalogue file name
    #[arg(short = 's', long, default_value = "")]
    pub cat_name_suffix: String,

    /// HDU index of the table when the catalogue is FITS
    #[arg(short = 'c', long, default_value_t = 1)]
    pub hdu: usize,

    /// Column name of the RA in the survey catalogue
    #[arg(long, default_value = "RA")]
    pub racolumn: String,

    /// Column name of the DEC in the survey catalogue
    #[arg(long, default_value = "DEC")]
    pub deccolumn: String,

    /// Column name of the magnitude in the survey catalogue
    #[arg(short = 'm', long, default_value = "MAG_AUTO")]
    pub mag_column: String,

    /// Column name of the flags in the survey catalogue
    #[arg(long)]
    pub flags_column: Option<String>,

    /// Column name of the CLASS_STAR in the survey catalogue
    #[arg(long)]
    pub clstar_column: Option<String>,

    /// Column name of the FWHM in the survey catalogue
    #[arg(long)]
    pub fwhm_column: Option<String>,

    /// Column name of the signal-to-noise in the survey catalogue
    #[arg(long)]
    pub sn_column: Option<String>,

    /// Filetype of the survey catalogue (.fits or .csv)
    #[arg(long, default_value = ".fits")]
    pub filetype: String,

    /// Cone-search radius in degrees
    #[arg(short, long, default_value_t = 1.0)]
    pub angle: f64,

    /// Signal-to-noise limit used in the quality selection
    #[arg(long, default_value_t = 10.0)]
    pub sn_limit: f64,

    /// Output name used for the stacked results table
    #[arg(short, long, default_value = "survey_gaia_astrometry")]
    pub output: String,

    /// Save the diagnostic figure next to the stacked table
    #[arg(long)]
    pub savefig: bool,

    /// Draw density contours on the scatter panel
    #[arg(long)]
    pub contour: bool,

    /// Number of histogram bins used for very large samples
    #[arg(short, long, default_value_t = 1000)]
    pub bins: usize,

    /// Minimum half-range of the plot axes in arcseconds
    #[arg(short, long, default_value_t = 0.5)]
    pub limit: f64,

    /// Number of worker threads processing tiles
    #[arg(short = 'j', long, default_value_t = 8)]
    pub num_workers: usize,

    /// Root URL of the cone-search service
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub vizier_url: String,

    /// Print debug output
    #[arg(long)]
    pub debug: bool,

    /// Print progress output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated runtime configuration of one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    pub tiles: Utf8PathBuf,
    pub footprint: Utf8PathBuf,
    pub workdir: Utf8PathBuf,
    pub datadir: Utf8PathBuf,
    pub gaia_release: String,
    pub cat_name_prefix: String,
    pub cat_name_suffix: String,
    pub hdu: usize,
    pub columns: SurveyColumns,
    pub filetype: SurveyFileType,
    pub angle: Degree,
    pub sn_limit: f64,
    pub output: String,
    pub savefig: bool,
    pub contour: bool,
    pub bins: usize,
    pub limit: f64,
    pub num_workers: usize,
    pub vizier_url: String,
}

impl Config {
    /// Build and validate the configuration from the parsed CLI.
    ///
    /// The `--filetype` value is parsed here, so an unsupported extension
    /// fails before any catalogue file is read. A relative `--tiles` path is
    /// resolved against the workdir.
    pub fn from_cli(cli: Cli) -> Result<Self, AstrodiffError> {
        let filetype: SurveyFileType = cli.filetype.parse()?;
        let datadir = cli.datadir.unwrap_or_else(|| cli.workdir.clone());
        let tiles = if cli.tiles.is_relative() {
            cli.workdir.join(&cli.tiles)
        } else {
            cli.tiles
        };

        Ok(Config {
            tiles,
            footprint: cli.footprint,
            workdir: cli.workdir,
            datadir,
            gaia_release: cli.gaia_dr,
            cat_name_prefix: cli.cat_name_prefix,
            cat_name_suffix: cli.cat_name_suffix,
            hdu: cli.hdu,
            columns: SurveyColumns {
                ra: cli.racolumn,
                dec: cli.deccolumn,
                mag: cli.mag_column,
                flags: cli.flags_column,
                clstar: cli.clstar_column,
                fwhm: cli.fwhm_column,
                sn: cli.sn_column,
            },
            filetype,
            angle: cli.angle,
            sn_limit: cli.sn_limit,
            output: cli.output,
            savefig: cli.savefig,
            contour: cli.contour,
            bins: cli.bins,
            limit: cli.limit,
            num_workers: cli.num_workers,
            vizier_url: cli.vizier_url,
        })
    }

    /// Directory holding the per-tile result tables.
    pub fn results_dir(&self) -> Utf8PathBuf {
        self.workdir.join("results")
    }

    /// Per-tile result table path. Once written it is never recomputed.
    pub fn result_path(&self, tile_name: &str) -> Utf8PathBuf {
        self.results_dir()
            .join(format!("{tile_name}_gaia{}_diff.csv", self.gaia_release))
    }

    /// Path of the stacked results table.
    pub fn stacked_path(&self) -> Utf8PathBuf {
        self.workdir.join(format!("{}_stacked.csv", self.output))
    }

    /// Path of the survey catalogue of one tile:
    /// `<datadir>/<prefix><tile><suffix>`.
    pub fn survey_catalogue_path(&self, tile_name: &str) -> Utf8PathBuf {
        self.datadir.join(format!(
            "{}{}{}",
            self.cat_name_prefix, tile_name, self.cat_name_suffix
        ))
    }
}

/// Figure path derived from a table path (same stem, `.svg`).
pub fn figure_path(table: &Utf8Path) -> Utf8PathBuf {
    table.with_extension("svg")
}
