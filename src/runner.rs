//! # Pipeline driver
//!
//! Reads the tile list and the footprint, then processes every tile on a
//! fixed-size worker pool. Tiles are independent, so the pool simply maps
//! [`crate::differencer::process_tile`] over the list; a failing tile is
//! logged and counted, never fatal for the run.
//!
//! ## Concurrent runs
//! ------------------
//! Several processes may be started on the same workdir with different tile
//! lists. Ownership of a tile is taken by atomically creating a claim file
//! next to its result table (`create_new` semantics): whoever creates the
//! claim processes the tile, everyone else moves on. The claim is removed
//! once the result table is written, so a later run finding a stale claim
//! without a result table reports the tile as still owned elsewhere.
//!
//! After all tiles are done the per-tile tables are stacked and the
//! diagnostic figure is rendered from the stacked table.
use std::fs::OpenOptions;
use std::io::ErrorKind;

use camino::Utf8PathBuf;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::astrodiff_errors::AstrodiffError;
use crate::cli::{figure_path, Config};
use crate::differencer::{process_tile, TileOutcome};
use crate::env_state::AstrodiffEnv;
use crate::footprint::{read_tile_list, Footprint};
use crate::plot::{render_figure, PlotOptions};
use crate::stacking::{read_stacked, stack_results};

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tiles for which a fresh result table was written
    pub written: usize,
    /// Tiles skipped because their result already existed or is owned by
    /// another run
    pub skipped: usize,
    /// Tiles that failed
    pub failed: usize,
    /// Rows in the stacked table
    pub stacked_rows: usize,
}

enum ClaimState {
    Acquired(Utf8PathBuf),
    AlreadyDone,
    OwnedElsewhere,
}

/// Try to take ownership of one tile.
fn claim_tile(config: &Config, tile_name: &str) -> Result<ClaimState, AstrodiffError> {
    let result_path = config.result_path(tile_name);
    if result_path.is_file() {
        return Ok(ClaimState::AlreadyDone);
    }
    let claim_path = Utf8PathBuf::from(format!("{result_path}.claim"));
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&claim_path)
    {
        Ok(_) => Ok(ClaimState::Acquired(claim_path)),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            if result_path.is_file() {
                Ok(ClaimState::AlreadyDone)
            } else {
                Ok(ClaimState::OwnedElsewhere)
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn process_claimed_tile(
    env: &AstrodiffEnv,
    config: &Config,
    footprint: &Footprint,
    tile_name: &str,
) -> Result<TileOutcome, AstrodiffError> {
    match claim_tile(config, tile_name)? {
        ClaimState::AlreadyDone => {
            info!(tile = tile_name, "result table already exists, skipping");
            Ok(TileOutcome::Skipped)
        }
        ClaimState::OwnedElsewhere => {
            warn!(tile = tile_name, "tile is claimed by another run, skipping");
            Ok(TileOutcome::Skipped)
        }
        ClaimState::Acquired(claim_path) => {
            let outcome = process_tile(env, config, footprint, tile_name);
            if let Err(err) = std::fs::remove_file(&claim_path) {
                warn!(tile = tile_name, %err, "could not remove claim file");
            }
            outcome
        }
    }
}

/// Run the whole pipeline: per-tile differencing, stacking, figure.
///
/// Arguments
/// ---------
/// * `env`: shared environment holding the HTTP client
/// * `config`: validated run configuration
///
/// Return
/// ------
/// * The run tally. Per-tile failures are counted, not propagated; only
///   setup errors (tile list, footprint, pool, stacking) abort the run.
pub fn run(env: &AstrodiffEnv, config: &Config) -> Result<RunSummary, AstrodiffError> {
    let tiles = read_tile_list(&config.tiles)?;
    let footprint = Footprint::from_file(&config.footprint)?;
    info!(
        tiles = tiles.len(),
        workers = config.num_workers,
        "starting pipeline"
    );

    std::fs::create_dir_all(config.results_dir())?;

    let progress = ProgressBar::new(tiles.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles",
        )
        .expect("progress bar template"),
    );
    progress.set_message("differencing");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers)
        .build()?;

    let outcomes: Vec<Result<TileOutcome, AstrodiffError>> = pool.install(|| {
        tiles
            .par_iter()
            .map(|tile_name| {
                let outcome = process_claimed_tile(env, config, &footprint, tile_name);
                progress.inc(1);
                outcome
            })
            .collect()
    });
    progress.finish_with_message("differencing done");

    let mut summary = RunSummary::default();
    for (tile_name, outcome) in tiles.iter().zip(outcomes) {
        match outcome {
            Ok(TileOutcome::Written { .. }) => summary.written += 1,
            Ok(TileOutcome::Skipped) => summary.skipped += 1,
            Err(err) => {
                error!(tile = tile_name.as_str(), %err, "tile failed");
                summary.failed += 1;
            }
        }
    }

    let stacked_path = config.stacked_path();
    summary.stacked_rows = stack_results(&config.results_dir(), &stacked_path)?;

    let records = read_stacked(&stacked_path)?;
    let options = PlotOptions {
        bins: config.bins,
        limit: config.limit,
        contour: config.contour,
        ..PlotOptions::default()
    };
    match render_figure(&records, &options) {
        Ok((svg, figure_stats)) => {
            info!(n = figure_stats.n, "figure rendered");
            if config.savefig {
                let path = figure_path(&stacked_path);
                std::fs::write(&path, svg)?;
                info!(path = %path, "figure saved");
            }
        }
        Err(AstrodiffError::EmptyPlotInput) => {
            warn!("no rows within the plot restriction, figure not rendered");
        }
        Err(err) => return Err(err),
    }

    info!(
        written = summary.written,
        skipped = summary.skipped,
        failed = summary.failed,
        stacked_rows = summary.stacked_rows,
        "pipeline finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod runner_test {
    use super::*;
    use camino::Utf8Path;

    fn test_config(root: &Utf8Path) -> Config {
        use crate::cli::Cli;
        use clap::Parser;
        let cli = Cli::parse_from([
            "astrodiff",
            "--tiles",
            "tiles.txt",
            "--footprint",
            "footprint.csv",
            "--workdir",
            root.as_str(),
        ]);
        Config::from_cli(cli).expect("config")
    }

    #[test]
    fn claim_is_exclusive_until_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 path");
        let config = test_config(root);
        std::fs::create_dir_all(config.results_dir()).expect("results dir");

        let first = claim_tile(&config, "TILE-0001").expect("claim");
        let claim_path = match first {
            ClaimState::Acquired(path) => path,
            _ => panic!("first claim should be acquired"),
        };
        // no result table yet: the tile belongs to the first claimer
        assert!(matches!(
            claim_tile(&config, "TILE-0001").expect("claim"),
            ClaimState::OwnedElsewhere
        ));

        std::fs::write(config.result_path("TILE-0001"), "RA,DEC\n").expect("result");
        assert!(matches!(
            claim_tile(&config, "TILE-0001").expect("claim"),
            ClaimState::AlreadyDone
        ));

        std::fs::remove_file(claim_path).expect("remove claim");
        assert!(matches!(
            claim_tile(&config, "TILE-0001").expect("claim"),
            ClaimState::AlreadyDone
        ));
    }

    #[test]
    fn existing_result_is_never_reclaimed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8Path::from_path(dir.path()).expect("utf8 path");
        let config = test_config(root);
        std::fs::create_dir_all(config.results_dir()).expect("results dir");
        std::fs::write(config.result_path("TILE-0002"), "RA,DEC\n").expect("result");

        assert!(matches!(
            claim_tile(&config, "TILE-0002").expect("claim"),
            ClaimState::AlreadyDone
        ));
        // no claim file was left behind
        assert!(!Utf8PathBuf::from(format!("{}.claim", config.result_path("TILE-0002"))).is_file());
    }
}
