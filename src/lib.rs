//! # astrodiff
//!
//! Astrometric quality check of a wide-field survey against the Gaia
//! reference frame.
//!
//! For every survey tile the pipeline
//!
//! 1. resolves the tile center from the survey footprint,
//! 2. obtains the Gaia catalogue of the field, local cache first and a
//!    VizieR cone search otherwise,
//! 3. reads the survey catalogue (FITS binary table or CSV),
//! 4. matches both catalogues on the sky within 5 arcsec,
//! 5. applies the photometric quality selection and trims proper-motion
//!    outliers,
//! 6. writes one row of astrometric offsets per surviving pair.
//!
//! Per-tile tables are then stacked and summarized in a diagnostic figure.
//! Tiles run concurrently on a worker pool; a tile whose result table
//! already exists is never recomputed, so interrupted runs resume cheaply.
//!
//! ## Entry points
//! ---------------
//! * [`runner::run`] – the whole pipeline, as driven by the binary.
//! * [`differencer::process_tile`] – one tile, for finer-grained use.
//! * [`plot::render_figure`] – the diagnostic figure from a stacked table.

pub mod astrodiff_errors;
pub mod cli;
pub mod constants;
pub mod crossmatch;
pub mod differencer;
pub mod env_state;
pub mod footprint;
pub mod gaia;
pub mod plot;
pub mod runner;
pub mod stacking;
pub mod stats;
pub mod survey;
