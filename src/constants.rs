//! # Constants and type definitions for astrodiff
//!
//! This module centralizes the **angular conversion factors**, **selection
//! thresholds**, and **common type definitions** used throughout the crate.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians ↔ arcseconds)
//! - Hard thresholds of the cross-match and quality-selection pipeline
//! - Core type aliases used across the crate
//! - Default column names of the Gaia reference catalogue
//!
//! These definitions are used by all main modules, including the cross-match,
//! the per-tile differencer, and the plotter.

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Arcseconds per degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Hours of right ascension → degrees
pub const DEG_PER_HOUR: f64 = 15.0;

// -------------------------------------------------------------------------------------------------
// Pipeline thresholds
// -------------------------------------------------------------------------------------------------

/// Maximum angular separation accepted by the nearest-neighbour cross-match
pub const MATCH_RADIUS_ARCSEC: f64 = 5.0;

/// Bright magnitude cut of the quality selection (strictly brighter rejected)
pub const MAG_BRIGHT_LIMIT: f64 = 14.0;

/// Faint magnitude cut of the quality selection (strictly fainter rejected)
pub const MAG_FAINT_LIMIT: f64 = 19.0;

/// Minimum CLASS_STAR value for an object to be considered stellar
pub const CLASS_STAR_MIN: f64 = 0.95;

/// Maximum FWHM in arcseconds accepted by the quality selection
pub const FWHM_MAX_ARCSEC: f64 = 2.5;

/// Percentile of the summed absolute proper motion used as outlier cutoff
pub const PM_OUTLIER_PERCENTILE: f64 = 95.0;

/// Hard restriction applied by the plotter on both difference axes \[arcsec\]
pub const PLOT_DIFF_LIMIT_ARCSEC: f64 = 10.0;

/// Percentiles reported per axis by the plotter
pub const PLOT_PERCENTILES: [f64; 7] = [0.15, 2.5, 16.0, 50.0, 84.0, 97.5, 99.85];

/// Bin width of the marginal histograms \[arcsec\]
pub const HIST_BINWIDTH_ARCSEC: f64 = 0.05;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Proper motion in milliarcseconds per year
pub type MasPerYear = f64;

// -------------------------------------------------------------------------------------------------
// Gaia reference catalogue columns
// -------------------------------------------------------------------------------------------------

/// Right ascension column of the reference catalogue (J2000, degrees)
pub const GAIA_RA_COLUMN: &str = "RAJ2000";

/// Declination column of the reference catalogue (J2000, degrees)
pub const GAIA_DEC_COLUMN: &str = "DEJ2000";

/// Proper motion in right ascension \[mas/yr\]
pub const GAIA_PMRA_COLUMN: &str = "pmRA";

/// Proper motion in declination \[mas/yr\]
pub const GAIA_PMDEC_COLUMN: &str = "pmDE";

/// Mean G-band magnitude
pub const GAIA_GMAG_COLUMN: &str = "Gmag";
