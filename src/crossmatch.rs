//! # Nearest-neighbour sky cross-match
//!
//! Associates every survey source with its closest reference source on the
//! unit sphere. Coordinates are embedded as 3-D unit vectors and indexed in
//! an immutable kd-tree; the squared chord distance between unit vectors is
//! a monotonic function of the angular separation, so the chord nearest
//! neighbour is also the angular nearest neighbour.
//!
//! Pairs are kept only when the separation is below the fixed tolerance
//! (5 arcsec, [`crate::constants::MATCH_RADIUS_ARCSEC`]); a survey source
//! farther than that from every reference source is excluded regardless of
//! any later filter.
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Vector3;

use crate::constants::{ArcSec, Degree, RADEG, RADSEC};
use crate::gaia::GaiaEntry;
use crate::survey::SurveyEntry;

/// Association of one survey source with its nearest reference source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    /// Index into the survey catalogue
    pub survey_idx: usize,
    /// Index into the reference catalogue
    pub gaia_idx: usize,
    /// Angular separation of the pair \[arcsec\]
    pub separation: ArcSec,
}

/// Unit vector of a sky position given in degrees.
pub fn unit_vector(ra: Degree, dec: Degree) -> Vector3<f64> {
    let ra_rad = ra * RADEG;
    let dec_rad = dec * RADEG;
    Vector3::new(
        dec_rad.cos() * ra_rad.cos(),
        dec_rad.cos() * ra_rad.sin(),
        dec_rad.sin(),
    )
}

/// Angular separation in arcseconds from a squared chord distance.
fn chord2_to_arcsec(chord2: f64) -> ArcSec {
    // chord = 2 sin(theta / 2) on the unit sphere
    let half_chord = (chord2.sqrt() / 2.0).clamp(-1.0, 1.0);
    2.0 * half_chord.asin() / RADSEC
}

/// Match every survey source to its nearest reference source.
///
/// Arguments
/// ---------
/// * `survey`: the survey catalogue of one tile
/// * `gaia`: the reference catalogue of the same tile
/// * `max_separation`: maximum angular separation kept \[arcsec\]
///
/// Return
/// ------
/// * The retained pairs, in survey order. Sources with non-finite
///   coordinates on either side never participate.
pub fn match_catalogues(
    survey: &[SurveyEntry],
    gaia: &[GaiaEntry],
    max_separation: ArcSec,
) -> Vec<MatchedPair> {
    // Item payloads are indices into the original reference catalogue, so
    // rows with invalid coordinates can be left out of the tree.
    let mut points: Vec<[f64; 3]> = Vec::with_capacity(gaia.len());
    let mut gaia_indices: Vec<usize> = Vec::with_capacity(gaia.len());
    for (idx, entry) in gaia.iter().enumerate() {
        if entry.raj2000.is_finite() && entry.dej2000.is_finite() {
            points.push(unit_vector(entry.raj2000, entry.dej2000).into());
            gaia_indices.push(idx);
        }
    }
    if points.is_empty() {
        return Vec::new();
    }

    type Tree = ImmutableKdTree<f64, u32, 3, 32>;
    let tree: Tree = ImmutableKdTree::new_from_slice(&points);

    let mut pairs = Vec::new();
    for (survey_idx, entry) in survey.iter().enumerate() {
        if !entry.ra.is_finite() || !entry.dec.is_finite() {
            continue;
        }
        let query: [f64; 3] = unit_vector(entry.ra, entry.dec).into();
        let nearest = tree.nearest_one::<SquaredEuclidean>(&query);
        let separation = chord2_to_arcsec(nearest.distance);
        if separation < max_separation {
            pairs.push(MatchedPair {
                survey_idx,
                gaia_idx: gaia_indices[nearest.item as usize],
                separation,
            });
        }
    }
    pairs
}

#[cfg(test)]
mod crossmatch_test {
    use super::*;
    use approx::assert_relative_eq;

    fn gaia(ra: f64, dec: f64) -> GaiaEntry {
        GaiaEntry {
            raj2000: ra,
            dej2000: dec,
            pm_ra: None,
            pm_dec: None,
            g_mag: None,
        }
    }

    fn survey(ra: f64, dec: f64) -> SurveyEntry {
        SurveyEntry {
            ra,
            dec,
            mag: 17.0,
            flags: None,
            clstar: None,
            fwhm: None,
            sn: None,
        }
    }

    #[test]
    fn separation_recovers_declination_offset() {
        // 3.6 arcsec offset purely in declination
        let one_mdeg = 0.001;
        let gaia_cat = vec![gaia(10.0, 20.0 + one_mdeg)];
        let survey_cat = vec![survey(10.0, 20.0)];

        let pairs = match_catalogues(&survey_cat, &gaia_cat, 5.0);
        assert_eq!(pairs.len(), 1);
        assert_relative_eq!(pairs[0].separation, 3.6, epsilon = 1e-6);
    }

    #[test]
    fn sources_beyond_tolerance_are_excluded() {
        // 7.2 arcsec away: nearest neighbour exists but is too far
        let gaia_cat = vec![gaia(10.0, 20.002)];
        let survey_cat = vec![survey(10.0, 20.0)];
        assert!(match_catalogues(&survey_cat, &gaia_cat, 5.0).is_empty());
    }

    #[test]
    fn picks_the_nearest_of_several_references() {
        let gaia_cat = vec![gaia(10.0, 20.0010), gaia(10.0, 20.0002), gaia(10.0, 19.9)];
        let survey_cat = vec![survey(10.0, 20.0)];

        let pairs = match_catalogues(&survey_cat, &gaia_cat, 5.0);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].gaia_idx, 1);
    }

    #[test]
    fn invalid_coordinates_never_participate() {
        let gaia_cat = vec![gaia(f64::NAN, 20.0), gaia(10.0, 20.0001)];
        let survey_cat = vec![survey(10.0, 20.0), survey(f64::NAN, 20.0)];

        let pairs = match_catalogues(&survey_cat, &gaia_cat, 5.0);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].survey_idx, 0);
        assert_eq!(pairs[0].gaia_idx, 1);
    }

    #[test]
    fn empty_reference_catalogue_matches_nothing() {
        let survey_cat = vec![survey(10.0, 20.0)];
        assert!(match_catalogues(&survey_cat, &[], 5.0).is_empty());
    }
}
