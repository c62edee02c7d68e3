//! # Diagnostic figure of the stacked differences
//!
//! Renders the classic astrometry check plot as a standalone SVG: a central
//! scatter of (Δα, Δδ) coloured by the summed absolute proper motion, a top
//! and a right marginal histogram annotated with median and σ, dashed guide
//! lines at the seven reported percentiles, and optional density contours at
//! the 1/2/3-σ-equivalent enclosed fractions.
//!
//! The input is restricted to |Δα| < 10 arcsec and |Δδ| < 10 arcsec before
//! any statistic is computed. Axis half-range is derived from the data
//! (rounded up to the histogram bin width) but never below the configured
//! minimum, so near-perfect astrometry still renders a readable panel.
//!
//! The SVG is assembled by hand; no retained state, purely a rendering
//! routine over the stacked table.
use std::fmt::Write as _;

use tracing::info;

use crate::astrodiff_errors::AstrodiffError;
use crate::constants::{
    HIST_BINWIDTH_ARCSEC, PLOT_DIFF_LIMIT_ARCSEC, PLOT_PERCENTILES,
};
use crate::differencer::DifferenceRecord;
use crate::stats;

/// Rendering knobs of the diagnostic figure.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Bin count used instead of the fixed bin width for very large samples
    pub bins: usize,
    /// Minimum half-range of both axes \[arcsec\]
    pub limit: f64,
    /// Draw density contours on the scatter panel
    pub contour: bool,
    /// Contour colours, innermost level first
    pub contour_colors: Vec<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            bins: 1000,
            limit: 0.5,
            contour: false,
            contour_colors: vec![
                "limegreen".to_string(),
                "yellowgreen".to_string(),
                "cyan".to_string(),
            ],
        }
    }
}

/// Percentile summary of one run, reported per axis.
#[derive(Debug, Clone)]
pub struct FigureStats {
    pub n: usize,
    pub perc_ra: Vec<f64>,
    pub perc_de: Vec<f64>,
}

const FIG_WIDTH: f64 = 900.0;
const FIG_HEIGHT: f64 = 800.0;
const SCATTER_X: f64 = 80.0;
const SCATTER_Y: f64 = 230.0;
const SCATTER_SIZE: f64 = 520.0;
const HIST_SIZE: f64 = 140.0;
const PANEL_GAP: f64 = 8.0;

/// Render the figure, returning the SVG document and the percentile summary.
///
/// Arguments
/// ---------
/// * `records`: the stacked difference table
/// * `options`: rendering knobs
///
/// Return
/// ------
/// * The SVG text and the per-axis percentiles, or
///   [`AstrodiffError::EmptyPlotInput`] when nothing survives the ±10 arcsec
///   restriction
pub fn render_figure(
    records: &[DifferenceRecord],
    options: &PlotOptions,
) -> Result<(String, FigureStats), AstrodiffError> {
    let kept: Vec<&DifferenceRecord> = records
        .iter()
        .filter(|r| {
            r.radiff.abs() < PLOT_DIFF_LIMIT_ARCSEC && r.dediff.abs() < PLOT_DIFF_LIMIT_ARCSEC
        })
        .collect();
    if kept.is_empty() {
        return Err(AstrodiffError::EmptyPlotInput);
    }

    let radiff: Vec<f64> = kept.iter().map(|r| r.radiff).collect();
    let dediff: Vec<f64> = kept.iter().map(|r| r.dediff).collect();
    let abspm: Vec<f64> = kept.iter().map(|r| r.abspm).collect();

    let perc_ra = stats::percentiles(&radiff, &PLOT_PERCENTILES);
    let perc_de = stats::percentiles(&dediff, &PLOT_PERCENTILES);
    info!(?perc_ra, "percentiles for RA");
    info!(?perc_de, "percentiles for DEC");

    let max_abs = radiff
        .iter()
        .chain(dediff.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let lim = ((max_abs / HIST_BINWIDTH_ARCSEC).ceil() * HIST_BINWIDTH_ARCSEC).max(options.limit);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{FIG_WIDTH}\" height=\"{FIG_HEIGHT}\" viewBox=\"0 0 {FIG_WIDTH} {FIG_HEIGHT}\">"
    );
    let _ = writeln!(svg, "<rect width=\"{FIG_WIDTH}\" height=\"{FIG_HEIGHT}\" fill=\"white\"/>");

    draw_scatter(&mut svg, &radiff, &dediff, &abspm, lim);
    if options.contour {
        draw_contours(&mut svg, &radiff, &dediff, lim, &options.contour_colors);
    }
    draw_top_histogram(&mut svg, &radiff, &perc_ra, lim, options);
    draw_right_histogram(&mut svg, &dediff, &perc_de, lim, options);
    draw_colorbar(&mut svg, &abspm);
    draw_axes_labels(&mut svg, lim, kept.len());

    let _ = writeln!(svg, "</svg>");

    Ok((
        svg,
        FigureStats {
            n: kept.len(),
            perc_ra,
            perc_de,
        },
    ))
}

/// Data coordinate → scatter panel x pixel.
fn px(value: f64, lim: f64) -> f64 {
    SCATTER_X + (value + lim) / (2.0 * lim) * SCATTER_SIZE
}

/// Data coordinate → scatter panel y pixel (SVG y grows downward).
fn py(value: f64, lim: f64) -> f64 {
    SCATTER_Y + (lim - value) / (2.0 * lim) * SCATTER_SIZE
}

fn draw_scatter(svg: &mut String, radiff: &[f64], dediff: &[f64], abspm: &[f64], lim: f64) {
    let _ = writeln!(
        svg,
        "<rect x=\"{SCATTER_X}\" y=\"{SCATTER_Y}\" width=\"{SCATTER_SIZE}\" height=\"{SCATTER_SIZE}\" fill=\"none\" stroke=\"black\"/>"
    );
    let pm_max = abspm
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::MIN, f64::max);
    for ((&x, &y), &pm) in radiff.iter().zip(dediff).zip(abspm) {
        let color = plasma(if pm_max > 0.0 && pm.is_finite() {
            pm / pm_max
        } else {
            0.0
        });
        let _ = writeln!(
            svg,
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"1.8\" fill=\"{color}\" fill-opacity=\"0.8\"/>",
            px(x, lim),
            py(y, lim)
        );
    }
}

fn histogram(values: &[f64], lim: f64, options: &PlotOptions) -> (Vec<usize>, f64) {
    // fixed bin width below a million points, fixed bin count above
    let nbins = if values.len() < 1_000_000 {
        ((2.0 * lim) / HIST_BINWIDTH_ARCSEC).ceil() as usize
    } else {
        options.bins
    }
    .max(1);
    let width = 2.0 * lim / nbins as f64;
    let mut counts = vec![0usize; nbins];
    for &v in values {
        let idx = (((v + lim) / width) as usize).min(nbins - 1);
        counts[idx] += 1;
    }
    (counts, width)
}

fn draw_top_histogram(
    svg: &mut String,
    values: &[f64],
    percentiles: &[f64],
    lim: f64,
    options: &PlotOptions,
) {
    let (counts, width) = histogram(values, lim, options);
    let panel_y = SCATTER_Y - PANEL_GAP - HIST_SIZE;
    let peak = *counts.iter().max().unwrap_or(&1) as f64;
    let _ = writeln!(
        svg,
        "<rect x=\"{SCATTER_X}\" y=\"{panel_y}\" width=\"{SCATTER_SIZE}\" height=\"{HIST_SIZE}\" fill=\"none\" stroke=\"black\"/>"
    );
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let x = px(-lim + i as f64 * width, lim);
        let bar_w = SCATTER_SIZE * width / (2.0 * lim);
        let bar_h = HIST_SIZE * count as f64 / peak;
        let _ = writeln!(
            svg,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"steelblue\" fill-opacity=\"0.8\"/>",
            x,
            panel_y + HIST_SIZE - bar_h,
            bar_w,
            bar_h
        );
    }
    for &p in percentiles {
        let x = px(p.clamp(-lim, lim), lim);
        let _ = writeln!(
            svg,
            "<line x1=\"{x:.2}\" y1=\"{panel_y}\" x2=\"{x:.2}\" y2=\"{:.2}\" stroke=\"black\" stroke-dasharray=\"4 3\" stroke-width=\"1\"/>",
            panel_y + HIST_SIZE
        );
    }
    let median = percentiles[3];
    let sigma = stats::std_dev(values);
    let _ = writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"14\" text-anchor=\"end\">Δᾱ = {median:.3}, σ = {sigma:.3}</text>",
        SCATTER_X + SCATTER_SIZE - 6.0,
        panel_y + 18.0
    );
}

fn draw_right_histogram(
    svg: &mut String,
    values: &[f64],
    percentiles: &[f64],
    lim: f64,
    options: &PlotOptions,
) {
    let (counts, width) = histogram(values, lim, options);
    let panel_x = SCATTER_X + SCATTER_SIZE + PANEL_GAP;
    let peak = *counts.iter().max().unwrap_or(&1) as f64;
    let _ = writeln!(
        svg,
        "<rect x=\"{panel_x}\" y=\"{SCATTER_Y}\" width=\"{HIST_SIZE}\" height=\"{SCATTER_SIZE}\" fill=\"none\" stroke=\"black\"/>"
    );
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let y_top = py(-lim + (i as f64 + 1.0) * width, lim);
        let bar_h = SCATTER_SIZE * width / (2.0 * lim);
        let bar_w = HIST_SIZE * count as f64 / peak;
        let _ = writeln!(
            svg,
            "<rect x=\"{panel_x}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"steelblue\" fill-opacity=\"0.8\"/>",
            y_top, bar_w, bar_h
        );
    }
    for &p in percentiles {
        let y = py(p.clamp(-lim, lim), lim);
        let _ = writeln!(
            svg,
            "<line x1=\"{panel_x}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"black\" stroke-dasharray=\"4 3\" stroke-width=\"1\"/>",
            panel_x + HIST_SIZE
        );
    }
    let median = percentiles[3];
    let sigma = stats::std_dev(values);
    let _ = writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"14\" text-anchor=\"end\">Δδ̄ = {median:.3}, σ = {sigma:.3}</text>",
        panel_x + HIST_SIZE - 6.0,
        SCATTER_Y + 18.0
    );
}

fn draw_colorbar(svg: &mut String, abspm: &[f64]) {
    let pm_max = abspm
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);
    let x = SCATTER_X + SCATTER_SIZE + PANEL_GAP + HIST_SIZE + 24.0;
    let steps = 64;
    let step_h = SCATTER_SIZE / steps as f64;
    for i in 0..steps {
        let frac = i as f64 / (steps - 1) as f64;
        let _ = writeln!(
            svg,
            "<rect x=\"{x:.2}\" y=\"{:.2}\" width=\"16\" height=\"{:.2}\" fill=\"{}\"/>",
            SCATTER_Y + SCATTER_SIZE - (i as f64 + 1.0) * step_h,
            step_h + 0.5,
            plasma(frac)
        );
    }
    let _ = writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"13\" transform=\"rotate(90 {:.2} {:.2})\">|μ| [mas/yr], max = {pm_max:.1}</text>",
        x + 32.0,
        SCATTER_Y + SCATTER_SIZE / 2.0,
        x + 32.0,
        SCATTER_Y + SCATTER_SIZE / 2.0
    );
}

fn draw_axes_labels(svg: &mut String, lim: f64, n: usize) {
    let _ = writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"18\" text-anchor=\"middle\">Δα [arcsec], range ±{lim:.2}</text>",
        SCATTER_X + SCATTER_SIZE / 2.0,
        SCATTER_Y + SCATTER_SIZE + 36.0
    );
    let x = SCATTER_X - 46.0;
    let y = SCATTER_Y + SCATTER_SIZE / 2.0;
    let _ = writeln!(
        svg,
        "<text x=\"{x:.2}\" y=\"{y:.2}\" font-size=\"18\" text-anchor=\"middle\" transform=\"rotate(-90 {x:.2} {y:.2})\">Δδ [arcsec]</text>"
    );
    let _ = writeln!(
        svg,
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"14\" text-anchor=\"end\">N = {n}</text>",
        SCATTER_X + SCATTER_SIZE - 6.0,
        SCATTER_Y + 18.0
    );
}

/// Density contours at the 1/2/3-σ-equivalent enclosed fractions.
///
/// The density is a 100×100 2-D histogram; each level is the cell count
/// above which the given fraction of all points is enclosed, traced with
/// marching squares.
fn draw_contours(svg: &mut String, radiff: &[f64], dediff: &[f64], lim: f64, colors: &[String]) {
    const GRID: usize = 100;
    const ENCLOSED: [f64; 3] = [0.683, 0.9545, 0.997];

    let cell = 2.0 * lim / GRID as f64;
    let mut grid = vec![0.0f64; GRID * GRID];
    for (&x, &y) in radiff.iter().zip(dediff) {
        let i = (((x + lim) / cell) as usize).min(GRID - 1);
        let j = (((y + lim) / cell) as usize).min(GRID - 1);
        grid[j * GRID + i] += 1.0;
    }

    let total: f64 = grid.iter().sum();
    let mut sorted: Vec<f64> = grid.iter().copied().filter(|v| *v > 0.0).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    for (level_idx, &fraction) in ENCLOSED.iter().enumerate() {
        let mut cumulative = 0.0;
        let mut level = sorted.last().copied().unwrap_or(0.0);
        for &v in &sorted {
            cumulative += v;
            if cumulative >= fraction * total {
                level = v;
                break;
            }
        }
        let color = colors
            .get(level_idx)
            .map(String::as_str)
            .unwrap_or("black");
        let path = marching_squares(&grid, GRID, level, lim, cell);
        if !path.is_empty() {
            let _ = writeln!(
                svg,
                "<path d=\"{path}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\"/>"
            );
        }
    }
}

/// Trace one iso-level of the gridded density as SVG path segments.
fn marching_squares(grid: &[f64], n: usize, level: f64, lim: f64, cell: f64) -> String {
    let value = |i: usize, j: usize| grid[j * n + i];
    // position of grid node (i, j) in data coordinates
    let node = |i: f64, j: f64| (-lim + (i + 0.5) * cell, -lim + (j + 0.5) * cell);
    let mut path = String::new();

    for j in 0..n - 1 {
        for i in 0..n - 1 {
            let v = [
                value(i, j),
                value(i + 1, j),
                value(i + 1, j + 1),
                value(i, j + 1),
            ];
            let mut case = 0usize;
            for (bit, &corner) in v.iter().enumerate() {
                if corner >= level {
                    case |= 1 << bit;
                }
            }
            if case == 0 || case == 15 {
                continue;
            }

            // interpolated crossings on the four cell edges
            let t = |a: f64, b: f64| {
                if (b - a).abs() < f64::EPSILON {
                    0.5
                } else {
                    ((level - a) / (b - a)).clamp(0.0, 1.0)
                }
            };
            let bottom = node(i as f64 + t(v[0], v[1]), j as f64);
            let right = node(i as f64 + 1.0, j as f64 + t(v[1], v[2]));
            let top = node(i as f64 + t(v[3], v[2]), j as f64 + 1.0);
            let left = node(i as f64, j as f64 + t(v[0], v[3]));

            let segments: &[((f64, f64), (f64, f64))] = match case {
                1 | 14 => &[(left, bottom)],
                2 | 13 => &[(bottom, right)],
                3 | 12 => &[(left, right)],
                4 | 11 => &[(right, top)],
                6 | 9 => &[(bottom, top)],
                7 | 8 => &[(left, top)],
                5 => &[(left, bottom), (right, top)],
                10 => &[(bottom, right), (left, top)],
                _ => &[],
            };
            for &((x1, y1), (x2, y2)) in segments {
                let _ = write!(
                    path,
                    "M {:.2} {:.2} L {:.2} {:.2} ",
                    px(x1, lim),
                    py(y1, lim),
                    px(x2, lim),
                    py(y2, lim)
                );
            }
        }
    }
    path.trim_end().to_string()
}

/// Tiny plasma-like colormap over `[0, 1]`.
fn plasma(frac: f64) -> String {
    const STOPS: [(f64, f64, f64); 5] = [
        (13.0, 8.0, 135.0),
        (126.0, 3.0, 168.0),
        (204.0, 71.0, 120.0),
        (248.0, 149.0, 64.0),
        (240.0, 249.0, 33.0),
    ];
    let f = frac.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let idx = (f as usize).min(STOPS.len() - 2);
    let t = f - idx as f64;
    let (r1, g1, b1) = STOPS[idx];
    let (r2, g2, b2) = STOPS[idx + 1];
    format!(
        "rgb({},{},{})",
        (r1 + (r2 - r1) * t) as u8,
        (g1 + (g2 - g1) * t) as u8,
        (b1 + (b2 - b1) * t) as u8
    )
}

#[cfg(test)]
mod plot_test {
    use super::*;

    fn record(radiff: f64, dediff: f64, abspm: f64) -> DifferenceRecord {
        DifferenceRecord {
            ra: 10.0,
            dec: 20.0,
            raj2000: 10.0,
            dej2000: 20.0,
            radiff,
            dediff,
            abspm,
        }
    }

    #[test]
    fn renders_scatter_and_histograms() {
        let records: Vec<DifferenceRecord> = (0..50)
            .map(|i| record(0.01 * i as f64 - 0.25, 0.005 * i as f64 - 0.125, i as f64))
            .collect();
        let (svg, figure_stats) =
            render_figure(&records, &PlotOptions::default()).expect("render");

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("N = 50"));
        assert_eq!(figure_stats.n, 50);
        assert_eq!(figure_stats.perc_ra.len(), 7);
    }

    #[test]
    fn restriction_drops_far_outliers() {
        let mut records = vec![record(0.1, 0.1, 1.0); 10];
        records.push(record(50.0, 0.0, 1.0));
        let (_, figure_stats) = render_figure(&records, &PlotOptions::default()).expect("render");
        assert_eq!(figure_stats.n, 10);
    }

    #[test]
    fn all_outliers_is_a_loud_error() {
        let records = vec![record(50.0, 50.0, 1.0)];
        assert!(matches!(
            render_figure(&records, &PlotOptions::default()),
            Err(AstrodiffError::EmptyPlotInput)
        ));
    }

    #[test]
    fn contours_add_path_elements() {
        let mut records = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                // dense blob around the origin
                records.push(record(
                    -0.2 + 0.01 * i as f64,
                    -0.2 + 0.01 * j as f64,
                    1.0,
                ));
            }
        }
        let options = PlotOptions {
            contour: true,
            ..PlotOptions::default()
        };
        let (svg, _) = render_figure(&records, &options).expect("render");
        assert!(svg.contains("stroke=\"limegreen\""));
    }

    #[test]
    fn colormap_endpoints() {
        assert_eq!(plasma(0.0), "rgb(13,8,135)");
        assert_eq!(plasma(1.0), "rgb(240,249,33)");
    }
}
