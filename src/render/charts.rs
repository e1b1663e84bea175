use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::ArrayView1;
use plotters::prelude::*;

use crate::color::{generate_palette, gradient_color};

const CHART_SIZE: (u32, u32) = (900, 620);
const AXIS_COLOR: RGBColor = RGBColor(128, 128, 128);

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Min/max of finite values, padded by 5% so points stay off the frame.
fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = (hi - lo).max(1e-9);
    (lo - 0.05 * span, hi + 0.05 * span)
}

// ---------------------------------------------------------------------------
// Spectra chart
// ---------------------------------------------------------------------------

/// Overlay one line per pixel spectrum against the wavelength axis.
pub fn spectra_chart(
    path: &Path,
    wavelengths: &[f64],
    spectra: &[ArrayView1<'_, f64>],
    x_label: &str,
    title: &str,
) -> Result<()> {
    if spectra.iter().any(|sp| sp.len() != wavelengths.len()) {
        bail!("spectrum length does not match the {} wavelengths", wavelengths.len());
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("drawing {}", path.display()))?;

    let (x_lo, x_hi) = padded_range(wavelengths.iter());
    let (y_lo, y_hi) = padded_range(spectra.iter().flat_map(|sp| sp.iter()));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Reflectance")
        .label_style(("sans-serif", 15))
        .draw()?;

    let palette = generate_palette(spectra.len());
    for (sp, color) in spectra.iter().zip(palette) {
        chart.draw_series(LineSeries::new(
            wavelengths.iter().copied().zip(sp.iter().copied()),
            &color,
        ))?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading chart
// ---------------------------------------------------------------------------

/// One principal-component loading curve with a zero reference line.
pub fn loading_chart(
    path: &Path,
    wavelengths: &[f64],
    loading: ArrayView1<'_, f64>,
    component_label: &str,
    x_label: &str,
) -> Result<()> {
    if loading.len() != wavelengths.len() {
        bail!(
            "loading has {} entries but there are {} wavelengths",
            loading.len(),
            wavelengths.len()
        );
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("drawing {}", path.display()))?;

    let (x_lo, x_hi) = padded_range(wavelengths.iter());
    // Always include zero so the reference line is visible.
    let (mut y_lo, mut y_hi) = padded_range(loading.iter());
    y_lo = y_lo.min(0.0);
    y_hi = y_hi.max(0.0);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Loadings for {component_label}"), ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Loadings")
        .label_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        [(x_lo, 0.0), (x_hi, 0.0)],
        &AXIS_COLOR,
    ))?;
    chart.draw_series(LineSeries::new(
        wavelengths.iter().copied().zip(loading.iter().copied()),
        BLUE.stroke_width(2),
    ))?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Score scatter
// ---------------------------------------------------------------------------

/// Scatter of two score columns. Point size grows with the pixel's region
/// column and colour runs blue→red with its region row, so spatial structure
/// within the region stays readable in score space.
pub fn score_scatter(
    path: &Path,
    x_scores: ArrayView1<'_, f64>,
    y_scores: ArrayView1<'_, f64>,
    x_label: &str,
    y_label: &str,
    region_width: usize,
) -> Result<()> {
    if x_scores.len() != y_scores.len() {
        bail!(
            "score columns differ in length: {} vs {}",
            x_scores.len(),
            y_scores.len()
        );
    }
    if region_width == 0 || x_scores.len() % region_width != 0 {
        bail!(
            "{} scores do not tile a region of width {region_width}",
            x_scores.len()
        );
    }
    let region_height = x_scores.len() / region_width;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("drawing {}", path.display()))?;

    let (x_lo, x_hi) = padded_range(x_scores.iter());
    let (y_lo, y_hi) = padded_range(y_scores.iter());

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{x_label} vs {y_label} scores"),
            ("sans-serif", 24),
        )
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style(("sans-serif", 15))
        .draw()?;

    // Zero reference cross.
    chart.draw_series(LineSeries::new([(x_lo, 0.0), (x_hi, 0.0)], &AXIS_COLOR))?;
    chart.draw_series(LineSeries::new([(0.0, y_lo), (0.0, y_hi)], &AXIS_COLOR))?;

    chart.draw_series(x_scores.iter().zip(y_scores.iter()).enumerate().map(
        |(i, (&x, &y))| {
            let row = i / region_width;
            let col = i % region_width;
            let radius = 1 + (3 * col / region_width.max(1)) as i32;
            let t = row as f64 / (region_height.saturating_sub(1).max(1)) as f64;
            Circle::new((x, y), radius, gradient_color(t).filled())
        },
    ))?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
