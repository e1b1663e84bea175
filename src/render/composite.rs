use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use ndarray::ArrayView3;

// ---------------------------------------------------------------------------
// RGB composite
// ---------------------------------------------------------------------------

/// Fraction of pixels clipped at each end of a channel's histogram before
/// mapping to 0..255.
const STRETCH_CLIP: f64 = 0.02;

/// Render a band triple of a cube or region as an RGB PNG.
///
/// Each channel is contrast-stretched independently between its 2nd and 98th
/// percentile. Non-finite samples are rendered black.
pub fn save_composite(data: ArrayView3<'_, f64>, bands: [usize; 3], path: &Path) -> Result<()> {
    let (rows, cols, n_bands) = data.dim();
    for &band in &bands {
        if band >= n_bands {
            bail!("display band {band} out of range for {n_bands} bands");
        }
    }

    let ranges: Vec<(f64, f64)> = bands
        .iter()
        .map(|&band| stretch_range(data, band))
        .collect();

    let mut img = RgbImage::new(cols as u32, rows as u32);
    for row in 0..rows {
        for col in 0..cols {
            let mut px = [0u8; 3];
            for (channel, (&band, &(lo, hi))) in bands.iter().zip(ranges.iter()).enumerate() {
                px[channel] = scale(data[[row, col, band]], lo, hi);
            }
            img.put_pixel(col as u32, row as u32, Rgb(px));
        }
    }
    img.save(path)
        .with_context(|| format!("writing composite {}", path.display()))?;
    Ok(())
}

/// Percentile stretch bounds for one band, ignoring non-finite samples.
fn stretch_range(data: ArrayView3<'_, f64>, band: usize) -> (f64, f64) {
    let mut values: Vec<f64> = data
        .slice(ndarray::s![.., .., band])
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return (0.0, 1.0);
    }
    values.sort_by(f64::total_cmp);
    let lo = values[percentile_index(values.len(), STRETCH_CLIP)];
    let hi = values[percentile_index(values.len(), 1.0 - STRETCH_CLIP)];
    if hi > lo {
        (lo, hi)
    } else {
        // Flat band; avoid a zero-width range.
        (lo, lo + 1.0)
    }
}

fn percentile_index(len: usize, q: f64) -> usize {
    (((len - 1) as f64) * q).round() as usize
}

fn scale(value: f64, lo: f64, hi: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (((value - lo) / (hi - lo)).clamp(0.0, 1.0) * 255.0).round() as u8
}
