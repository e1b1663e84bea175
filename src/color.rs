use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            hsl_to_rgb(hue, 0.75, 0.55)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Gradient for positional encoding
// ---------------------------------------------------------------------------

/// Maps `t` in `[0, 1]` onto a blue-to-red hue sweep. Used to colour scatter
/// points by their region row. Values outside the range are clamped.
pub fn gradient_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0) as f32;
    let hue = 240.0 * (1.0 - t);
    hsl_to_rgb(hue, 0.8, 0.5)
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> RGBColor {
    let hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = hsl.into_color();
    RGBColor(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_entries() {
        assert!(generate_palette(0).is_empty());
        let palette = generate_palette(8);
        assert_eq!(palette.len(), 8);
        for pair in palette.windows(2) {
            assert_ne!(
                (pair[0].0, pair[0].1, pair[0].2),
                (pair[1].0, pair[1].1, pair[1].2)
            );
        }
    }

    #[test]
    fn gradient_ends_are_blue_and_red() {
        let start = gradient_color(0.0);
        let end = gradient_color(1.0);
        assert!(start.2 > start.0, "t=0 should lean blue");
        assert!(end.0 > end.2, "t=1 should lean red");
        // Out-of-range input clamps instead of wrapping.
        assert_eq!(gradient_color(-1.0).2, start.2);
        assert_eq!(gradient_color(2.0).0, end.0);
    }
}
