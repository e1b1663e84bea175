//! Generate a synthetic ENVI reflectance cube for exercising the analyzer
//! without proprietary capture data.
//!
//! The scene is split into three vertical zones, each with its own set of
//! Gaussian reflectance peaks, plus per-pixel noise, so a region straddling a
//! zone boundary shows clear principal components.

use std::path::PathBuf;

use anyhow::Result;

use cubelens::data::envi;
use cubelens::data::model::{Cube, CubeMetadata};

const LINES: usize = 256;
const SAMPLES: usize = 256;
const BANDS: usize = 60;
const WAVELENGTH_START: f64 = 400.0;
const WAVELENGTH_STEP: f64 = 10.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn reflectance(wavelength: f64, peaks: &[(f64, f64, f64)], noise: f64) -> f64 {
    let signal: f64 = peaks
        .iter()
        .map(|&(mu, sigma, amp)| gaussian(wavelength, mu, sigma, amp))
        .sum();
    (signal + noise).clamp(0.0, 1.0)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let wavelengths: Vec<f64> = (0..BANDS)
        .map(|b| WAVELENGTH_START + b as f64 * WAVELENGTH_STEP)
        .collect();

    // (centre nm, width nm, amplitude) per spatial zone.
    let zone_peaks: [Vec<(f64, f64, f64)>; 3] = [
        vec![(550.0, 40.0, 0.55), (780.0, 90.0, 0.7)],  // vegetation-like
        vec![(480.0, 60.0, 0.35), (650.0, 50.0, 0.5)],  // soil-like
        vec![(430.0, 35.0, 0.6), (900.0, 70.0, 0.45)],  // mineral-like
    ];

    let mut data = ndarray::Array3::zeros((LINES, SAMPLES, BANDS));
    for row in 0..LINES {
        for col in 0..SAMPLES {
            let zone = col * zone_peaks.len() / SAMPLES;
            // Smooth brightness gradient down the scene.
            let brightness = 0.8 + 0.4 * row as f64 / LINES as f64;
            for (band, &wavelength) in wavelengths.iter().enumerate() {
                let noise = rng.gauss(0.0, 0.01);
                data[[row, col, band]] =
                    reflectance(wavelength, &zone_peaks[zone], noise) * brightness;
            }
        }
    }

    // Display bands closest to 650 / 550 / 460 nm.
    let nearest = |target: f64| -> usize {
        wavelengths
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let metadata = CubeMetadata {
        wavelengths: wavelengths.clone(),
        default_bands: vec![nearest(650.0), nearest(550.0), nearest(460.0)],
        wavelength_units: Some("nm".to_string()),
        raw: Default::default(),
    };
    let cube = Cube::new(data, metadata)?;

    let base = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_cube"));
    let header = base.with_extension("hdr");
    let data_file = base.with_extension("dat");
    envi::write_cube(&header, &data_file, &cube)?;

    println!(
        "Wrote {LINES}x{SAMPLES}x{BANDS} cube to {} / {}",
        header.display(),
        data_file.display()
    );
    Ok(())
}
