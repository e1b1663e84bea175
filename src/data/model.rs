use std::collections::BTreeMap;
use std::ops::Range;

use ndarray::{s, Array2, Array3, ArrayView1, ArrayView3};

use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// CubeMetadata – parsed header fields that the analysis actually consumes
// ---------------------------------------------------------------------------

/// Metadata extracted from an ENVI header, beyond the raw shape.
#[derive(Debug, Clone, Default)]
pub struct CubeMetadata {
    /// Band-centre wavelengths, one per band. Empty if the header carried no
    /// `wavelength` field.
    pub wavelengths: Vec<f64>,
    /// Band indices used for RGB display (`default bands`), as stored in the
    /// header. May hold fewer than three entries.
    pub default_bands: Vec<usize>,
    /// `wavelength units` field, if present.
    pub wavelength_units: Option<String>,
    /// Every header field as raw text, keyed by lowercased name.
    pub raw: BTreeMap<String, String>,
}

impl CubeMetadata {
    /// The three display band indices, or an error when the header declares
    /// fewer than three.
    pub fn display_bands(&self) -> Result<[usize; 3], AnalysisError> {
        match self.default_bands.as_slice() {
            [r, g, b, ..] => Ok([*r, *g, *b]),
            other => Err(AnalysisError::InvalidInput(format!(
                "header declares {} default band(s), need 3 for an RGB composite",
                other.len()
            ))),
        }
    }

    /// Axis label for wavelength plots, e.g. `Wavelength (nm)`.
    pub fn wavelength_label(&self) -> String {
        match &self.wavelength_units {
            Some(units) => format!("Wavelength ({units})"),
            None => "Wavelength".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cube – the loaded reflectance image
// ---------------------------------------------------------------------------

/// An immutable hyperspectral cube indexed `(row, column, band)`.
#[derive(Debug, Clone)]
pub struct Cube {
    data: Array3<f64>,
    pub metadata: CubeMetadata,
}

impl Cube {
    /// Wrap loaded data and metadata, validating that any wavelength list
    /// matches the band count.
    pub fn new(data: Array3<f64>, metadata: CubeMetadata) -> Result<Self, AnalysisError> {
        let bands = data.dim().2;
        if !metadata.wavelengths.is_empty() && metadata.wavelengths.len() != bands {
            return Err(AnalysisError::InvalidInput(format!(
                "header lists {} wavelengths but the cube has {} bands",
                metadata.wavelengths.len(),
                bands
            )));
        }
        if let Some(&max_band) = metadata.default_bands.iter().max() {
            if max_band >= bands {
                return Err(AnalysisError::InvalidInput(format!(
                    "default band {max_band} out of range for {bands} bands"
                )));
            }
        }
        Ok(Cube { data, metadata })
    }

    pub fn rows(&self) -> usize {
        self.data.dim().0
    }

    pub fn cols(&self) -> usize {
        self.data.dim().1
    }

    pub fn bands(&self) -> usize {
        self.data.dim().2
    }

    pub fn data(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Wavelength axis for plotting: header wavelengths when present,
    /// otherwise plain band indices.
    pub fn wavelength_axis(&self) -> Vec<f64> {
        if self.metadata.wavelengths.is_empty() {
            (0..self.bands()).map(|b| b as f64).collect()
        } else {
            self.metadata.wavelengths.clone()
        }
    }

    /// Slice a rectangular spatial sub-region across all bands.
    ///
    /// Both ranges are half-open. Fails with [`AnalysisError::OutOfBounds`]
    /// when a range is inverted or exceeds the cube extent.
    pub fn extract_region(
        &self,
        row_range: Range<usize>,
        col_range: Range<usize>,
    ) -> Result<Region, AnalysisError> {
        let (rows, cols) = (self.rows(), self.cols());
        if row_range.start > row_range.end
            || col_range.start > col_range.end
            || row_range.end > rows
            || col_range.end > cols
        {
            return Err(AnalysisError::OutOfBounds {
                row_range,
                col_range,
                rows,
                cols,
            });
        }
        let data = self
            .data
            .slice(s![row_range.clone(), col_range.clone(), ..])
            .to_owned();
        Ok(Region {
            data,
            row_offset: row_range.start,
            col_offset: col_range.start,
        })
    }
}

// ---------------------------------------------------------------------------
// Region – a spatial subset of the cube
// ---------------------------------------------------------------------------

/// A rectangular spatial subset of a [`Cube`], all bands retained.
#[derive(Debug, Clone)]
pub struct Region {
    pub data: Array3<f64>,
    /// Row index of this region's first row in the parent cube.
    pub row_offset: usize,
    /// Column index of this region's first column in the parent cube.
    pub col_offset: usize,
}

impl Region {
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn bands(&self) -> usize {
        self.data.dim().2
    }

    /// Flatten to a pixels-by-bands matrix in raster order: matrix row
    /// `i = row * width + col`. Pure and invertible given the region shape.
    pub fn flatten(&self) -> SpectralMatrix {
        let (h, w, b) = self.data.dim();
        let values =
            Array2::from_shape_fn((h * w, b), |(i, band)| self.data[[i / w, i % w, band]]);
        SpectralMatrix {
            values,
            region_height: h,
            region_width: w,
        }
    }
}

// ---------------------------------------------------------------------------
// SpectralMatrix – pixels × bands, raster ordered
// ---------------------------------------------------------------------------

/// The flattened region. Row order is a raster scan of the region, which the
/// score scatter plots rely on for their positional size/colour encoding.
#[derive(Debug, Clone)]
pub struct SpectralMatrix {
    pub values: Array2<f64>,
    pub region_height: usize,
    pub region_width: usize,
}

impl SpectralMatrix {
    pub fn pixel_count(&self) -> usize {
        self.values.dim().0
    }

    pub fn band_count(&self) -> usize {
        self.values.dim().1
    }

    /// Region-local `(row, col)` position of matrix row `i`.
    pub fn position(&self, i: usize) -> (usize, usize) {
        (i / self.region_width, i % self.region_width)
    }

    pub fn spectrum(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    /// Inverse of [`Region::flatten`]: rebuild the 3-D region array.
    pub fn unflatten(&self) -> Array3<f64> {
        let (h, w) = (self.region_height, self.region_width);
        let b = self.band_count();
        Array3::from_shape_fn((h, w, b), |(row, col, band)| {
            self.values[[row * w + col, band]]
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
