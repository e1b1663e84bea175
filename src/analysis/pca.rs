use nalgebra::DMatrix;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};

use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Pca – fitted principal component model
// ---------------------------------------------------------------------------

/// Principal components of a pixels-by-bands matrix.
///
/// Loadings are the leading right-singular vectors of the column-centered
/// matrix: unit-norm directions in band space, one row per component, ordered
/// by descending singular value. The overall sign of each loading is
/// implementation-defined (standard SVD ambiguity) and is deliberately not
/// canonicalized; compare loadings across runs up to sign.
#[derive(Debug, Clone)]
pub struct Pca {
    /// Per-band column means of the input matrix. Shape `(bands,)`.
    pub mean: Array1<f64>,
    /// Loading vectors, one per row. Shape `(components, bands)`.
    pub loadings: Array2<f64>,
    /// Singular values of the retained components, descending.
    pub singular_values: Array1<f64>,
    /// Fraction of total variance captured by each retained component.
    pub explained_variance_ratio: Array1<f64>,
    /// Projection of each centered pixel spectrum onto each loading.
    /// Shape `(pixels, components)`.
    pub scores: Array2<f64>,
}

impl Pca {
    pub fn components(&self) -> usize {
        self.loadings.dim().0
    }

    pub fn loading(&self, component: usize) -> ArrayView1<'_, f64> {
        self.loadings.row(component)
    }

    pub fn score_column(&self, component: usize) -> ArrayView1<'_, f64> {
        self.scores.column(component)
    }

    /// Reconstruct the input matrix from the first `rank` components plus the
    /// mean. With `rank == components()` this is the best retained
    /// approximation; the residual shrinks monotonically as `rank` grows.
    pub fn reconstruct(&self, rank: usize) -> Result<Array2<f64>, AnalysisError> {
        if rank > self.components() {
            return Err(AnalysisError::InvalidInput(format!(
                "rank {rank} exceeds the {} retained components",
                self.components()
            )));
        }
        let truncated = self
            .scores
            .slice(s![.., ..rank])
            .dot(&self.loadings.slice(s![..rank, ..]));
        Ok(truncated + &self.mean)
    }
}

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Fit a PCA model: center per band, thin SVD, keep the top `components`.
///
/// Fails with [`AnalysisError::InvalidInput`] when the matrix contains
/// non-finite values or when `components` is zero or exceeds
/// `min(pixels, bands)`.
pub fn fit(matrix: &Array2<f64>, components: usize) -> Result<Pca, AnalysisError> {
    let (pixels, bands) = matrix.dim();
    if components == 0 {
        return Err(AnalysisError::InvalidInput(
            "requested zero components".into(),
        ));
    }
    if components > pixels.min(bands) {
        return Err(AnalysisError::InvalidInput(format!(
            "cannot extract {components} components from a {pixels} x {bands} matrix \
             (limit is {})",
            pixels.min(bands)
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(
            "matrix contains non-finite values".into(),
        ));
    }

    let mean = matrix
        .mean_axis(Axis(0))
        .ok_or_else(|| AnalysisError::InvalidInput("empty matrix".into()))?;
    let centered = matrix - &mean;

    // Thin SVD; nalgebra returns singular values in descending order. Only
    // the right-singular vectors are needed, scores come from projection.
    let svd = DMatrix::from_row_iterator(pixels, bands, centered.iter().copied()).svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| AnalysisError::InvalidInput("SVD produced no singular vectors".into()))?;

    let singular_values =
        Array1::from_iter(svd.singular_values.iter().take(components).copied());
    let total_variance: f64 = svd.singular_values.iter().map(|s| s * s).sum();
    let explained_variance_ratio = if total_variance > 0.0 {
        singular_values.mapv(|s| s * s / total_variance)
    } else {
        Array1::zeros(components)
    };

    let loadings = Array2::from_shape_fn((components, bands), |(i, j)| v_t[(i, j)]);
    let scores = centered.dot(&loadings.t());

    Ok(Pca {
        mean,
        loadings,
        singular_values,
        explained_variance_ratio,
        scores,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const TOL: f64 = 1e-9;

    /// Deterministic full-rank test matrix with smooth band structure.
    fn sample_matrix(pixels: usize, bands: usize) -> Array2<f64> {
        Array2::from_shape_fn((pixels, bands), |(i, j)| {
            let t = j as f64 / bands as f64;
            let phase = i as f64 * 0.37;
            (t * 6.0 + phase).sin() + 0.3 * (t * 17.0 - phase).cos() + 0.05 * (i * bands + j) as f64
                / (pixels * bands) as f64
        })
    }

    fn frobenius(diff: &Array2<f64>) -> f64 {
        diff.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    #[test]
    fn loadings_are_orthonormal() {
        let matrix = sample_matrix(40, 12);
        let pca = fit(&matrix, 4).unwrap();
        for a in 0..4 {
            for b in 0..4 {
                let dot = pca.loading(a).dot(&pca.loading(b));
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!(
                    (dot - expected).abs() < 1e-8,
                    "loading {a}·{b} = {dot}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn singular_values_descend() {
        let matrix = sample_matrix(50, 10);
        let pca = fit(&matrix, 5).unwrap();
        for pair in pca.singular_values.windows(2) {
            assert!(pair[0] >= pair[1] - TOL);
        }
    }

    #[test]
    fn scores_match_explicit_projection() {
        let matrix = sample_matrix(30, 8);
        let pca = fit(&matrix, 3).unwrap();
        let centered = &matrix - &pca.mean;
        for component in 0..3 {
            let loading = pca.loading(component);
            for (i, row) in centered.rows().into_iter().enumerate() {
                let expected = row.dot(&loading);
                let got = pca.scores[[i, component]];
                assert!((got - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn reconstruction_error_is_monotone_in_rank() {
        let matrix = sample_matrix(25, 9);
        let full_rank = 9;
        let pca = fit(&matrix, full_rank).unwrap();
        let mut previous = f64::INFINITY;
        for rank in 1..=full_rank {
            let residual = frobenius(&(&pca.reconstruct(rank).unwrap() - &matrix));
            assert!(
                residual <= previous + TOL,
                "residual grew at rank {rank}: {residual} > {previous}"
            );
            previous = residual;
        }
        // Full-rank reconstruction recovers the matrix.
        assert!(previous < 1e-7);
    }

    #[test]
    fn region_sized_fit_has_expected_shapes() {
        // A 50x50 region with 12 bands: 2500 pixel scores per component.
        let matrix = sample_matrix(2500, 12);
        let pca = fit(&matrix, 4).unwrap();
        assert_eq!(pca.loadings.dim(), (4, 12));
        assert_eq!(pca.scores.dim(), (2500, 4));
        assert_eq!(pca.singular_values.len(), 4);
        assert_eq!(pca.explained_variance_ratio.len(), 4);
        let total: f64 = pca.explained_variance_ratio.iter().sum();
        assert!(total <= 1.0 + TOL);
    }

    #[test]
    fn single_pixel_rejects_multiple_components() {
        let matrix = sample_matrix(1, 16);
        let err = fit(&matrix, 2).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        // A single component from a single pixel is also degenerate but legal.
        assert!(fit(&matrix, 1).is_ok());
    }

    #[test]
    fn non_finite_values_rejected() {
        let mut matrix = sample_matrix(10, 5);
        matrix[[3, 2]] = f64::NAN;
        assert!(matches!(
            fit(&matrix, 2),
            Err(AnalysisError::InvalidInput(_))
        ));

        let mut matrix = sample_matrix(10, 5);
        matrix[[0, 0]] = f64::INFINITY;
        assert!(matches!(
            fit(&matrix, 2),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn refitting_is_deterministic() {
        let matrix = sample_matrix(40, 10);
        let a = fit(&matrix, 4).unwrap();
        let b = fit(&matrix, 4).unwrap();
        assert_eq!(a.loadings, b.loadings);
        assert_eq!(a.scores, b.scores);
    }
}
