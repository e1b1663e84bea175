use std::ops::Range;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Typed errors for the analysis core
// ---------------------------------------------------------------------------

/// Errors raised by the analysis core (region extraction, PCA, header
/// interpretation). Plain I/O failures are propagated as `anyhow` errors with
/// path context instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Requested region exceeds the cube's spatial extent.
    #[error(
        "region rows {}..{} / cols {}..{} exceed cube extent {rows} rows x {cols} cols",
        row_range.start, row_range.end, col_range.start, col_range.end
    )]
    OutOfBounds {
        row_range: Range<usize>,
        col_range: Range<usize>,
        rows: usize,
        cols: usize,
    },

    /// Numerically or structurally invalid input (non-finite values,
    /// insufficient rows for the requested component count, mismatched
    /// metadata lengths).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The ENVI header text could not be interpreted.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
}
