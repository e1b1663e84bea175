use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::analysis::pca::Pca;
use crate::data::model::SpectralMatrix;

// ---------------------------------------------------------------------------
// CSV tables for downstream analysis
// ---------------------------------------------------------------------------

/// Write the loading matrix: one row per band, columns
/// `wavelength, pc1, pc2, ...`.
pub fn write_loadings_csv(path: &Path, wavelengths: &[f64], pca: &Pca) -> Result<()> {
    if wavelengths.len() != pca.loadings.dim().1 {
        bail!(
            "{} wavelengths for {} loading entries",
            wavelengths.len(),
            pca.loadings.dim().1
        );
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["wavelength".to_string()];
    header.extend((1..=pca.components()).map(|i| format!("pc{i}")));
    writer.write_record(&header)?;

    for (band, &wavelength) in wavelengths.iter().enumerate() {
        let mut record = vec![format!("{wavelength}")];
        record.extend(
            pca.loadings
                .column(band)
                .iter()
                .map(|v| format!("{v}")),
        );
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Write the score matrix: one row per region pixel, columns
/// `row, col, pc1, pc2, ...` with region-local raster coordinates.
pub fn write_scores_csv(path: &Path, matrix: &SpectralMatrix, pca: &Pca) -> Result<()> {
    if matrix.pixel_count() != pca.scores.dim().0 {
        bail!(
            "{} pixels but {} score rows",
            matrix.pixel_count(),
            pca.scores.dim().0
        );
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["row".to_string(), "col".to_string()];
    header.extend((1..=pca.components()).map(|i| format!("pc{i}")));
    writer.write_record(&header)?;

    for i in 0..matrix.pixel_count() {
        let (row, col) = matrix.position(i);
        let mut record = vec![row.to_string(), col.to_string()];
        record.extend(pca.scores.row(i).iter().map(|v| format!("{v}")));
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pca;
    use crate::data::model::{Cube, CubeMetadata};
    use ndarray::Array3;

    #[test]
    fn csv_tables_have_expected_shape() {
        let data = Array3::from_shape_fn((4, 3, 5), |(r, c, b)| {
            ((r + 1) * (b + 1)) as f64 * 0.1 + c as f64 * 0.01
        });
        let cube = Cube::new(data, CubeMetadata::default()).unwrap();
        let matrix = cube.extract_region(0..4, 0..3).unwrap().flatten();
        let model = pca::fit(&matrix.values, 2).unwrap();

        let dir = std::env::temp_dir().join(format!("cubelens-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let loadings = dir.join("loadings.csv");
        write_loadings_csv(&loadings, &cube.wavelength_axis(), &model).unwrap();
        let text = std::fs::read_to_string(&loadings).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("wavelength,pc1,pc2"));
        assert_eq!(lines.count(), 5); // one row per band

        let scores = dir.join("scores.csv");
        write_scores_csv(&scores, &matrix, &model).unwrap();
        let text = std::fs::read_to_string(&scores).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("row,col,pc1,pc2"));
        assert_eq!(lines.count(), 12); // one row per region pixel

        std::fs::remove_dir_all(&dir).ok();
    }
}
