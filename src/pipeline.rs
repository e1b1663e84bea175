use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::analysis::pca;
use crate::config::AnalysisConfig;
use crate::data::envi;
use crate::render::{charts, composite, export};

// ---------------------------------------------------------------------------
// Pipeline orchestration
// ---------------------------------------------------------------------------

/// What a completed run produced. Returned instead of any interactive "done"
/// signal so callers can chain or verify the run.
#[derive(Debug)]
pub struct RunArtifacts {
    /// Every file written, in creation order.
    pub files: Vec<PathBuf>,
}

/// Run the full analysis: load → composite → extract → flatten → PCA →
/// charts and tables. Stages run strictly in sequence; the first error
/// aborts the run.
pub fn run(config: &AnalysisConfig) -> Result<RunArtifacts> {
    let cube = envi::load_cube(&config.header, &config.data)?;
    info!(
        "loaded cube: {} rows x {} cols x {} bands",
        cube.rows(),
        cube.cols(),
        cube.bands()
    );
    info!(
        "header fields: {}",
        cube.metadata
            .raw
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;
    let mut files = Vec::new();

    let display_bands = cube.metadata.display_bands()?;
    let wavelengths = cube.wavelength_axis();
    let x_label = cube.metadata.wavelength_label();

    // Full-cube RGB composite.
    let path = config.output_dir.join("reflectance_rgb.png");
    composite::save_composite(cube.data(), display_bands, &path)?;
    info!("wrote {}", path.display());
    files.push(path);

    // Region extraction + its composite.
    let region = cube.extract_region(config.rows.range(), config.cols.range())?;
    info!(
        "extracted region rows {} cols {}: {} x {} pixels",
        config.rows,
        config.cols,
        region.height(),
        region.width()
    );
    let path = config.output_dir.join("region_rgb.png");
    composite::save_composite(region.data.view(), display_bands, &path)?;
    files.push(path);

    // Raw spectra of the first pixels in raster order.
    let matrix = region.flatten();
    let sample = config.spectra_sample.min(matrix.pixel_count());
    let sampled: Vec<_> = (0..sample).map(|i| matrix.spectrum(i)).collect();
    let path = config.output_dir.join("spectra.svg");
    charts::spectra_chart(
        &path,
        &wavelengths,
        &sampled,
        &x_label,
        "Spectra of the subimage",
    )?;
    info!("wrote {} ({sample} spectra)", path.display());
    files.push(path);

    // PCA over the region spectra.
    let model = pca::fit(&matrix.values, config.components)?;
    for (i, ratio) in model.explained_variance_ratio.iter().enumerate() {
        info!("PC{}: {:.2}% of variance", i + 1, ratio * 100.0);
    }

    // One loading curve per component.
    for component in 0..model.components() {
        let label = format!("PC{}", component + 1);
        let path = config
            .output_dir
            .join(format!("{}.svg", label.to_lowercase()));
        charts::loading_chart(&path, &wavelengths, model.loading(component), &label, &x_label)?;
        files.push(path);
    }

    // Score scatters for consecutive component pairs.
    let mut component = 0;
    while component + 1 < model.components() {
        let (a, b) = (component, component + 1);
        let path = config
            .output_dir
            .join(format!("scores_pc{}_pc{}.svg", a + 1, b + 1));
        charts::score_scatter(
            &path,
            model.score_column(a),
            model.score_column(b),
            &format!("PC{}", a + 1),
            &format!("PC{}", b + 1),
            matrix.region_width,
        )?;
        files.push(path);
        component += 2;
    }

    // CSV tables.
    let path = config.output_dir.join("loadings.csv");
    export::write_loadings_csv(&path, &wavelengths, &model)?;
    files.push(path);
    let path = config.output_dir.join("scores.csv");
    export::write_scores_csv(&path, &matrix, &model)?;
    files.push(path);

    info!("run complete: {} files", files.len());
    Ok(RunArtifacts { files })
}
