//! End-to-end run against a synthetic cube written to a temp directory.

use std::fs;
use std::path::PathBuf;

use ndarray::Array3;

use cubelens::config::{AnalysisConfig, Span};
use cubelens::data::envi;
use cubelens::data::model::{Cube, CubeMetadata};
use cubelens::pipeline;

fn synthetic_cube(rows: usize, cols: usize, bands: usize) -> Cube {
    let data = Array3::from_shape_fn((rows, cols, bands), |(r, c, b)| {
        let t = b as f64 / bands as f64;
        let zone = if c < cols / 2 { 0.3 } else { 0.7 };
        (zone + 0.2 * (t * 8.0 + r as f64 * 0.1).sin()).clamp(0.0, 1.0)
    });
    let metadata = CubeMetadata {
        wavelengths: (0..bands).map(|b| 400.0 + 10.0 * b as f64).collect(),
        default_bands: vec![bands - 1, bands / 2, 0],
        wavelength_units: Some("nm".to_string()),
        raw: Default::default(),
    };
    Cube::new(data, metadata).unwrap()
}

fn temp_workspace(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cubelens-it-{tag}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn full_run_writes_all_artifacts() {
    let dir = temp_workspace("full");
    let cube = synthetic_cube(60, 60, 12);
    let header = dir.join("cube.hdr");
    let data = dir.join("cube.dat");
    envi::write_cube(&header, &data, &cube).unwrap();

    let config = AnalysisConfig {
        header,
        data,
        output_dir: dir.join("Fig"),
        rows: Span { start: 10, end: 40 },
        cols: Span { start: 5, end: 35 },
        components: 4,
        spectra_sample: 20,
    };
    let artifacts = pipeline::run(&config).unwrap();

    let expected = [
        "reflectance_rgb.png",
        "region_rgb.png",
        "spectra.svg",
        "pc1.svg",
        "pc2.svg",
        "pc3.svg",
        "pc4.svg",
        "scores_pc1_pc2.svg",
        "scores_pc3_pc4.svg",
        "loadings.csv",
        "scores.csv",
    ];
    assert_eq!(artifacts.files.len(), expected.len());
    for name in expected {
        let path = config.output_dir.join(name);
        assert!(path.is_file(), "missing {name}");
        assert!(path.metadata().unwrap().len() > 0, "empty {name}");
    }

    // Scores cover every region pixel: 30x30 plus coordinate header row.
    let scores = fs::read_to_string(config.output_dir.join("scores.csv")).unwrap();
    assert_eq!(scores.lines().count(), 30 * 30 + 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn rerun_is_deterministic() {
    let dir = temp_workspace("rerun");
    let cube = synthetic_cube(40, 40, 10);
    let header = dir.join("cube.hdr");
    let data = dir.join("cube.dat");
    envi::write_cube(&header, &data, &cube).unwrap();

    let config = AnalysisConfig {
        header,
        data,
        output_dir: dir.join("Fig"),
        rows: Span { start: 0, end: 20 },
        cols: Span { start: 0, end: 20 },
        components: 3,
        spectra_sample: 10,
    };
    pipeline::run(&config).unwrap();
    let first = fs::read_to_string(config.output_dir.join("loadings.csv")).unwrap();
    pipeline::run(&config).unwrap();
    let second = fs::read_to_string(config.output_dir.join("loadings.csv")).unwrap();
    assert_eq!(first, second);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn out_of_bounds_region_aborts_the_run() {
    let dir = temp_workspace("oob");
    let cube = synthetic_cube(120, 120, 8);
    let header = dir.join("cube.hdr");
    let data = dir.join("cube.dat");
    envi::write_cube(&header, &data, &cube).unwrap();

    let config = AnalysisConfig {
        header,
        data,
        output_dir: dir.join("Fig"),
        rows: Span {
            start: 150,
            end: 200,
        },
        cols: Span { start: 0, end: 50 },
        components: 4,
        spectra_sample: 10,
    };
    let err = pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("exceed cube extent"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn too_many_components_abort_the_run() {
    let dir = temp_workspace("comps");
    let cube = synthetic_cube(30, 30, 6);
    let header = dir.join("cube.hdr");
    let data = dir.join("cube.dat");
    envi::write_cube(&header, &data, &cube).unwrap();

    let config = AnalysisConfig {
        header,
        data,
        output_dir: dir.join("Fig"),
        rows: Span { start: 0, end: 1 },
        cols: Span { start: 0, end: 1 },
        components: 2, // a 1x1 region has a single pixel
        spectra_sample: 1,
    };
    let err = pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("invalid input"));

    fs::remove_dir_all(&dir).ok();
}
