//! Hyperspectral cube region PCA analysis.
//!
//! Loads an ENVI reflectance cube, slices a spatial region, runs PCA on the
//! region's pixel spectra, and renders composites, charts, and CSV tables.

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;
