/// Analysis layer: PCA over the flattened region spectra.

pub mod pca;
