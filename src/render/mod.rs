/// Rendering layer: PNG composites, SVG charts, CSV tables.

pub mod charts;
pub mod composite;
pub mod export;
