/// Data layer: cube types and the ENVI reader/writer.
///
/// Architecture:
/// ```text
///  .hdr / .dat
///        │
///        ▼
///   ┌──────────┐
///   │   envi    │  parse header + decode binary → Cube
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   model   │  Cube → Region → SpectralMatrix
///   └──────────┘
/// ```

pub mod envi;
pub mod model;
