use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Span – a half-open index range written `start:end`
// ---------------------------------------------------------------------------

/// A half-open index range, written `start:end` on the command line and in
/// config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for Span {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("'{s}' is not of the form start:end"))?;
        let start = start
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("'{start}' is not an integer"))?;
        let end = end
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("'{end}' is not an integer"))?;
        if end < start {
            return Err(format!("range '{s}' ends before it starts"));
        }
        Ok(Span { start, end })
    }
}

impl TryFrom<String> for Span {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig – the full parameter set for one run
// ---------------------------------------------------------------------------

/// Everything one analysis run needs. Loadable from a JSON file; CLI defaults
/// mirror the defaults baked into the original workflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// ENVI header file (`.hdr`).
    pub header: PathBuf,
    /// ENVI data file (`.dat`).
    pub data: PathBuf,
    /// Directory for all output files, created if absent.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Row range of the analysis region, half-open.
    #[serde(default = "default_span")]
    pub rows: Span,
    /// Column range of the analysis region, half-open.
    #[serde(default = "default_span")]
    pub cols: Span,
    /// Number of principal components to retain.
    #[serde(default = "default_components")]
    pub components: usize,
    /// How many region pixel spectra the spectra chart overlays.
    #[serde(default = "default_spectra_sample")]
    pub spectra_sample: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("Fig")
}

fn default_span() -> Span {
    Span {
        start: 150,
        end: 200,
    }
}

fn default_components() -> usize {
    4
}

fn default_spectra_sample() -> usize {
    71
}

// ---------------------------------------------------------------------------
// Cli – clap surface
// ---------------------------------------------------------------------------

/// Extract a spatial region from a hyperspectral reflectance cube, run PCA on
/// its pixel spectra, and write diagnostic composites, charts, and tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file carrying the same fields as the flags below.
    /// When given, the remaining flags are ignored.
    #[arg(long, conflicts_with_all = ["header", "data"])]
    config: Option<PathBuf>,

    /// ENVI header file (.hdr).
    #[arg(long, required_unless_present = "config")]
    header: Option<PathBuf>,

    /// ENVI data file (.dat).
    #[arg(long, required_unless_present = "config")]
    data: Option<PathBuf>,

    /// Output directory, created if absent.
    #[arg(long, default_value = "Fig")]
    output_dir: PathBuf,

    /// Region row range, half-open.
    #[arg(long, default_value = "150:200")]
    rows: Span,

    /// Region column range, half-open.
    #[arg(long, default_value = "150:200")]
    cols: Span,

    /// Number of principal components to retain.
    #[arg(short = 'k', long, default_value_t = 4)]
    components: usize,

    /// Number of region pixel spectra to overlay in the spectra chart.
    #[arg(long, default_value_t = 71)]
    spectra_sample: usize,
}

impl Cli {
    /// Resolve the final configuration, reading `--config` when present.
    pub fn into_config(self) -> Result<AnalysisConfig> {
        if let Some(path) = self.config {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config: AnalysisConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            return Ok(config);
        }
        // clap enforces presence of header/data when --config is absent.
        let header = self
            .header
            .context("--header is required without --config")?;
        let data = self.data.context("--data is required without --config")?;
        Ok(AnalysisConfig {
            header,
            data,
            output_dir: self.output_dir,
            rows: self.rows,
            cols: self.cols,
            components: self.components,
            spectra_sample: self.spectra_sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_parses_and_rejects() {
        assert_eq!("150:200".parse::<Span>().unwrap(), Span { start: 150, end: 200 });
        assert_eq!(" 0 : 5 ".parse::<Span>().unwrap().len(), 5);
        assert!("150".parse::<Span>().is_err());
        assert!("a:b".parse::<Span>().is_err());
        assert!("200:150".parse::<Span>().is_err());
        assert!("7:7".parse::<Span>().unwrap().is_empty());
    }

    #[test]
    fn cli_defaults_match_original_workflow() {
        let cli = Cli::parse_from(["cubelens", "--header", "a.hdr", "--data", "a.dat"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.rows, Span { start: 150, end: 200 });
        assert_eq!(config.cols, Span { start: 150, end: 200 });
        assert_eq!(config.components, 4);
        assert_eq!(config.spectra_sample, 71);
        assert_eq!(config.output_dir, PathBuf::from("Fig"));
    }

    #[test]
    fn config_file_json_deserializes_with_defaults() {
        let json = r#"{ "header": "x.hdr", "data": "x.dat", "rows": "10:40", "components": 3 }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.rows, Span { start: 10, end: 40 });
        assert_eq!(config.cols, Span { start: 150, end: 200 });
        assert_eq!(config.components, 3);
        assert_eq!(config.spectra_sample, 71);
    }
}
