use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use ndarray::Array3;

use crate::data::model::{Cube, CubeMetadata};
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Header field enums
// ---------------------------------------------------------------------------

/// Band interleave layout of the binary data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interleave {
    /// Band sequential: all of band 0, then all of band 1, ...
    Bsq,
    /// Band interleaved by line: for each row, all bands line by line.
    Bil,
    /// Band interleaved by pixel: for each pixel, all bands.
    Bip,
}

impl Interleave {
    fn parse(s: &str) -> Result<Self, AnalysisError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bsq" => Ok(Interleave::Bsq),
            "bil" => Ok(Interleave::Bil),
            "bip" => Ok(Interleave::Bip),
            other => Err(AnalysisError::MalformedHeader(format!(
                "unknown interleave '{other}'"
            ))),
        }
    }
}

/// ENVI numeric data type codes that this loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    I32,
    F32,
    F64,
    U16,
    U32,
}

impl DataType {
    fn from_code(code: u32) -> Result<Self, AnalysisError> {
        match code {
            1 => Ok(DataType::U8),
            2 => Ok(DataType::I16),
            3 => Ok(DataType::I32),
            4 => Ok(DataType::F32),
            5 => Ok(DataType::F64),
            12 => Ok(DataType::U16),
            13 => Ok(DataType::U32),
            other => Err(AnalysisError::MalformedHeader(format!(
                "unsupported data type code {other}"
            ))),
        }
    }

    fn size(self) -> usize {
        match self {
            DataType::U8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::F32 | DataType::U32 => 4,
            DataType::F64 => 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A parsed ENVI `.hdr` file.
#[derive(Debug, Clone)]
pub struct Header {
    pub lines: usize,
    pub samples: usize,
    pub bands: usize,
    pub data_type: DataType,
    pub interleave: Interleave,
    pub header_offset: usize,
    pub big_endian: bool,
    /// All fields as raw text, keyed by lowercased name. Brace-delimited
    /// lists are stored without the braces.
    pub fields: BTreeMap<String, String>,
}

/// Parse ENVI header text: `key = value` lines, where a value starting with
/// `{` continues (possibly across lines) until the matching `}`.
pub fn parse_header(text: &str) -> Result<Header, AnalysisError> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();

    // Pending multi-line brace value.
    let mut open_key: Option<String> = None;
    let mut open_value = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(key) = open_key.take() {
            if let Some(end) = trimmed.find('}') {
                open_value.push(' ');
                open_value.push_str(&trimmed[..end]);
                fields.insert(key, open_value.trim().to_string());
                open_value = String::new();
            } else {
                open_value.push(' ');
                open_value.push_str(trimmed);
                open_key = Some(key);
            }
            continue;
        }

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("envi") {
            continue;
        }
        let Some(eq) = trimmed.find('=') else {
            // Stray line outside a brace block; ignore like other readers do.
            continue;
        };
        let key = trimmed[..eq].trim().to_ascii_lowercase();
        let value = trimmed[eq + 1..].trim();

        if let Some(rest) = value.strip_prefix('{') {
            if let Some(end) = rest.find('}') {
                fields.insert(key, rest[..end].trim().to_string());
            } else {
                open_key = Some(key);
                open_value = rest.trim().to_string();
            }
        } else {
            fields.insert(key, value.to_string());
        }
    }
    if let Some(key) = open_key {
        return Err(AnalysisError::MalformedHeader(format!(
            "unterminated brace list for '{key}'"
        )));
    }

    let lines = required_usize(&fields, "lines")?;
    let samples = required_usize(&fields, "samples")?;
    let bands = required_usize(&fields, "bands")?;
    let data_type = DataType::from_code(required_usize(&fields, "data type")? as u32)?;
    let interleave = Interleave::parse(
        fields
            .get("interleave")
            .ok_or_else(|| AnalysisError::MalformedHeader("missing 'interleave'".into()))?,
    )?;
    let header_offset = match fields.get("header offset") {
        Some(v) => parse_usize("header offset", v)?,
        None => 0,
    };
    let big_endian = match fields.get("byte order") {
        Some(v) => parse_usize("byte order", v)? == 1,
        None => false,
    };

    if lines == 0 || samples == 0 || bands == 0 {
        return Err(AnalysisError::MalformedHeader(format!(
            "degenerate cube shape {lines} x {samples} x {bands}"
        )));
    }

    Ok(Header {
        lines,
        samples,
        bands,
        data_type,
        interleave,
        header_offset,
        big_endian,
        fields,
    })
}

fn required_usize(fields: &BTreeMap<String, String>, key: &str) -> Result<usize, AnalysisError> {
    let value = fields
        .get(key)
        .ok_or_else(|| AnalysisError::MalformedHeader(format!("missing '{key}'")))?;
    parse_usize(key, value)
}

fn parse_usize(key: &str, value: &str) -> Result<usize, AnalysisError> {
    value.trim().parse::<usize>().map_err(|_| {
        AnalysisError::MalformedHeader(format!("'{key}' is not an integer: '{value}'"))
    })
}

/// Split a brace-list value on commas into trimmed, non-empty tokens.
fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Header {
    /// Interpret the display/wavelength fields into [`CubeMetadata`].
    ///
    /// `default bands` indices are taken as stored in the header, matching
    /// how the rest of this pipeline indexes bands from zero.
    pub fn metadata(&self) -> Result<CubeMetadata, AnalysisError> {
        let wavelengths = match self.fields.get("wavelength") {
            Some(value) => split_list(value)
                .iter()
                .map(|tok| {
                    tok.parse::<f64>().map_err(|_| {
                        AnalysisError::MalformedHeader(format!(
                            "wavelength entry '{tok}' is not a number"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?,
            None => Vec::new(),
        };
        let default_bands = match self.fields.get("default bands") {
            Some(value) => split_list(value)
                .iter()
                .map(|tok| {
                    tok.parse::<usize>().map_err(|_| {
                        AnalysisError::MalformedHeader(format!(
                            "default band '{tok}' is not an integer"
                        ))
                    })
                })
                .collect::<Result<Vec<usize>, _>>()?,
            None => Vec::new(),
        };
        Ok(CubeMetadata {
            wavelengths,
            default_bands,
            wavelength_units: self.fields.get("wavelength units").cloned(),
            raw: self.fields.clone(),
        })
    }

    /// Position of `(row, col, band)` in the data file, in element units.
    fn element_index(&self, row: usize, col: usize, band: usize) -> usize {
        match self.interleave {
            Interleave::Bsq => (band * self.lines + row) * self.samples + col,
            Interleave::Bil => (row * self.bands + band) * self.samples + col,
            Interleave::Bip => (row * self.samples + col) * self.bands + band,
        }
    }
}

// ---------------------------------------------------------------------------
// Cube loading
// ---------------------------------------------------------------------------

/// Load a cube from an ENVI header/data file pair.
pub fn load_cube(header_path: &Path, data_path: &Path) -> Result<Cube> {
    let text = fs::read_to_string(header_path)
        .with_context(|| format!("reading header {}", header_path.display()))?;
    let header = parse_header(&text)
        .with_context(|| format!("parsing header {}", header_path.display()))?;
    debug!(
        "header: {} lines x {} samples x {} bands, {:?} {:?}",
        header.lines, header.samples, header.bands, header.interleave, header.data_type
    );

    let bytes = fs::read(data_path)
        .with_context(|| format!("reading data file {}", data_path.display()))?;
    let data = decode_cube(&header, &bytes)
        .with_context(|| format!("decoding data file {}", data_path.display()))?;

    let metadata = header.metadata()?;
    Ok(Cube::new(data, metadata)?)
}

/// Decode the raw data file into a `(lines, samples, bands)` array.
fn decode_cube(header: &Header, bytes: &[u8]) -> Result<Array3<f64>> {
    let n_elements = header.lines * header.samples * header.bands;
    let elem_size = header.data_type.size();
    let needed = header.header_offset + n_elements * elem_size;
    if bytes.len() < needed {
        bail!(
            "data file holds {} bytes, expected at least {needed} \
             ({} x {} x {} elements of {elem_size} bytes, offset {})",
            bytes.len(),
            header.lines,
            header.samples,
            header.bands,
            header.header_offset
        );
    }
    let payload = &bytes[header.header_offset..];

    let mut cube = Array3::zeros((header.lines, header.samples, header.bands));
    for row in 0..header.lines {
        for col in 0..header.samples {
            for band in 0..header.bands {
                let offset = header.element_index(row, col, band) * elem_size;
                let chunk = &payload[offset..offset + elem_size];
                cube[[row, col, band]] = decode_value(header.data_type, header.big_endian, chunk)?;
            }
        }
    }
    Ok(cube)
}

fn decode_value(data_type: DataType, big_endian: bool, chunk: &[u8]) -> Result<f64> {
    macro_rules! convert {
        ($ty:ty) => {{
            let raw: [u8; std::mem::size_of::<$ty>()] = chunk.try_into()?;
            let v = if big_endian {
                <$ty>::from_be_bytes(raw)
            } else {
                <$ty>::from_le_bytes(raw)
            };
            v as f64
        }};
    }
    Ok(match data_type {
        DataType::U8 => convert!(u8),
        DataType::I16 => convert!(i16),
        DataType::I32 => convert!(i32),
        DataType::F32 => convert!(f32),
        DataType::F64 => convert!(f64),
        DataType::U16 => convert!(u16),
        DataType::U32 => convert!(u32),
    })
}

// ---------------------------------------------------------------------------
// Cube writing (sample generator + round-trip tests)
// ---------------------------------------------------------------------------

/// Write a cube as an ENVI pair: little-endian `f32` in BIP order.
pub fn write_cube(header_path: &Path, data_path: &Path, cube: &Cube) -> Result<()> {
    let (rows, cols, bands) = (cube.rows(), cube.cols(), cube.bands());

    let mut header = String::from("ENVI\n");
    header.push_str("description = {synthetic reflectance cube written by cubelens}\n");
    header.push_str(&format!("samples = {cols}\n"));
    header.push_str(&format!("lines = {rows}\n"));
    header.push_str(&format!("bands = {bands}\n"));
    header.push_str("header offset = 0\n");
    header.push_str("file type = ENVI Standard\n");
    header.push_str("data type = 4\n");
    header.push_str("interleave = bip\n");
    header.push_str("byte order = 0\n");
    if let Some(units) = &cube.metadata.wavelength_units {
        header.push_str(&format!("wavelength units = {units}\n"));
    }
    if !cube.metadata.default_bands.is_empty() {
        let list: Vec<String> = cube
            .metadata
            .default_bands
            .iter()
            .map(|b| b.to_string())
            .collect();
        header.push_str(&format!("default bands = {{{}}}\n", list.join(", ")));
    }
    if !cube.metadata.wavelengths.is_empty() {
        let list: Vec<String> = cube
            .metadata
            .wavelengths
            .iter()
            .map(|w| format!("{w:.3}"))
            .collect();
        header.push_str(&format!("wavelength = {{{}}}\n", list.join(", ")));
    }
    fs::write(header_path, header)
        .with_context(|| format!("writing header {}", header_path.display()))?;

    let mut out = Vec::with_capacity(rows * cols * bands * 4);
    let data = cube.data();
    for row in 0..rows {
        for col in 0..cols {
            for band in 0..bands {
                out.extend_from_slice(&(data[[row, col, band]] as f32).to_le_bytes());
            }
        }
    }
    let mut file = fs::File::create(data_path)
        .with_context(|| format!("creating data file {}", data_path.display()))?;
    file.write_all(&out)
        .with_context(|| format!("writing data file {}", data_path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CubeMetadata;

    const HEADER: &str = "\
ENVI
description = {
  Reflectance capture, 2020-09-10 }
samples = 3
lines = 2
bands = 4
header offset = 0
data type = 4
interleave = bil
byte order = 0
wavelength units = nm
default bands = {2, 1, 0}
wavelength = {450.0, 550.0,
  650.0, 750.0}
";

    #[test]
    fn parses_fields_and_brace_lists() {
        let header = parse_header(HEADER).unwrap();
        assert_eq!(header.lines, 2);
        assert_eq!(header.samples, 3);
        assert_eq!(header.bands, 4);
        assert_eq!(header.data_type, DataType::F32);
        assert_eq!(header.interleave, Interleave::Bil);
        assert!(!header.big_endian);

        let metadata = header.metadata().unwrap();
        assert_eq!(metadata.wavelengths, vec![450.0, 550.0, 650.0, 750.0]);
        assert_eq!(metadata.default_bands, vec![2, 1, 0]);
        assert_eq!(metadata.wavelength_units.as_deref(), Some("nm"));
        assert!(metadata.raw["description"].contains("2020-09-10"));
    }

    #[test]
    fn missing_required_key_is_malformed() {
        let err = parse_header("ENVI\nsamples = 3\nbands = 4\n").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedHeader(_)));
    }

    #[test]
    fn unterminated_brace_list_is_malformed() {
        let text = "ENVI\nlines = 1\nsamples = 1\nbands = 1\ndata type = 4\n\
                    interleave = bip\nwavelength = {450.0, 550.0\n";
        assert!(matches!(
            parse_header(text),
            Err(AnalysisError::MalformedHeader(_))
        ));
    }

    #[test]
    fn element_index_per_interleave() {
        let mut header = parse_header(HEADER).unwrap();
        // (row=1, col=2, band=3) in a 2x3x4 cube.
        header.interleave = Interleave::Bsq;
        assert_eq!(header.element_index(1, 2, 3), (3 * 2 + 1) * 3 + 2);
        header.interleave = Interleave::Bil;
        assert_eq!(header.element_index(1, 2, 3), (1 * 4 + 3) * 3 + 2);
        header.interleave = Interleave::Bip;
        assert_eq!(header.element_index(1, 2, 3), (1 * 3 + 2) * 4 + 3);
    }

    #[test]
    fn short_data_file_is_rejected() {
        let header = parse_header(HEADER).unwrap();
        // 2 * 3 * 4 f32 values need 96 bytes.
        let err = decode_cube(&header, &[0u8; 40]).unwrap_err();
        assert!(err.to_string().contains("expected at least"));
    }

    #[test]
    fn write_then_load_roundtrip() {
        let data = ndarray::Array3::from_shape_fn((4, 5, 3), |(r, c, b)| {
            (r as f64) + (c as f64) / 10.0 + (b as f64) / 100.0
        });
        let metadata = CubeMetadata {
            wavelengths: vec![450.0, 550.0, 650.0],
            default_bands: vec![2, 1, 0],
            wavelength_units: Some("nm".to_string()),
            raw: Default::default(),
        };
        let cube = Cube::new(data, metadata).unwrap();

        let dir = std::env::temp_dir().join(format!("cubelens-envi-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let hdr = dir.join("roundtrip.hdr");
        let dat = dir.join("roundtrip.dat");
        write_cube(&hdr, &dat, &cube).unwrap();

        let loaded = load_cube(&hdr, &dat).unwrap();
        assert_eq!(loaded.rows(), 4);
        assert_eq!(loaded.cols(), 5);
        assert_eq!(loaded.bands(), 3);
        assert_eq!(loaded.metadata.default_bands, vec![2, 1, 0]);
        for ((idx, &a), &b) in loaded
            .data()
            .indexed_iter()
            .zip(cube.data().iter())
        {
            assert!((a - b).abs() < 1e-6, "mismatch at {idx:?}: {a} vs {b}");
        }

        fs::remove_dir_all(&dir).ok();
    }
}
