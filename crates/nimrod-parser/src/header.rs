//! NIMROD header parsing.
//!
//! A NIMROD file is a sequence of Fortran unformatted records, each framed by
//! a 4-byte big-endian record-length marker. The first record is always the
//! 512-byte header; the second is the cell payload. The header is laid out as
//! five fixed blocks, with every multi-byte field stored big-endian:
//!
//! - 31 general integer entries (i16), elements 1-31
//! - 28 general real entries (f32), elements 32-59
//! - data-specific real entries (f32), count depends on the format version
//! - 56 bytes of character entries (units, data source, field title)
//! - data-specific integer entries (i16), count depends on the format version
//!
//! The header-release entry (element 18) discriminates the two supported
//! format versions. Both versions share the general blocks, so the
//! geolocation entries sit at the same offsets; the data-specific blocks
//! differ in length, which shifts everything after them.

use chrono::{DateTime, NaiveDate, Utc};
use raster_common::GridGeometry;
use serde::{Deserialize, Serialize};

use crate::error::{NimrodError, Result};

/// Length of a Fortran record-length marker.
pub(crate) const RECORD_MARKER_LEN: usize = 4;

/// Fixed size of the NIMROD header record, excluding its framing markers.
pub(crate) const HEADER_LEN: usize = 512;

/// Total bytes consumed by the header record: marker + header + marker.
pub(crate) const HEADER_RECORD_LEN: usize = RECORD_MARKER_LEN + HEADER_LEN + RECORD_MARKER_LEN;

const GENERAL_INT_COUNT: usize = 31;
const GENERAL_REAL_COUNT: usize = 28;
const CHARACTER_BLOCK_LEN: usize = 56;

/// Supported NIMROD format versions, discriminated by the header-release
/// entry (element 18).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Format specification 1.7 (header release 1).
    V1_7,
    /// Format specification 2.6-4 (header release 2).
    V2_6_4,
}

/// Per-version block counts and conventions. Selected once at decode entry;
/// no further version branching afterwards.
pub(crate) struct Layout {
    /// Entries in the data-specific real block.
    pub data_specific_reals: usize,
    /// Entries in the data-specific integer block.
    pub data_specific_ints: usize,
    /// Whether the payload record marker counts bytes (2.6-4) or elements
    /// (1.7).
    pub payload_marker_in_bytes: bool,
}

impl FormatVersion {
    pub(crate) fn layout(self) -> Layout {
        match self {
            FormatVersion::V1_7 => Layout {
                data_specific_reals: 32,
                data_specific_ints: 77,
                payload_marker_in_bytes: false,
            },
            FormatVersion::V2_6_4 => Layout {
                data_specific_reals: 45,
                data_specific_ints: 51,
                payload_marker_in_bytes: true,
            },
        }
    }

    fn from_header_release(release: i16) -> Result<Self> {
        match release {
            1 => Ok(FormatVersion::V1_7),
            2 => Ok(FormatVersion::V2_6_4),
            other => Err(NimrodError::malformed(format!(
                "unsupported header release number {other} (expected 1 or 2)"
            ))),
        }
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatVersion::V1_7 => write!(f, "1.7"),
            FormatVersion::V2_6_4 => write!(f, "2.6-4"),
        }
    }
}

/// How cell values are stored in the payload (general integer entry 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    /// IEEE floating-point cells.
    Real,
    /// Signed integer cells.
    Integer,
}

/// Decoded NIMROD header metadata.
///
/// Immutable after decode except for the four extent fields (`ncols`,
/// `nrows`, `top_left_x`, `top_left_y`) that clipping updates.
#[derive(Debug, Clone, Serialize)]
pub struct RasterHeader {
    /// Format version read from the header-release entry.
    pub format_version: FormatVersion,
    /// Validity time assembled from header elements 1-6.
    pub valid_time: DateTime<Utc>,
    /// Number of columns in the raster.
    pub ncols: usize,
    /// Number of rows in the raster.
    pub nrows: usize,
    /// Cell size in the x direction (grid units, typically metres).
    pub cell_size_x: f64,
    /// Cell size in the y direction.
    pub cell_size_y: f64,
    /// X coordinate of the raster's top-left corner.
    pub top_left_x: f64,
    /// Y coordinate of the raster's top-left corner. Row 0 is the
    /// northernmost row; y decreases as the row index increases.
    pub top_left_y: f64,
    /// Sentinel cell value meaning "no observation". Kept raw for file
    /// fidelity; see `RasterStore::value_at` for the tri-state view.
    pub no_data_value: f32,
    /// MKS multiplier converting stored cell values to physical units.
    /// Never applied by the decoder: cell values stay as stored, and ASCII
    /// export writes the raw values. Callers wanting physical units multiply
    /// by this themselves.
    pub scale_factor: f32,
    /// How payload cells are stored.
    pub data_kind: DataKind,
    /// Bytes per payload cell (2 or 4), from header element 13.
    pub element_width: usize,
    /// Units string (character element 105).
    pub units: String,
    /// Data source string (character element 106).
    pub data_source: String,
    /// Field title string (character element 107).
    pub field_title: String,
}

impl RasterHeader {
    /// The raster's grid geometry, used for extent and index arithmetic.
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(
            self.ncols,
            self.nrows,
            self.cell_size_x,
            self.cell_size_y,
            self.top_left_x,
            self.top_left_y,
        )
    }
}

/// Read a 4-byte big-endian Fortran record-length marker.
pub(crate) fn read_record_marker(data: &[u8], offset: usize, location: &str) -> Result<u32> {
    if data.len() < offset + RECORD_MARKER_LEN {
        return Err(NimrodError::malformed(format!(
            "truncated record length at {location}"
        )));
    }
    Ok(u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

pub(crate) fn expect_record_marker(
    data: &[u8],
    offset: usize,
    expected: u32,
    location: &str,
) -> Result<()> {
    let actual = read_record_marker(data, offset, location)?;
    if actual != expected {
        return Err(NimrodError::malformed(format!(
            "incorrect record length {actual} bytes (expected {expected}) at {location}"
        )));
    }
    Ok(())
}

fn read_i16_block<const N: usize>(block: &[u8]) -> [i16; N] {
    let mut out = [0i16; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = i16::from_be_bytes([block[2 * i], block[2 * i + 1]]);
    }
    out
}

fn read_f32_block<const N: usize>(block: &[u8]) -> [f32; N] {
    let mut out = [0f32; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = f32::from_be_bytes([
            block[4 * i],
            block[4 * i + 1],
            block[4 * i + 2],
            block[4 * i + 3],
        ]);
    }
    out
}

/// Character entries are space-padded and may carry trailing NULs.
fn read_string(block: &[u8]) -> String {
    String::from_utf8_lossy(block)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

fn assemble_valid_time(ints: &[i16; GENERAL_INT_COUNT]) -> Result<DateTime<Utc>> {
    let (year, month, day, hour, minute, second) =
        (ints[0], ints[1], ints[2], ints[3], ints[4], ints[5]);
    let invalid = || NimrodError::InvalidDatetime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    };

    if year < 0 || month < 0 || day < 0 || hour < 0 || minute < 0 || second < 0 {
        return Err(invalid());
    }

    NaiveDate::from_ymd_opt(i32::from(year), month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(invalid)
}

/// Parse the header record at the start of a NIMROD byte image.
///
/// Consumes exactly `HEADER_RECORD_LEN` bytes: the leading record marker, the
/// 512-byte header, and the trailing marker. The payload record follows
/// immediately after.
pub fn parse_header(data: &[u8]) -> Result<RasterHeader> {
    expect_record_marker(data, 0, HEADER_LEN as u32, "header start")?;

    if data.len() < HEADER_RECORD_LEN {
        return Err(NimrodError::malformed(format!(
            "file too short for header record: {} bytes (need {HEADER_RECORD_LEN})",
            data.len()
        )));
    }
    let header = &data[RECORD_MARKER_LEN..RECORD_MARKER_LEN + HEADER_LEN];

    let gen_ints: [i16; GENERAL_INT_COUNT] = read_i16_block(header);
    let gen_reals: [f32; GENERAL_REAL_COUNT] = read_f32_block(&header[2 * GENERAL_INT_COUNT..]);

    // Element 18 (header release number) discriminates the layout.
    let format_version = FormatVersion::from_header_release(gen_ints[17])?;
    let layout = format_version.layout();

    // The five blocks must tile the 512-byte header exactly.
    let characters_offset = 2 * GENERAL_INT_COUNT + 4 * GENERAL_REAL_COUNT
        + 4 * layout.data_specific_reals;
    debug_assert_eq!(
        characters_offset + CHARACTER_BLOCK_LEN + 2 * layout.data_specific_ints,
        HEADER_LEN
    );
    let characters = &header[characters_offset..characters_offset + CHARACTER_BLOCK_LEN];

    expect_record_marker(
        data,
        RECORD_MARKER_LEN + HEADER_LEN,
        HEADER_LEN as u32,
        "header end",
    )?;

    let valid_time = assemble_valid_time(&gen_ints)?;

    // Element 12: data kind; element 13: bytes per datum.
    let data_kind = match gen_ints[11] {
        0 => DataKind::Real,
        1 => DataKind::Integer,
        other => {
            return Err(NimrodError::malformed(format!(
                "unsupported data kind {other} (expected 0=real or 1=integer)"
            )))
        }
    };
    let element_width = match (data_kind, gen_ints[12]) {
        (DataKind::Integer, 2) => 2,
        (DataKind::Integer, 4) | (DataKind::Real, 4) => 4,
        (kind, other) => {
            return Err(NimrodError::malformed(format!(
                "unsupported element width {other} for {kind:?} cells"
            )))
        }
    };

    // Elements 16 and 17: rows and columns.
    let nrows = gen_ints[15];
    let ncols = gen_ints[16];
    if nrows <= 0 || ncols <= 0 {
        return Err(NimrodError::malformed(format!(
            "non-positive raster dimensions: {nrows} rows x {ncols} cols"
        )));
    }

    Ok(RasterHeader {
        format_version,
        valid_time,
        ncols: ncols as usize,
        nrows: nrows as usize,
        // Elements 34-37: northing of top-left, y interval, easting of
        // top-left, x interval. Element 38: missing data value, 39: MKS
        // scale factor. General real elements start at 32.
        top_left_y: f64::from(gen_reals[2]),
        cell_size_y: f64::from(gen_reals[3]),
        top_left_x: f64::from(gen_reals[4]),
        cell_size_x: f64::from(gen_reals[5]),
        no_data_value: gen_reals[6],
        scale_factor: gen_reals[7],
        data_kind,
        element_width,
        units: read_string(&characters[0..8]),
        data_source: read_string(&characters[8..32]),
        field_title: read_string(&characters[32..55]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{encode_test_file, TestFileSpec};

    #[test]
    fn test_parse_header_fields() {
        let spec = TestFileSpec::default();
        let bytes = encode_test_file(&spec, &[0.0; 12]);
        let header = parse_header(&bytes).unwrap();

        assert_eq!(header.format_version, FormatVersion::V2_6_4);
        assert_eq!(header.ncols, 4);
        assert_eq!(header.nrows, 3);
        assert_eq!(header.top_left_x, 600000.0);
        assert_eq!(header.top_left_y, 220000.0);
        assert_eq!(header.cell_size_x, 1000.0);
        assert_eq!(header.cell_size_y, 1000.0);
        assert_eq!(header.no_data_value, -999.0);
        assert_eq!(header.units, "mm/hr*32");
        assert_eq!(header.valid_time.to_rfc3339(), "2008-02-25T20:00:00+00:00");
    }

    #[test]
    fn test_unsupported_header_release() {
        let spec = TestFileSpec {
            header_release: 7,
            ..TestFileSpec::default()
        };
        let bytes = encode_test_file(&spec, &[0.0; 12]);
        let err = parse_header(&bytes).unwrap_err();
        assert!(matches!(err, NimrodError::MalformedHeader(_)), "{err}");
    }

    #[test]
    fn test_invalid_datetime() {
        let spec = TestFileSpec {
            valid_time: (2008, 13, 25, 20, 0, 0),
            ..TestFileSpec::default()
        };
        let bytes = encode_test_file(&spec, &[0.0; 12]);
        let err = parse_header(&bytes).unwrap_err();
        assert!(matches!(err, NimrodError::InvalidDatetime { month: 13, .. }), "{err}");
    }

    #[test]
    fn test_bad_record_marker() {
        let spec = TestFileSpec::default();
        let mut bytes = encode_test_file(&spec, &[0.0; 12]);
        bytes[3] = 0xff;
        let err = parse_header(&bytes).unwrap_err();
        assert!(matches!(err, NimrodError::MalformedHeader(_)), "{err}");
    }

    #[test]
    fn test_truncated_header() {
        let spec = TestFileSpec::default();
        let bytes = encode_test_file(&spec, &[0.0; 12]);
        let err = parse_header(&bytes[..100]).unwrap_err();
        assert!(matches!(err, NimrodError::MalformedHeader(_)), "{err}");
    }
}
