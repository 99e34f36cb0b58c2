//! ESRI ASCII grid export.

use crate::error::{NimrodError, Result};
use crate::raster::RasterStore;

/// Width of the key column in the ASCII grid header block.
const KEY_WIDTH: usize = 14;

/// Serialize a raster store to ESRI ASCII grid text.
///
/// The output is the fixed six-line header followed by one line per raster
/// row, northernmost first, cells space-separated:
///
/// ```text
/// ncols         4
/// nrows         3
/// xllcorner     600000
/// yllcorner     217000
/// cellsize      1000
/// NODATA_value  -999
/// 1 2 3 4
/// ...
/// ```
///
/// `yllcorner` anchors the grid's *bottom-left* corner, so it is derived as
/// `top_left_y - nrows * cell_size_y`; `xllcorner` is the top-left x
/// unchanged. Every number is written with Rust's shortest round-trip float
/// formatting: integral values print without a decimal point and every value
/// re-parses to exactly the stored `f32`/`f64`, so dimensions and spacing
/// survive a round trip losslessly. No-data cells hold the raw sentinel and
/// go through the same formatter as the `NODATA_value` header line, so the
/// token matches byte-for-byte.
///
/// Fails with `InconsistentCellSize` when the cells are not square; the
/// format has a single `cellsize` field.
pub fn encode_ascii(store: &RasterStore) -> Result<String> {
    let header = store.header();
    if header.cell_size_x != header.cell_size_y {
        return Err(NimrodError::InconsistentCellSize {
            x: header.cell_size_x,
            y: header.cell_size_y,
        });
    }

    let yllcorner = header.top_left_y - header.nrows as f64 * header.cell_size_y;

    // Rough estimate: 8 bytes per cell plus the header block.
    let mut out = String::with_capacity(128 + 8 * store.cells().len());
    push_header_line(&mut out, "ncols", header.ncols);
    push_header_line(&mut out, "nrows", header.nrows);
    push_header_line(&mut out, "xllcorner", header.top_left_x);
    push_header_line(&mut out, "yllcorner", yllcorner);
    push_header_line(&mut out, "cellsize", header.cell_size_x);
    push_header_line(&mut out, "NODATA_value", header.no_data_value);

    for row in store.cells().chunks_exact(header.ncols) {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }

    tracing::debug!(
        ncols = header.ncols,
        nrows = header.nrows,
        "encoded raster to ASCII grid"
    );
    Ok(out)
}

fn push_header_line(out: &mut String, key: &str, value: impl ToString) {
    out.push_str(&format!(
        "{key:<width$}{}\n",
        value.to_string(),
        width = KEY_WIDTH
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::decode;
    use crate::testdata::{encode_test_file, sequential_cells, TestFileSpec};
    use bytes::Bytes;

    #[test]
    fn test_header_block_layout() {
        let spec = TestFileSpec::default();
        let store = decode(Bytes::from(encode_test_file(&spec, &sequential_cells(4, 3)))).unwrap();
        let text = encode_ascii(&store).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ncols         4");
        assert_eq!(lines[1], "nrows         3");
        assert_eq!(lines[2], "xllcorner     600000");
        assert_eq!(lines[3], "yllcorner     217000");
        assert_eq!(lines[4], "cellsize      1000");
        assert_eq!(lines[5], "NODATA_value  -999");
        assert_eq!(lines[6], "1 2 3 4");
        assert_eq!(lines[8], "9 10 11 12");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_sentinel_cells_written_verbatim() {
        let spec = TestFileSpec::default();
        let mut cells = sequential_cells(4, 3);
        cells[6] = -999.0;
        let store = decode(Bytes::from(encode_test_file(&spec, &cells))).unwrap();
        let text = encode_ascii(&store).unwrap();
        assert!(text.contains("5 6 -999 8\n"), "{text}");
    }

    #[test]
    fn test_fractional_values_round_trip() {
        let spec = TestFileSpec {
            data_kind_real: true,
            element_width: 4,
            ..TestFileSpec::default()
        };
        let mut cells = sequential_cells(4, 3);
        cells[0] = 0.03125;
        let store = decode(Bytes::from(encode_test_file(&spec, &cells))).unwrap();
        let text = encode_ascii(&store).unwrap();

        let first_row = text.lines().nth(6).unwrap();
        let reparsed: f32 = first_row.split(' ').next().unwrap().parse().unwrap();
        assert_eq!(reparsed, 0.03125);
    }

    #[test]
    fn test_non_square_cells_rejected() {
        let spec = TestFileSpec {
            cell_size_y: 2000.0,
            ..TestFileSpec::default()
        };
        let store = decode(Bytes::from(encode_test_file(&spec, &sequential_cells(4, 3)))).unwrap();
        let err = encode_ascii(&store).unwrap_err();
        assert!(
            matches!(err, NimrodError::InconsistentCellSize { x, y } if x == 1000.0 && y == 2000.0),
            "{err}"
        );
    }
}
