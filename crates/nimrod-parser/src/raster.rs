//! In-memory raster store: payload decode and bounding-box clipping.

use bytes::Bytes;
use raster_common::BoundingBox;

use crate::error::{NimrodError, Result};
use crate::header::{
    expect_record_marker, parse_header, read_record_marker, DataKind, RasterHeader,
    HEADER_RECORD_LEN, RECORD_MARKER_LEN,
};

/// A decoded NIMROD raster: header metadata plus the row-major cell array.
///
/// Row 0 is the northernmost row. The cell array length always equals
/// `ncols * nrows`; clipping re-establishes this invariant.
///
/// A store has a single owner. `clip` mutates in place and is not safe to
/// call concurrently on the same instance from multiple threads without
/// external synchronization; callers batching many files should decode one
/// store per file and parallelize across stores instead.
#[derive(Debug, Clone)]
pub struct RasterStore {
    header: RasterHeader,
    cells: Vec<f32>,
}

/// Decode a complete NIMROD byte image into a raster store.
///
/// Parses the 512-byte header record, selects the version layout, then
/// decodes the payload record into `f32` cells (i16/i32/f32 payloads all
/// widen losslessly). Cell values are stored exactly as they appear in the
/// file; the header's `scale_factor` is never applied.
pub fn decode(data: Bytes) -> Result<RasterStore> {
    let header = parse_header(&data)?;
    let layout = header.format_version.layout();

    let cell_count = header
        .ncols
        .checked_mul(header.nrows)
        .ok_or_else(|| NimrodError::malformed("raster dimensions overflow"))?;
    let payload_len = cell_count
        .checked_mul(header.element_width)
        .ok_or_else(|| NimrodError::malformed("payload size overflows"))?;

    // The payload record marker encodes the size in elements (1.7) or in
    // bytes (2.6-4); either way it must agree with the header dimensions.
    let expected_marker = if layout.payload_marker_in_bytes {
        payload_len
    } else {
        cell_count
    };

    let mut offset = HEADER_RECORD_LEN;
    let marker = read_record_marker(&data, offset, "data start")? as usize;
    if marker != expected_marker {
        return Err(NimrodError::malformed(format!(
            "payload record length {marker} does not match declared {} rows x {} cols \
             of {}-byte cells (expected {expected_marker})",
            header.nrows, header.ncols, header.element_width
        )));
    }
    offset += RECORD_MARKER_LEN;

    if data.len() < offset + payload_len + RECORD_MARKER_LEN {
        return Err(NimrodError::malformed(format!(
            "truncated payload: need {} bytes, file has {}",
            offset + payload_len + RECORD_MARKER_LEN,
            data.len()
        )));
    }
    let cells = decode_cells(
        &data[offset..offset + payload_len],
        header.data_kind,
        header.element_width,
    );
    offset += payload_len;
    expect_record_marker(&data, offset, expected_marker as u32, "data end")?;

    tracing::debug!(
        version = %header.format_version,
        ncols = header.ncols,
        nrows = header.nrows,
        valid_time = %header.valid_time,
        "decoded NIMROD raster"
    );

    Ok(RasterStore { header, cells })
}

fn decode_cells(payload: &[u8], kind: DataKind, width: usize) -> Vec<f32> {
    match (kind, width) {
        (DataKind::Integer, 2) => payload
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_be_bytes([c[0], c[1]])))
            .collect(),
        (DataKind::Integer, _) => payload
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        (DataKind::Real, _) => payload
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

impl RasterStore {
    /// Read-only header metadata, for logging and inspection.
    pub fn header(&self) -> &RasterHeader {
        &self.header
    }

    /// The row-major cell array (`nrows` rows of `ncols` values, row 0
    /// northernmost). Sentinel cells carry the raw `no_data_value`.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Cell value at (col, row), or `None` when the index is out of range or
    /// the cell holds the no-data sentinel.
    ///
    /// Sentinel classification is exact `f32` equality against the header's
    /// `no_data_value`; both sides come through the same decode path, so no
    /// tolerance is needed and no numeric cell can be misclassified.
    pub fn value_at(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.header.ncols || row >= self.header.nrows {
            return None;
        }
        let value = self.cells[row * self.header.ncols + col];
        if value == self.header.no_data_value {
            None
        } else {
            Some(value)
        }
    }

    /// Validity time formatted as `YYYYMMDDHHMM`, the conventional stem for
    /// per-timestep output file names.
    pub fn validity_time_compact(&self) -> String {
        self.header.valid_time.format("%Y%m%d%H%M").to_string()
    }

    /// Human-readable summary of the raster's metadata and extent.
    pub fn describe(&self) -> String {
        let h = &self.header;
        let extent = h.geometry().extent();
        let mut out = String::new();
        out.push_str(&format!(
            "NIMROD raster, format version {}\n",
            h.format_version
        ));
        out.push_str(&format!(
            "Validity time: {}\n",
            h.valid_time.format("%H:%M on %d/%m/%Y")
        ));
        out.push_str(&format!(
            "Field: {} ({}, {})\n",
            h.field_title, h.units, h.data_source
        ));
        out.push_str(&format!(
            "Easting range:  {} - {} (cell size {})\n",
            extent.min_x, extent.max_x, h.cell_size_x
        ));
        out.push_str(&format!(
            "Northing range: {} - {} (cell size {})\n",
            extent.min_y, extent.max_y, h.cell_size_y
        ));
        out.push_str(&format!(
            "Image size: {} rows x {} cols\n",
            h.nrows, h.ncols
        ));
        out
    }

    /// Clip the raster in place to a bounding box.
    ///
    /// The box is interpreted against the store's *current* extent, so after
    /// a first clip has shrunk the raster, a second clip must be expressed in
    /// the already-shrunk coordinates. Selected cells are copied verbatim
    /// (no-data sentinels included); only the extent changes. The new origin
    /// snaps to the original grid's cell boundaries, not to the requested box
    /// edge.
    ///
    /// Fails with `BoundingBoxOutOfRange` and leaves the store untouched when
    /// the box does not intersect the current extent.
    pub fn clip(&mut self, bbox: &BoundingBox) -> Result<()> {
        let geometry = self.header.geometry();
        let (cols, rows) = geometry.select(bbox).ok_or_else(|| {
            NimrodError::BoundingBoxOutOfRange {
                requested: format!("{bbox:?}"),
                extent: format!("{:?}", geometry.extent()),
            }
        })?;

        let (new_ncols, new_nrows) = (cols.len(), rows.len());
        let mut clipped = Vec::with_capacity(new_ncols * new_nrows);
        for row in rows.clone() {
            let base = row * self.header.ncols;
            clipped.extend_from_slice(&self.cells[base + cols.start..base + cols.end]);
        }

        self.header.top_left_x += cols.start as f64 * self.header.cell_size_x;
        self.header.top_left_y -= rows.start as f64 * self.header.cell_size_y;
        self.header.ncols = new_ncols;
        self.header.nrows = new_nrows;
        self.cells = clipped;
        debug_assert_eq!(self.cells.len(), self.header.ncols * self.header.nrows);

        tracing::debug!(
            ncols = new_ncols,
            nrows = new_nrows,
            top_left_x = self.header.top_left_x,
            top_left_y = self.header.top_left_y,
            "clipped raster to bounding box"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{encode_test_file, sequential_cells, TestFileSpec};

    fn decode_default() -> RasterStore {
        let spec = TestFileSpec::default();
        decode(Bytes::from(encode_test_file(&spec, &sequential_cells(4, 3)))).unwrap()
    }

    #[test]
    fn test_decode_payload_row_major() {
        let store = decode_default();
        assert_eq!(store.cells().len(), 12);
        assert_eq!(store.cells()[0], 1.0);
        assert_eq!(store.cells()[4], 5.0); // first cell of row 1
        assert_eq!(store.cells()[11], 12.0);
    }

    #[test]
    fn test_payload_marker_mismatch() {
        let spec = TestFileSpec::default();
        let mut bytes = encode_test_file(&spec, &sequential_cells(4, 3));
        // Corrupt the payload record marker.
        bytes[520 + 3] ^= 0x01;
        let err = decode(Bytes::from(bytes)).unwrap_err();
        assert!(matches!(err, NimrodError::MalformedHeader(_)), "{err}");
    }

    #[test]
    fn test_value_at_tri_state() {
        let spec = TestFileSpec::default();
        let mut cells = sequential_cells(4, 3);
        cells[5] = -999.0; // (col 1, row 1)
        let store = decode(Bytes::from(encode_test_file(&spec, &cells))).unwrap();

        assert_eq!(store.value_at(0, 0), Some(1.0));
        assert_eq!(store.value_at(1, 1), None);
        assert_eq!(store.value_at(4, 0), None);
    }

    #[test]
    fn test_clip_updates_extent_and_cells() {
        let mut store = decode_default();
        let bbox = BoundingBox::new(601000.0, 217000.0, 604000.0, 219000.0);
        store.clip(&bbox).unwrap();

        let h = store.header();
        assert_eq!(h.ncols, 3);
        assert_eq!(h.nrows, 2);
        assert_eq!(h.top_left_x, 601000.0);
        assert_eq!(h.top_left_y, 219000.0);
        assert_eq!(store.cells(), &[6.0, 7.0, 8.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_clip_out_of_range_leaves_store_unmodified() {
        let mut store = decode_default();
        let before_header = format!("{:?}", store.header());
        let before_cells = store.cells().to_vec();

        let bbox = BoundingBox::new(900000.0, 100000.0, 901000.0, 101000.0);
        let err = store.clip(&bbox).unwrap_err();
        assert!(matches!(err, NimrodError::BoundingBoxOutOfRange { .. }), "{err}");
        assert_eq!(format!("{:?}", store.header()), before_header);
        assert_eq!(store.cells(), before_cells.as_slice());
    }

    #[test]
    fn test_validity_time_compact() {
        let store = decode_default();
        assert_eq!(store.validity_time_compact(), "200802252000");
    }

    #[test]
    fn test_describe_mentions_extent() {
        let store = decode_default();
        let summary = store.describe();
        assert!(summary.contains("600000 - 604000"), "{summary}");
        assert!(summary.contains("3 rows x 4 cols"), "{summary}");
    }
}
