//! Synthetic NIMROD file generation for tests.
//!
//! Real NIMROD composites are large and not redistributable, so tests build
//! small byte images with known header fields and cell patterns instead.
//! `encode_test_file` is the mirror image of the decoder: it emits the
//! record markers, the five header blocks for the requested version layout,
//! and the payload in the requested cell encoding.

/// Header fields and payload encoding for a synthetic NIMROD file.
#[derive(Debug, Clone)]
pub struct TestFileSpec {
    /// Header release number (element 18): 1 for v1.7, 2 for v2.6-4. Other
    /// values produce a structurally valid 512-byte header that the decoder
    /// must reject.
    pub header_release: i16,
    /// Encode the payload as IEEE floats rather than integers.
    pub data_kind_real: bool,
    /// Bytes per payload cell (2 or 4).
    pub element_width: i16,
    pub ncols: i16,
    pub nrows: i16,
    /// Validity time as (year, month, day, hour, minute, second).
    pub valid_time: (i16, i16, i16, i16, i16, i16),
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub cell_size_x: f32,
    pub cell_size_y: f32,
    pub no_data_value: f32,
    pub scale_factor: f32,
    pub units: &'static str,
    pub data_source: &'static str,
    pub field_title: &'static str,
}

impl Default for TestFileSpec {
    fn default() -> Self {
        Self {
            header_release: 2,
            data_kind_real: false,
            element_width: 2,
            ncols: 4,
            nrows: 3,
            valid_time: (2008, 2, 25, 20, 0, 0),
            top_left_x: 600000.0,
            top_left_y: 220000.0,
            cell_size_x: 1000.0,
            cell_size_y: 1000.0,
            no_data_value: -999.0,
            scale_factor: 32.0,
            units: "mm/hr*32",
            data_source: "radar",
            field_title: "Rainfall rate",
        }
    }
}

/// Cell values 1, 2, 3, ... in row-major order. Small integers survive every
/// supported payload encoding exactly.
pub fn sequential_cells(ncols: usize, nrows: usize) -> Vec<f32> {
    (1..=ncols * nrows).map(|v| v as f32).collect()
}

/// Encode a complete NIMROD byte image: header record, payload record, all
/// framing markers.
pub fn encode_test_file(spec: &TestFileSpec, cells: &[f32]) -> Vec<u8> {
    // Block counts per version layout; unknown release numbers get the
    // 2.6-4 counts so the header is still exactly 512 bytes.
    let (data_specific_reals, data_specific_ints, marker_in_bytes) = match spec.header_release {
        1 => (32usize, 77usize, false),
        _ => (45, 51, true),
    };

    let mut gen_ints = [0i16; 31];
    let (year, month, day, hour, minute, second) = spec.valid_time;
    gen_ints[0] = year;
    gen_ints[1] = month;
    gen_ints[2] = day;
    gen_ints[3] = hour;
    gen_ints[4] = minute;
    gen_ints[5] = second;
    gen_ints[11] = if spec.data_kind_real { 0 } else { 1 };
    gen_ints[12] = spec.element_width;
    gen_ints[15] = spec.nrows;
    gen_ints[16] = spec.ncols;
    gen_ints[17] = spec.header_release;

    let mut gen_reals = [0f32; 28];
    gen_reals[2] = spec.top_left_y;
    gen_reals[3] = spec.cell_size_y;
    gen_reals[4] = spec.top_left_x;
    gen_reals[5] = spec.cell_size_x;
    gen_reals[6] = spec.no_data_value;
    gen_reals[7] = spec.scale_factor;

    let mut header = Vec::with_capacity(512);
    for v in gen_ints {
        header.extend_from_slice(&v.to_be_bytes());
    }
    for v in gen_reals {
        header.extend_from_slice(&v.to_be_bytes());
    }
    header.extend(std::iter::repeat(0u8).take(4 * data_specific_reals));
    push_padded(&mut header, spec.units, 8);
    push_padded(&mut header, spec.data_source, 24);
    push_padded(&mut header, spec.field_title, 23);
    header.push(b' ');
    header.extend(std::iter::repeat(0u8).take(2 * data_specific_ints));
    assert_eq!(header.len(), 512);

    let mut payload = Vec::with_capacity(cells.len() * spec.element_width as usize);
    for &v in cells {
        match (spec.data_kind_real, spec.element_width) {
            (false, 2) => payload.extend_from_slice(&(v as i16).to_be_bytes()),
            (false, _) => payload.extend_from_slice(&(v as i32).to_be_bytes()),
            (true, _) => payload.extend_from_slice(&v.to_be_bytes()),
        }
    }
    let payload_marker = if marker_in_bytes {
        payload.len() as u32
    } else {
        cells.len() as u32
    };

    let mut out = Vec::with_capacity(8 + header.len() + 8 + payload.len());
    out.extend_from_slice(&512u32.to_be_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&512u32.to_be_bytes());
    out.extend_from_slice(&payload_marker.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&payload_marker.to_be_bytes());
    out
}

fn push_padded(buf: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(len);
    buf.extend_from_slice(&bytes[..take]);
    buf.extend(std::iter::repeat(b' ').take(len - take));
}
