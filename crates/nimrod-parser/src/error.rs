//! Error types for NIMROD decoding, clipping and export.

use thiserror::Error;

/// Errors that can occur while decoding or processing a NIMROD raster.
#[derive(Error, Debug)]
pub enum NimrodError {
    /// Structurally invalid or truncated input. Fatal for the file.
    #[error("malformed NIMROD header: {0}")]
    MalformedHeader(String),

    /// Header decoded structurally but the validity-time fields are out of
    /// calendar range. Fatal for the file.
    #[error(
        "invalid validity time in header: {year:04}-{month:02}-{day:02} \
         {hour:02}:{minute:02}:{second:02}"
    )]
    InvalidDatetime {
        year: i16,
        month: i16,
        day: i16,
        hour: i16,
        minute: i16,
        second: i16,
    },

    /// The requested clip does not intersect the raster's current extent.
    /// Recoverable; the store is left unmodified.
    #[error("bounding box {requested} does not intersect raster extent {extent}")]
    BoundingBoxOutOfRange { requested: String, extent: String },

    /// The ESRI ASCII grid format has a single `cellsize` field and cannot
    /// represent non-square cells.
    #[error("cannot export non-square cells to ASCII grid: x={x}, y={y}")]
    InconsistentCellSize { x: f64, y: f64 },
}

impl NimrodError {
    /// Create a MalformedHeader error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }
}

/// Result type for NIMROD operations.
pub type Result<T> = std::result::Result<T, NimrodError>;
