//! Common geometry types shared by the raster decoding and export crates.
//!
//! Nothing in this crate knows about any file format: it provides the
//! `BoundingBox` rectangle and the `GridGeometry` description of a regular,
//! top-left-origin raster grid, together with the coordinate-to-index
//! arithmetic the format crates build on.

pub mod bbox;
pub mod grid;

pub use bbox::{BboxParseError, BoundingBox};
pub use grid::GridGeometry;
