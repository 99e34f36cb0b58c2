//! Decoder for UK Met Office NIMROD rain-radar files.
//!
//! NIMROD is the Met Office's binary raster format for radar-derived
//! rainfall products: a fixed 512-byte big-endian header followed by a
//! row-major array of 2- or 4-byte cells, both framed as Fortran unformatted
//! records. This crate decodes format versions 1.7 and 2.6-4 into an
//! in-memory [`RasterStore`], clips it to a bounding box in the grid's
//! native coordinates, and serializes it to ESRI ASCII grid text for
//! standard GIS tooling.
//!
//! The three steps compose linearly and run synchronously; a store has a
//! single owner and clipping mutates it in place.
//!
//! # Example
//!
//! ```ignore
//! use nimrod_parser::{decode, encode_ascii, BoundingBox};
//!
//! let store = decode(bytes::Bytes::from(std::fs::read("composite.dat")?))?;
//! println!("{}", store.describe());
//!
//! let mut clipped = store.clone();
//! clipped.clip(&BoundingBox::new(279906.0, 283130.0, 285444.0, 290440.0))?;
//! std::fs::write("catchment.asc", encode_ascii(&clipped)?)?;
//! ```

pub mod ascii;
pub mod error;
pub mod header;
pub mod raster;
pub mod testdata;

// Re-export commonly used types at crate root
pub use ascii::encode_ascii;
pub use error::{NimrodError, Result};
pub use header::{DataKind, FormatVersion, RasterHeader};
pub use raster::{decode, RasterStore};
pub use raster_common::{BoundingBox, GridGeometry};
