//! Regular grid geometry and coordinate/index arithmetic.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Geometry of a regular, top-left-origin raster grid.
///
/// Row 0 is the geographically northernmost row and the y coordinate
/// decreases as the row index increases. `top_left_x`/`top_left_y` name the
/// outer corner of cell (0, 0), not its centre, so the full extent runs from
/// `top_left_y - nrows * dy` up to `top_left_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of columns (x direction).
    pub ncols: usize,
    /// Number of rows (y direction).
    pub nrows: usize,
    /// Cell size in the x direction (coordinate units per column).
    pub dx: f64,
    /// Cell size in the y direction (coordinate units per row).
    pub dy: f64,
    /// X coordinate of the grid's top-left corner.
    pub top_left_x: f64,
    /// Y coordinate of the grid's top-left corner.
    pub top_left_y: f64,
}

impl GridGeometry {
    /// Create a new grid geometry.
    pub fn new(
        ncols: usize,
        nrows: usize,
        dx: f64,
        dy: f64,
        top_left_x: f64,
        top_left_y: f64,
    ) -> Self {
        Self {
            ncols,
            nrows,
            dx,
            dy,
            top_left_x,
            top_left_y,
        }
    }

    /// The full extent of the grid as a bounding box (outer cell edges).
    pub fn extent(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.top_left_x,
            min_y: self.top_left_y - self.nrows as f64 * self.dy,
            max_x: self.top_left_x + self.ncols as f64 * self.dx,
            max_y: self.top_left_y,
        }
    }

    /// Top-left corner coordinate of the cell at (col, row).
    pub fn cell_origin(&self, col: usize, row: usize) -> Option<(f64, f64)> {
        if col >= self.ncols || row >= self.nrows {
            return None;
        }
        Some((
            self.top_left_x + col as f64 * self.dx,
            self.top_left_y - row as f64 * self.dy,
        ))
    }

    /// Half-open column and row ranges covered by a bounding box.
    ///
    /// The lower index of each range is `floor` of the box's near edge and
    /// the exclusive upper index is `ceil` of the far edge, so a box edge
    /// landing exactly on a cell boundary does not pull in the next cell.
    /// For rows the y axis is inverted: the range starts from the box's
    /// `max_y` (northern edge) measured down from `top_left_y`.
    ///
    /// Both ranges are clamped to the grid. Returns `None` when the box is
    /// invalid or either clamped range is empty (no intersection).
    pub fn select(&self, bbox: &BoundingBox) -> Option<(Range<usize>, Range<usize>)> {
        if !bbox.is_valid() {
            return None;
        }

        let col_start = ((bbox.min_x - self.top_left_x) / self.dx).floor();
        let col_end = ((bbox.max_x - self.top_left_x) / self.dx).ceil();
        let row_start = ((self.top_left_y - bbox.max_y) / self.dy).floor();
        let row_end = ((self.top_left_y - bbox.min_y) / self.dy).ceil();

        // Saturating float-to-int casts take care of boxes far outside the
        // grid; the emptiness check below rejects them.
        let col_start = col_start.max(0.0) as usize;
        let row_start = row_start.max(0.0) as usize;
        let col_end = col_end.min(self.ncols as f64).max(0.0) as usize;
        let row_end = row_end.min(self.nrows as f64).max(0.0) as usize;

        if col_start >= col_end || row_start >= row_end {
            return None;
        }
        Some((col_start..col_end, row_start..row_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_4x3() -> GridGeometry {
        GridGeometry::new(4, 3, 1000.0, 1000.0, 600000.0, 220000.0)
    }

    #[test]
    fn test_extent() {
        let extent = grid_4x3().extent();
        assert_eq!(extent.min_x, 600000.0);
        assert_eq!(extent.max_x, 604000.0);
        assert_eq!(extent.min_y, 217000.0);
        assert_eq!(extent.max_y, 220000.0);
    }

    #[test]
    fn test_select_first_two_columns() {
        let bbox = BoundingBox::new(600000.0, 217000.0, 602000.0, 220000.0);
        let (cols, rows) = grid_4x3().select(&bbox).unwrap();
        assert_eq!(cols, 0..2);
        assert_eq!(rows, 0..3);
    }

    #[test]
    fn test_select_row_y_inversion() {
        // Box covering only the southernmost row.
        let bbox = BoundingBox::new(600000.0, 217000.0, 604000.0, 218000.0);
        let (cols, rows) = grid_4x3().select(&bbox).unwrap();
        assert_eq!(cols, 0..4);
        assert_eq!(rows, 2..3);
    }

    #[test]
    fn test_select_clamps_oversized_box() {
        let bbox = BoundingBox::new(0.0, 0.0, 1e9, 1e9);
        let (cols, rows) = grid_4x3().select(&bbox).unwrap();
        assert_eq!(cols, 0..4);
        assert_eq!(rows, 0..3);
    }

    #[test]
    fn test_select_disjoint_box() {
        let east = BoundingBox::new(700000.0, 217000.0, 701000.0, 220000.0);
        let south = BoundingBox::new(600000.0, 100000.0, 604000.0, 101000.0);
        assert!(grid_4x3().select(&east).is_none());
        assert!(grid_4x3().select(&south).is_none());
    }

    #[test]
    fn test_select_degenerate_box() {
        let empty = BoundingBox::new(601000.0, 218000.0, 601000.0, 219000.0);
        assert!(grid_4x3().select(&empty).is_none());
    }

    #[test]
    fn test_cell_origin() {
        let grid = grid_4x3();
        assert_eq!(grid.cell_origin(0, 0), Some((600000.0, 220000.0)));
        assert_eq!(grid.cell_origin(2, 1), Some((602000.0, 219000.0)));
        assert_eq!(grid.cell_origin(4, 0), None);
    }
}
