//! Geometry types for terminal coordinates and damage regions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Position in the terminal grid (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    /// Row index (0-based)
    pub row: u16,
    /// Column index (0-based)
    pub col: u16,
}

impl Position {
    /// Create a new position.
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Origin position (0, 0).
    pub fn origin() -> Self {
        Self { row: 0, col: 0 }
    }
}

/// Dimensions of a terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Dimensions {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Total cell count (rows * cols).
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Check whether a position falls inside the grid.
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

/// A rectangular area of the grid reported as changed since the last flush.
///
/// Row and column ranges are end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DamageRegion {
    /// First damaged row
    pub start_row: u16,
    /// One past the last damaged row
    pub end_row: u16,
    /// First damaged column
    pub start_col: u16,
    /// One past the last damaged column
    pub end_col: u16,
}

impl DamageRegion {
    /// Create a new region. Inverted ranges are clamped, not rejected.
    pub fn new(start_row: u16, end_row: u16, start_col: u16, end_col: u16) -> Self {
        Self {
            start_row,
            end_row: end_row.max(start_row),
            start_col,
            end_col: end_col.max(start_col),
        }
    }

    /// A region covering the whole grid.
    pub fn full(dimensions: Dimensions) -> Self {
        Self::new(0, dimensions.rows, 0, dimensions.cols)
    }

    /// Check whether the region covers no cells.
    pub fn is_empty(&self) -> bool {
        self.start_row == self.end_row || self.start_col == self.end_col
    }

    /// Check whether the row ranges of two regions overlap or touch.
    pub fn rows_overlap(&self, other: &DamageRegion) -> bool {
        !(self.end_row < other.start_row || self.start_row > other.end_row)
    }

    /// The smallest region covering both inputs.
    pub fn union(&self, other: &DamageRegion) -> Self {
        Self {
            start_row: self.start_row.min(other.start_row),
            end_row: self.end_row.max(other.end_row),
            start_col: self.start_col.min(other.start_col),
            end_col: self.end_col.max(other.end_col),
        }
    }

    /// Clamp the region to the given grid dimensions.
    pub fn clamp_to(&self, dimensions: Dimensions) -> Self {
        Self {
            start_row: self.start_row.min(dimensions.rows),
            end_row: self.end_row.min(dimensions.rows),
            start_col: self.start_col.min(dimensions.cols),
            end_col: self.end_col.min(dimensions.cols),
        }
    }

    /// Iterate over the damaged row indices.
    pub fn rows(&self) -> std::ops::Range<u16> {
        self.start_row..self.end_row
    }

    /// Check whether a grid position is covered by this region.
    pub fn contains(&self, pos: Position) -> bool {
        pos.row >= self.start_row
            && pos.row < self.end_row
            && pos.col >= self.start_col
            && pos.col < self.end_col
    }
}
