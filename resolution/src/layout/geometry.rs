//! Grid-to-pixel conversion for desktop icons.

use serde::{Deserialize, Serialize};

/// 1-based grid cell. A zero component means the bucket was unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u32,
    pub column: u32,
}

/// Size of one icon cell and the gap between rows, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconGeometry {
    pub cell_width: u32,
    pub cell_height: u32,
    pub vertical_gap: u32,
}

impl Default for IconGeometry {
    fn default() -> Self {
        Self {
            cell_width: 93,
            cell_height: 89,
            vertical_gap: 45,
        }
    }
}

impl IconGeometry {
    /// Pixel centre of the cell at `position`.
    pub fn pixel_for(&self, position: GridPosition) -> (i64, i64) {
        to_pixel(
            position.row,
            position.column,
            self.cell_width,
            self.cell_height,
            self.vertical_gap,
        )
    }
}

/// Centre pixel of a 1-based grid cell.
///
/// Halves truncate toward zero, matching the shell's pixel grid. An unmapped
/// (zero) row or column yields a coordinate left of or above the origin.
pub fn to_pixel(
    row: u32,
    column: u32,
    cell_width: u32,
    cell_height: u32,
    vertical_gap: u32,
) -> (i64, i64) {
    let (row, column) = (i64::from(row), i64::from(column));
    let (w, h, gap) = (
        i64::from(cell_width),
        i64::from(cell_height),
        i64::from(vertical_gap),
    );

    let x = (column - 1) * w + w / 2;
    let y = (row - 1) * (h + gap) + h / 2;
    (x, y)
}
