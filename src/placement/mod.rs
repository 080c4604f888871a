//! # Container Placement Engine
//!
//! First-fit placement of rectangular items into container grids.
//!
//! A [`ContainerGrid`] is a plain occupancy matrix. [`ContainerGrid::find_slot`]
//! scans it row by row and returns the first free position for a footprint,
//! trying the unrotated rectangle before the rotated one at each cell. The
//! search is deliberately first-fit; fragmentation is accepted in exchange for
//! a single linear scan.
//!
//! [`place_in_containers`] applies the grid search to a bot's equipped
//! containers in priority order.

pub mod containers;

pub use containers::*;

use serde::{Deserialize, Serialize};

/// Result of a successful grid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSlot {
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
}

/// Occupancy matrix of one container grid.
///
/// # Examples
///
/// ```
/// use quartermaster::ContainerGrid;
///
/// let mut grid = ContainerGrid::new(2, 2);
/// let slot = grid.find_slot(2, 1).unwrap();
/// assert_eq!((slot.x, slot.y, slot.rotated), (0, 0, false));
/// grid.occupy(slot, 2, 1);
/// assert!(grid.find_slot(2, 2).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl ContainerGrid {
    /// Creates an empty grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the cell is taken. Out-of-bounds cells count as taken.
    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return true;
        }
        self.cells[cell_index(self.width, x, y)]
    }

    /// Number of free cells.
    pub fn free_cells(&self) -> usize {
        self.cells.iter().filter(|cell| !**cell).count()
    }

    /// Whether a `width`×`height` rectangle at `(x, y)` is inside the grid
    /// and entirely free.
    pub fn fits_at(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if x.saturating_add(width) > self.width || y.saturating_add(height) > self.height {
            return false;
        }
        (y..y + height).all(|row| (x..x + width).all(|column| !self.is_occupied(column, row)))
    }

    /// First free position for a `width`×`height` footprint.
    ///
    /// Rows are scanned top to bottom and cells left to right; at each cell the
    /// unrotated footprint is tried first, then the rotated one. Square
    /// footprints (1×1 included) skip the rotated attempt, which could never
    /// succeed where the unrotated one failed.
    pub fn find_slot(&self, width: u32, height: u32) -> Option<GridSlot> {
        let can_rotate = width != height;
        let fits_unrotated = width <= self.width && height <= self.height;
        let fits_rotated = can_rotate && height <= self.width && width <= self.height;
        if !fits_unrotated && !fits_rotated {
            return None;
        }

        for y in 0..self.height {
            for x in 0..self.width {
                if fits_unrotated && self.fits_at(x, y, width, height) {
                    return Some(GridSlot { x, y, rotated: false });
                }
                if fits_rotated && self.fits_at(x, y, height, width) {
                    return Some(GridSlot { x, y, rotated: true });
                }
            }
        }
        None
    }

    /// Marks the footprint at `slot` as taken. `width`/`height` are the
    /// unrotated dimensions.
    pub fn occupy(&mut self, slot: GridSlot, width: u32, height: u32) {
        let (width, height) = if slot.rotated {
            (height, width)
        } else {
            (width, height)
        };
        for row in slot.y..slot.y.saturating_add(height).min(self.height) {
            for column in slot.x..slot.x.saturating_add(width).min(self.width) {
                self.cells[cell_index(self.width, column, row)] = true;
            }
        }
    }

    /// Searches and, on success, immediately occupies the found slot.
    pub fn place(&mut self, width: u32, height: u32) -> Option<GridSlot> {
        let slot = self.find_slot(width, height)?;
        self.occupy(slot, width, height);
        Some(slot)
    }
}

/// Row-major index of a cell, computed in `usize` so large grids cannot
/// overflow `u32`.
fn cell_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}
