//! Grid: a tiling of 3D space by a fixed block shape, offset, and halo.

use crate::box3::Box3;
use crate::coord::Coord3;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A tiling of space into `block_shape`-sized cells, anchored at `offset`,
/// with an optional symmetric `halo` expansion per axis.
///
/// Invariants enforced by [`Grid::new`]:
/// `block_shape > 0` componentwise, `halo >= 0` componentwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub block_shape: Coord3,
    pub offset: Coord3,
    pub halo: Coord3,
}

impl Grid {
    /// Construct a grid with no halo.
    ///
    /// # Errors
    /// Returns [`Error::ContractViolation`] if `block_shape` is not
    /// strictly positive on every axis.
    pub fn new(block_shape: Coord3, offset: Coord3) -> Result<Self> {
        Self::with_halo(block_shape, offset, Coord3::zero())
    }

    /// Construct a grid with an explicit halo.
    ///
    /// # Errors
    /// Returns [`Error::ContractViolation`] if `block_shape` is not
    /// strictly positive, or `halo` is negative, on any axis.
    pub fn with_halo(block_shape: Coord3, offset: Coord3, halo: Coord3) -> Result<Self> {
        if !block_shape.all_positive() {
            return Err(Error::ContractViolation(format!(
                "grid block_shape must be positive on every axis, got {block_shape:?}"
            )));
        }
        if !halo.all_non_negative() {
            return Err(Error::ContractViolation(format!(
                "grid halo must be non-negative on every axis, got {halo:?}"
            )));
        }
        Ok(Self {
            block_shape,
            offset,
            halo,
        })
    }

    #[must_use]
    pub fn has_halo(self) -> bool {
        self.halo != Coord3::zero()
    }

    /// The logical cell (no halo) containing `p`. O(1) floor-division
    /// lookup.
    #[must_use]
    pub fn logical_cell_of_point(self, p: Coord3) -> Box3 {
        let k = (p - self.offset).div_floor(self.block_shape);
        self.cell_for_index(k)
    }

    #[inline]
    fn cell_for_index(self, k: Coord3) -> Box3 {
        let lo = self.offset + k * self.block_shape;
        Box3::new(lo, lo + self.block_shape)
    }

    /// The half-open range of cell indices `[k_lo, k_hi)` whose logical
    /// cells could possibly intersect `b`.
    fn index_range(self, b: Box3) -> (Coord3, Coord3) {
        let k_lo = (b.lo - self.offset).div_floor(self.block_shape);
        let k_hi = (b.hi - self.offset).div_ceil(self.block_shape);
        (k_lo, k_hi)
    }

    /// The logical cells of every grid cell intersecting `b`, in
    /// deterministic lexicographic `(z, y, x)` order.
    ///
    /// If `include_halo`, a cell is included when its halo-expanded box
    /// intersects `b` (used to find destination cells fed by a source
    /// brick's halo), but the *logical* (non-expanded)
    /// box is what's returned.
    #[must_use]
    pub fn cells_over(self, b: Box3, include_halo: bool) -> Vec<Box3> {
        let search_box = if include_halo { b.expand(self.halo) } else { b };
        let (k_lo, k_hi) = self.index_range(search_box);
        let mut out = Vec::new();
        for kz in k_lo.z..k_hi.z {
            for ky in k_lo.y..k_hi.y {
                for kx in k_lo.x..k_hi.x {
                    let logical = self.cell_for_index(Coord3::new(kz, ky, kx));
                    let test_box = if include_halo {
                        logical.expand(self.halo)
                    } else {
                        logical
                    };
                    if test_box.intersects(b) {
                        out.push(logical);
                    }
                }
            }
        }
        out
    }

    /// The physical extents of every dense grid cell over `b`: each
    /// logical cell (no halo search), expanded by this grid's halo, then
    /// clipped to `b`. Paired index-for-index with
    /// `cells_over(b, false)`.
    #[must_use]
    pub fn clipped_cells(self, b: Box3) -> Vec<Box3> {
        self.cells_over(b, false)
            .into_iter()
            .map(|logical| logical.expand(self.halo).intersect(b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(z: i64, y: i64, x: i64) -> Coord3 {
        Coord3::new(z, y, x)
    }

    #[test]
    fn rejects_non_positive_block_shape() {
        assert!(Grid::new(c(0, 2, 2), c(0, 0, 0)).is_err());
    }

    #[test]
    fn rejects_negative_halo() {
        assert!(Grid::with_halo(c(2, 2, 2), c(0, 0, 0), c(-1, 0, 0)).is_err());
    }

    #[test]
    fn logical_cell_lookup() {
        let g = Grid::new(c(2, 2, 2), c(0, 0, 0)).unwrap();
        let cell = g.logical_cell_of_point(c(3, 1, 5));
        assert_eq!(cell, Box3::new(c(2, 0, 4), c(4, 2, 6)));
    }

    #[test]
    fn logical_cell_lookup_negative_coords() {
        let g = Grid::new(c(4, 4, 4), c(0, 0, 0)).unwrap();
        let cell = g.logical_cell_of_point(c(-1, -1, -1));
        assert_eq!(cell, Box3::new(c(-4, -4, -4), c(0, 0, 0)));
    }

    #[test]
    fn cells_over_covers_and_partitions_bounding_box() {
        let g = Grid::new(c(2, 2, 2), c(0, 0, 0)).unwrap();
        let b = Box3::new(c(0, 0, 0), c(4, 4, 4));
        let cells = g.cells_over(b, false);
        assert_eq!(cells.len(), 8);

        // lexicographic (z,y,x) order
        let mut prev = None;
        for cell in &cells {
            if let Some(p) = prev {
                assert!(cell.lo.to_array() > p);
            }
            prev = Some(cell.lo.to_array());
        }

        // disjoint, and union covers b exactly (since b is grid-aligned)
        let total_vol: u64 = cells.iter().map(|c| c.volume()).sum();
        assert_eq!(total_vol, b.volume());
        for i in 0..cells.len() {
            for j in (i + 1)..cells.len() {
                assert!(!cells[i].intersects(cells[j]));
            }
        }
    }

    #[test]
    fn cells_over_with_halo_pulls_in_neighbor_cells() {
        let g = Grid::with_halo(c(4, 4, 4), c(0, 0, 0), c(1, 1, 1)).unwrap();
        // A small box sitting right at a cell boundary should also match
        // the neighboring cell once halo is considered.
        let b = Box3::new(c(3, 3, 3), c(5, 5, 5));
        let without_halo = g.cells_over(b, false);
        let with_halo = g.cells_over(b, true);
        assert!(with_halo.len() >= without_halo.len());
    }

    #[test]
    fn clipped_cells_respects_grid_halo_and_bounding_box() {
        let g = Grid::with_halo(c(4, 4, 4), c(0, 0, 0), c(1, 1, 1)).unwrap();
        let b = Box3::new(c(0, 0, 0), c(4, 4, 4));
        let logical = g.cells_over(b, false);
        let physical = g.clipped_cells(b);
        assert_eq!(logical.len(), 1);
        assert_eq!(physical.len(), 1);
        // halo would want [-1,5) but bounding box clips to [0,4)
        assert_eq!(physical[0], Box3::new(c(0, 0, 0), c(4, 4, 4)));
    }
}
