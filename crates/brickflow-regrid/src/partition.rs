//! Heuristic for sizing collection partitions by voxel count rather
//! than by brick count.

use brickflow_core::{Coord3, Grid};

/// A reasonable default target partition size, in voxels, aiming for
/// roughly two partitions per worker thread.
///
/// `total_voxels` is the sum over every brick's physical box volume
/// that will populate the collection (the dense bounding box, or the
/// sum over sparse boxes). `num_threads` should be the size of the
/// thread pool the collection will actually run on.
#[must_use]
pub fn default_target_partition_voxels(total_voxels: u64, num_threads: usize) -> u64 {
    let num_threads = num_threads.max(1) as u64;
    let voxels_per_thread = total_voxels / num_threads;
    voxels_per_thread / 2
}

/// Convert a voxel-count partition target into a brick-count one, given
/// the grid's per-cell voxel count. Never rounds down to zero — a
/// partition of at least one brick is always meaningful.
#[must_use]
pub fn bricks_per_partition(target_partition_size_voxels: u64, grid: Grid) -> usize {
    let block_voxels = grid.block_shape.product().max(1) as u64;
    (target_partition_size_voxels / block_voxels).max(1) as usize
}

/// Total voxel count across a set of physical boxes, as used when sizing
/// partitions for a sparse (non-dense) brick set.
#[must_use]
pub fn total_voxels(boxes: &[brickflow_core::Box3]) -> u64 {
    boxes.iter().map(|b| b.volume()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_aims_for_two_partitions_per_thread() {
        let target = default_target_partition_voxels(1_000_000, 4);
        // voxels_per_thread = 250_000, halved = 125_000
        assert_eq!(target, 125_000);
    }

    #[test]
    fn single_thread_is_floor_of_one() {
        let target = default_target_partition_voxels(1_000, 1);
        assert_eq!(target, 500);
    }

    #[test]
    fn bricks_per_partition_never_rounds_to_zero() {
        let grid = Grid::new(Coord3::new(64, 64, 64), Coord3::zero()).unwrap();
        assert_eq!(bricks_per_partition(1, grid), 1);
    }
}
