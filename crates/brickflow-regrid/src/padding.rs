//! Expanding a brick's physical extent to align with a padding grid,
//! sourcing the newly-needed voxels from an accessor.

use brickflow_brick::Brick;
use brickflow_core::{Box3, Coord3, Error, Grid, Result, VolumeAccessor, VoxelBuffer};

/// Expand `brick`'s physical box outward until it is aligned with
/// `padding_grid`'s block boundaries, fetching the newly-needed voxels
/// from `accessor`.
///
/// `padding_grid` need not equal the grid `brick` was built from, but it
/// must divide evenly into it, and may not itself carry a halo. If
/// `brick` is already aligned, it is returned unmodified (no copy).
///
/// # Errors
/// [`Error::ContractViolation`] if `padding_grid` has a halo, is not
/// aligned with `brick.logical_box`, or the computed padded box would
/// escape `brick.logical_box`.
pub fn pad_brick(padding_grid: Grid, accessor: &dyn VolumeAccessor, brick: &Brick) -> Result<Brick> {
    if padding_grid.has_halo() {
        return Err(Error::ContractViolation(
            "padding grid must not carry its own halo".into(),
        ));
    }

    let block_shape = padding_grid.block_shape;
    let rel_logical = brick.logical_box.translate(Coord3::zero() - padding_grid.offset);
    if !is_block_aligned(rel_logical.lo, block_shape) || !is_block_aligned(rel_logical.hi, block_shape) {
        return Err(Error::ContractViolation(format!(
            "padding grid offset {:?} is not aligned with brick logical_box {:?}",
            padding_grid.offset, brick.logical_box
        )));
    }

    let rel_physical = brick.physical_box.translate(Coord3::zero() - padding_grid.offset);
    if is_block_aligned(rel_physical.lo, block_shape) && is_block_aligned(rel_physical.hi, block_shape) {
        return Ok(brick.clone());
    }

    let padded_lo = floor_to_block(rel_physical.lo, block_shape) + padding_grid.offset;
    let padded_hi = ceil_to_block(rel_physical.hi, block_shape) + padding_grid.offset;
    let padded_box = Box3::new(padded_lo, padded_hi);

    if !within(padded_box, brick.logical_box) {
        return Err(Error::ContractViolation(format!(
            "padded box {padded_box:?} escapes logical box {:?}",
            brick.logical_box
        )));
    }

    let dtype = brick.volume()?.dtype();
    let mut padded_volume = VoxelBuffer::zeros(padded_box.shape(), dtype);

    let orig_box = brick.physical_box;
    {
        let existing = brick.volume()?;
        padded_volume.overwrite(orig_box, padded_box.lo, &existing)?;
    }

    let halo_boxes = six_slab_halo_boxes(orig_box, padded_box);
    if halo_boxes.is_empty() {
        return Err(Error::ContractViolation(
            "no halo slabs computed despite padding being required".into(),
        ));
    }

    for halo_box in halo_boxes {
        let halo_volume = accessor.fetch(halo_box)?;
        padded_volume.overwrite(halo_box, padded_box.lo, &halo_volume)?;
    }

    Brick::new(brick.logical_box, padded_box, padded_volume)
}

/// The up to six slabs that separate `orig_box` from `padded_box` on
/// each axis: one "leading" slab where `orig.lo != padded.lo` and one
/// "trailing" slab where `orig.hi != padded.hi`, each spanning the full
/// extent of `padded_box` on the other two axes.
fn six_slab_halo_boxes(orig_box: Box3, padded_box: Box3) -> Vec<Box3> {
    let orig_lo = orig_box.lo.to_array();
    let orig_hi = orig_box.hi.to_array();
    let padded_lo = padded_box.lo.to_array();
    let padded_hi = padded_box.hi.to_array();

    let mut halo_boxes = Vec::new();
    for axis in 0..3 {
        if orig_lo[axis] != padded_lo[axis] {
            let mut hi = padded_hi;
            hi[axis] = orig_lo[axis];
            halo_boxes.push(Box3::new(padded_box.lo, Coord3::from_array(hi)));
        }
        if orig_hi[axis] != padded_hi[axis] {
            let mut lo = padded_lo;
            lo[axis] = orig_hi[axis];
            halo_boxes.push(Box3::new(Coord3::from_array(lo), padded_box.hi));
        }
    }
    halo_boxes
}

fn is_block_aligned(p: Coord3, block_shape: Coord3) -> bool {
    p.div_floor(block_shape) * block_shape == p
}

fn floor_to_block(p: Coord3, block_shape: Coord3) -> Coord3 {
    p.div_floor(block_shape) * block_shape
}

fn ceil_to_block(p: Coord3, block_shape: Coord3) -> Coord3 {
    p.div_ceil(block_shape) * block_shape
}

fn within(inner: Box3, outer: Box3) -> bool {
    let il = inner.lo.to_array();
    let ih = inner.hi.to_array();
    let ol = outer.lo.to_array();
    let oh = outer.hi.to_array();
    (0..3).all(|i| il[i] >= ol[i] && ih[i] <= oh[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickflow_core::Dtype;

    fn c(z: i64, y: i64, x: i64) -> Coord3 {
        Coord3::new(z, y, x)
    }

    struct ConstAccessor(u8);
    impl VolumeAccessor for ConstAccessor {
        fn fetch(&self, b: Box3) -> Result<VoxelBuffer> {
            let mut vol = VoxelBuffer::zeros(b.shape(), Dtype::U8);
            if let VoxelBuffer::U8(a) = &mut vol {
                a.fill(self.0);
            }
            Ok(vol)
        }
        fn dtype(&self) -> Dtype {
            Dtype::U8
        }
    }

    #[test]
    fn already_aligned_brick_is_returned_unchanged() {
        let grid = Grid::new(c(2, 2, 2), Coord3::zero()).unwrap();
        let logical = Box3::new(c(0, 0, 0), c(2, 2, 2));
        let brick = Brick::new(logical, logical, VoxelBuffer::zeros(c(2, 2, 2), Dtype::U8)).unwrap();
        let padded = pad_brick(grid, &ConstAccessor(0), &brick).unwrap();
        assert_eq!(padded.physical_box, logical);
    }

    #[test]
    fn edge_brick_gets_padded_from_accessor() {
        let grid = Grid::new(c(4, 4, 4), Coord3::zero()).unwrap();
        let logical = Box3::new(c(0, 0, 0), c(4, 4, 4));
        // physical_box only covers half the cell on the low x edge.
        let physical = Box3::new(c(0, 0, 2), c(4, 4, 4));
        let brick = Brick::new(logical, physical, VoxelBuffer::zeros(physical.shape(), Dtype::U8)).unwrap();

        let padded = pad_brick(grid, &ConstAccessor(7), &brick).unwrap();
        assert_eq!(padded.physical_box, logical);
        if let VoxelBuffer::U8(arr) = &*padded.volume().unwrap() {
            // padded-in slab (x in [0,2)) should be filled with the accessor's constant.
            assert!(arr.slice(ndarray::s![.., .., 0..2]).iter().all(|v| *v == 7));
        } else {
            panic!("wrong dtype");
        }
    }

    #[test]
    fn rejects_padding_grid_with_halo() {
        let grid = Grid::with_halo(c(4, 4, 4), Coord3::zero(), c(1, 1, 1)).unwrap();
        let logical = Box3::new(c(0, 0, 0), c(4, 4, 4));
        let brick = Brick::new(logical, logical, VoxelBuffer::zeros(c(4, 4, 4), Dtype::U8)).unwrap();
        assert!(matches!(
            pad_brick(grid, &ConstAccessor(0), &brick),
            Err(Error::ContractViolation(_))
        ));
    }

    #[test]
    fn rejects_misaligned_padding_grid() {
        let grid = Grid::new(c(3, 3, 3), Coord3::zero()).unwrap();
        let logical = Box3::new(c(0, 0, 0), c(4, 4, 4));
        let brick = Brick::new(logical, logical, VoxelBuffer::zeros(c(4, 4, 4), Dtype::U8)).unwrap();
        assert!(matches!(
            pad_brick(grid, &ConstAccessor(0), &brick),
            Err(Error::ContractViolation(_))
        ));
    }
}
