//! Populating a [`Grid`] with bricks, either densely over a bounding box
//! or from a caller-supplied sparse list of physical boxes.

use brickflow_brick::Brick;
use brickflow_core::{Box3, Coord3, Error, Grid, Result, VolumeAccessor};
use hashbrown::HashSet;
use std::sync::Arc;

/// Populate every grid cell intersecting `bounding_box` with a brick.
///
/// If `lazy`, each brick's data is fetched on first access; otherwise
/// `accessor` is called eagerly for every cell's physical box.
pub fn generate_bricks_dense(
    bounding_box: Box3,
    grid: Grid,
    accessor: Arc<dyn VolumeAccessor>,
    lazy: bool,
) -> Result<Vec<Brick>> {
    let logical_boxes = grid.cells_over(bounding_box, false);
    let physical_boxes = grid.clipped_cells(bounding_box);
    tracing::debug!(count = logical_boxes.len(), "generating dense bricks");

    logical_boxes
        .into_iter()
        .zip(physical_boxes)
        .map(|(logical, physical)| make_brick(logical, physical, &accessor, lazy))
        .collect()
}

/// Populate bricks only at the grid cells touched by `sparse_boxes`,
/// each clipped to `bounding_box` and expanded by `grid`'s halo.
///
/// No two boxes in `sparse_boxes` may resolve to the same logical cell
/// (as determined by their midpoints) — that would mean two physical
/// regions contending for the same brick, with no defined winner.
///
/// # Errors
/// [`Error::ContractViolation`] if two sparse boxes collide on the same
/// logical cell.
pub fn generate_bricks_sparse(
    bounding_box: Box3,
    grid: Grid,
    accessor: Arc<dyn VolumeAccessor>,
    sparse_boxes: &[Box3],
    lazy: bool,
) -> Result<Vec<Brick>> {
    let mut seen_cells = HashSet::with_capacity(sparse_boxes.len());
    let mut bricks = Vec::with_capacity(sparse_boxes.len());

    for &box_ in sparse_boxes {
        let midpoint = (box_.lo + box_.hi).div_floor(Coord3::splat(2));
        let logical_box = grid.logical_cell_of_point(midpoint);
        let physical_box = box_.expand(grid.halo).intersect(bounding_box);

        if !physical_box.intersects(logical_box) {
            // Falls entirely outside the bounding box or outside its own
            // logical cell; not a valid brick.
            continue;
        }

        if !seen_cells.insert(logical_box.lo.to_array()) {
            return Err(Error::ContractViolation(format!(
                "two sparse boxes resolve to the same logical cell {logical_box:?}"
            )));
        }

        bricks.push(make_brick(logical_box, physical_box, &accessor, lazy)?);
    }

    tracing::debug!(count = bricks.len(), "generated sparse bricks");
    Ok(bricks)
}

fn make_brick(
    logical_box: Box3,
    physical_box: Box3,
    accessor: &Arc<dyn VolumeAccessor>,
    lazy: bool,
) -> Result<Brick> {
    if lazy {
        Ok(Brick::new_lazy(logical_box, physical_box, Arc::clone(accessor)))
    } else {
        let volume = accessor.fetch(physical_box)?;
        Brick::new(logical_box, physical_box, volume)
    }
}

/// Truncate `brick` so its physical extent does not exceed its logical
/// box, dropping any halo it was constructed with.
///
/// # Errors
/// [`Error::EmptyIntersection`] if `physical_box` and `logical_box` do
/// not overlap at all.
pub fn clip_to_logical(brick: &Brick) -> Result<Brick> {
    let intersection = brick.physical_box.intersect(brick.logical_box);
    if intersection.is_empty() {
        return Err(Error::EmptyIntersection(format!(
            "physical_box {:?} does not intersect logical_box {:?}",
            brick.physical_box, brick.logical_box
        )));
    }
    let volume = brick.volume()?;
    let clipped_vol = volume.extract(intersection, brick.physical_box.lo)?;
    Brick::new(brick.logical_box, intersection, clipped_vol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickflow_core::{Dtype, VoxelBuffer};

    struct ConstAccessor;
    impl VolumeAccessor for ConstAccessor {
        fn fetch(&self, b: Box3) -> Result<VoxelBuffer> {
            Ok(VoxelBuffer::zeros(b.shape(), Dtype::U8))
        }
        fn dtype(&self) -> Dtype {
            Dtype::U8
        }
    }

    fn c(z: i64, y: i64, x: i64) -> Coord3 {
        Coord3::new(z, y, x)
    }

    #[test]
    fn dense_generation_covers_whole_bounding_box() {
        let grid = Grid::new(c(2, 2, 2), Coord3::zero()).unwrap();
        let bbox = Box3::new(c(0, 0, 0), c(4, 4, 4));
        let bricks = generate_bricks_dense(bbox, grid, Arc::new(ConstAccessor), false).unwrap();
        assert_eq!(bricks.len(), 8);
        let total_vol: u64 = bricks.iter().map(|b| b.physical_box.volume()).sum();
        assert_eq!(total_vol, bbox.volume());
    }

    #[test]
    fn lazy_dense_generation_does_not_touch_accessor_until_read() {
        let grid = Grid::new(c(2, 2, 2), Coord3::zero()).unwrap();
        let bbox = Box3::new(c(0, 0, 0), c(2, 2, 2));
        let bricks = generate_bricks_dense(bbox, grid, Arc::new(ConstAccessor), true).unwrap();
        assert_eq!(bricks.len(), 1);
        assert!(bricks[0].volume().is_ok());
    }

    #[test]
    fn sparse_generation_only_populates_named_cells() {
        let grid = Grid::new(c(2, 2, 2), Coord3::zero()).unwrap();
        let bbox = Box3::new(c(0, 0, 0), c(8, 8, 8));
        let sparse = [Box3::new(c(0, 0, 0), c(2, 2, 2)), Box3::new(c(4, 4, 4), c(6, 6, 6))];
        let bricks =
            generate_bricks_sparse(bbox, grid, Arc::new(ConstAccessor), &sparse, false).unwrap();
        assert_eq!(bricks.len(), 2);
    }

    #[test]
    fn sparse_generation_rejects_colliding_logical_cells() {
        let grid = Grid::new(c(4, 4, 4), Coord3::zero()).unwrap();
        let bbox = Box3::new(c(0, 0, 0), c(8, 8, 8));
        let sparse = [
            Box3::new(c(0, 0, 0), c(2, 2, 2)),
            Box3::new(c(1, 1, 1), c(3, 3, 3)),
        ];
        let result = generate_bricks_sparse(bbox, grid, Arc::new(ConstAccessor), &sparse, false);
        assert!(matches!(result, Err(Error::ContractViolation(_))));
    }

    #[test]
    fn clip_to_logical_drops_halo() {
        let logical = Box3::new(c(0, 0, 0), c(2, 2, 2));
        let physical = Box3::new(c(-1, -1, -1), c(3, 3, 3));
        let vol = VoxelBuffer::zeros(physical.shape(), Dtype::U8);
        let brick = Brick::new(logical, physical, vol).unwrap();
        let clipped = clip_to_logical(&brick).unwrap();
        assert_eq!(clipped.physical_box, logical);
    }
}
