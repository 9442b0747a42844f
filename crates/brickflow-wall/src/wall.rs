//! `BrickWall`: a thin wrapper pairing a bounding box and grid with a
//! collection of bricks, exposing the operations a regridding pipeline
//! chains together.

use crate::downsample::{downsample_brick, DownsampleMethod};
use crate::labelmap::{relabel_brick, LabelMapper};
use brickflow_brick::Brick;
use brickflow_collection::{Backend, Collection, Persisted};
use brickflow_core::{Box3, Coord3, Grid, Result, VolumeAccessor};
use brickflow_regrid::{
    bricks_per_partition, default_target_partition_voxels, generate_bricks_dense,
    generate_bricks_sparse, pad_brick, realign_to_new_grid as realign_bricks, total_voxels,
};
use std::sync::Arc;

/// A lazy, partitioned set of bricks tiled over `grid`, restricted to
/// `bounding_box`. Every transform below consumes `self` and returns a
/// new `BrickWall` — the original collection is left untouched unless
/// the caller explicitly drops it.
pub struct BrickWall {
    pub bounding_box: Box3,
    pub grid: Grid,
    pub bricks: Collection<Brick>,
}

impl BrickWall {
    #[must_use]
    pub fn new(bounding_box: Box3, grid: Grid, bricks: Collection<Brick>) -> Self {
        Self {
            bounding_box,
            grid,
            bricks,
        }
    }

    /// Populate a brick wall from an arbitrary accessor, either densely
    /// over `bounding_box` or only at the cells touched by
    /// `sparse_boxes`. The resulting collection is partitioned so each
    /// partition's total voxel count is approximately `target`,
    /// never dropping below `num_threads` partitions.
    ///
    /// If `target_partition_size_voxels` is not given, a default is
    /// derived from `num_threads` aiming for two partitions per thread.
    pub fn from_accessor_func(
        bounding_box: Box3,
        grid: Grid,
        accessor: Arc<dyn VolumeAccessor>,
        backend: Backend,
        num_threads: usize,
        target_partition_size_voxels: Option<u64>,
        sparse_boxes: Option<&[Box3]>,
        lazy: bool,
    ) -> Result<Self> {
        let voxels = match sparse_boxes {
            Some(boxes) => total_voxels(boxes),
            None => bounding_box.volume(),
        };
        let target = target_partition_size_voxels
            .unwrap_or_else(|| default_target_partition_voxels(voxels, num_threads));
        tracing::debug!(
            bricks_per_partition = bricks_per_partition(target, grid),
            "sizing brick wall partitions"
        );

        let bricks = match sparse_boxes {
            Some(boxes) => generate_bricks_sparse(bounding_box, grid, accessor, boxes, lazy)?,
            None => generate_bricks_dense(bounding_box, grid, accessor, lazy)?,
        };
        let bricks = Collection::new(bricks, backend)
            .partition_by_weight(target, num_threads.max(1), |b| b.physical_box.volume());
        Ok(Self::new(bounding_box, grid, bricks))
    }

    /// Drop every brick whose buffer is entirely zero.
    pub fn drop_empty(self) -> Result<Self> {
        let backend = self.bricks.backend();
        let mut kept = Vec::new();
        for brick in self.bricks.into_vec() {
            if !brick.volume()?.is_all_zero() {
                kept.push(brick);
            }
        }
        Ok(Self::new(self.bounding_box, self.grid, Collection::new(kept, backend)))
    }

    /// Chop up and reassemble every brick onto `new_grid`. Requires data
    /// shuffling (see [`brickflow_regrid::realign_to_new_grid`]).
    pub fn realign_to_new_grid(self, new_grid: Grid) -> Result<Self> {
        let bricks = realign_bricks(new_grid, self.bricks)?;
        Ok(Self::new(self.bounding_box, new_grid, bricks))
    }

    /// Fill each brick's physical box out to its logical box's edges,
    /// sourcing the missing voxels from `accessor`. `padding_grid`
    /// defaults to this wall's own grid if not given.
    pub fn fill_missing(self, accessor: Arc<dyn VolumeAccessor>, padding_grid: Option<Grid>) -> Result<Self> {
        let padding_grid = padding_grid.unwrap_or(self.grid);
        let results = self
            .bricks
            .map(move |brick| pad_brick(padding_grid, accessor.as_ref(), &brick));
        let backend = results.backend();
        let bricks = results.into_vec().into_iter().collect::<Result<Vec<_>>>()?;
        Ok(Self::new(self.bounding_box, self.grid, Collection::new(bricks, backend)))
    }

    /// Translate every brick's boxes, this wall's bounding box, and its
    /// grid's offset by `delta`. Voxel data is untouched.
    pub fn translate(self, delta: Coord3) -> Result<Self> {
        let results = self.bricks.map(move |brick| {
            let volume = brick.volume()?.clone();
            Brick::new(
                brick.logical_box.translate(delta),
                brick.physical_box.translate(delta),
                volume,
            )
        });
        let backend = results.backend();
        let bricks = results.into_vec().into_iter().collect::<Result<Vec<_>>>()?;
        let new_grid = Grid::with_halo(self.grid.block_shape, self.grid.offset + delta, self.grid.halo)?;
        Ok(Self::new(
            self.bounding_box.translate(delta),
            new_grid,
            Collection::new(bricks, backend),
        ))
    }

    /// Downsample every brick by an isotropic `factor`, scaling the
    /// bounding box and grid to match.
    pub fn downsample(self, factor: i64, method: DownsampleMethod) -> Result<Self> {
        let results = self
            .bricks
            .map(move |brick| downsample_brick(method, factor, &brick));
        let backend = results.backend();
        let bricks = results.into_vec().into_iter().collect::<Result<Vec<_>>>()?;
        let new_grid = Grid::with_halo(
            self.grid.block_shape / factor,
            self.grid.offset / factor,
            self.grid.halo / factor,
        )?;
        Ok(Self::new(
            self.bounding_box.scaled_down(factor),
            new_grid,
            Collection::new(bricks, backend),
        ))
    }

    /// Relabel every brick's voxels in place according to `pairs`,
    /// building the mapper once per partition rather than once per
    /// brick.
    pub fn apply_labelmap(self, pairs: &[(u64, u64)]) -> Result<Self> {
        let pairs = pairs.to_vec();
        let results = self.bricks.map_partitions(move |bricks| {
            let mapper = LabelMapper::new(&pairs);
            bricks
                .into_iter()
                .map(|b| relabel_brick(&mapper, &b).map(|()| b))
                .collect()
        });
        let backend = results.backend();
        let bricks = results.into_vec().into_iter().collect::<Result<Vec<_>>>()?;
        Ok(Self::new(self.bounding_box, self.grid, Collection::new(bricks, backend)))
    }

    /// Apply `f` to every brick.
    #[must_use]
    pub fn map(self, f: impl Fn(Brick) -> Brick + Sync + Send) -> Self {
        Self::new(self.bounding_box, self.grid, self.bricks.map(f))
    }

    /// Keep only bricks for which `f` returns true.
    #[must_use]
    pub fn filter(self, f: impl Fn(&Brick) -> bool + Sync + Send) -> Self {
        Self::new(self.bounding_box, self.grid, self.bricks.filter(f))
    }

    /// Apply `f` to every brick, flattening the results.
    #[must_use]
    pub fn flat_map<I>(self, f: impl Fn(Brick) -> I + Sync + Send) -> Self
    where
        I: IntoIterator<Item = Brick>,
    {
        Self::new(self.bounding_box, self.grid, self.bricks.flat_map(f))
    }

    /// Run `f` on every brick for its side effect.
    pub fn foreach(&self, f: impl Fn(&Brick) + Sync + Send) {
        self.bricks.foreach(f);
    }

    /// Pin this wall's bricks so downstream branches can reuse them
    /// without recomputation.
    #[must_use]
    pub fn persist(self) -> PersistedWall {
        PersistedWall {
            bounding_box: self.bounding_box,
            grid: self.grid,
            bricks: self.bricks.persist(),
        }
    }

    /// A duplicate of this wall with its own (unpinned) brick
    /// collection, so the caller can `persist`/`unpersist` one copy
    /// without affecting the other.
    #[must_use]
    pub fn copy(&self) -> Self {
        let bricks: Vec<Brick> = self.bricks.as_slice().iter().cloned().collect();
        Self::new(self.bounding_box, self.grid, Collection::new(bricks, self.bricks.backend()))
    }
}

/// A [`BrickWall`] pinned between barriers via [`BrickWall::persist`].
pub struct PersistedWall {
    bounding_box: Box3,
    grid: Grid,
    bricks: Persisted<Brick>,
}

impl PersistedWall {
    #[must_use]
    pub fn wall(&self) -> BrickWall {
        BrickWall::new(self.bounding_box, self.grid, self.bricks.collection())
    }

    pub fn unpersist(self) {
        self.bricks.unpersist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickflow_core::{Dtype, VoxelBuffer};

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

    fn c(z: i64, y: i64, x: i64) -> Coord3 {
        Coord3::new(z, y, x)
    }

    fn dense_wall(side: i64, block: i64, value: u8) -> BrickWall {
        let grid = Grid::new(Coord3::splat(block), Coord3::zero()).unwrap();
        let bbox = Box3::new(Coord3::zero(), Coord3::splat(side));
        BrickWall::from_accessor_func(
            bbox,
            grid,
            Arc::new(ConstAccessor(value)),
            Backend::Sequential,
            1,
            None,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn from_accessor_func_covers_the_bounding_box() {
        let wall = dense_wall(4, 2, 1);
        assert_eq!(wall.bricks.len(), 8);
    }

    #[test]
    fn drop_empty_removes_zero_bricks() {
        let logical_a = Box3::new(c(0, 0, 0), c(2, 2, 2));
        let logical_b = Box3::new(c(2, 0, 0), c(4, 2, 2));
        let empty = Brick::new(logical_a, logical_a, VoxelBuffer::zeros(logical_a.shape(), Dtype::U8)).unwrap();
        let mut filled_vol = VoxelBuffer::zeros(logical_b.shape(), Dtype::U8);
        if let VoxelBuffer::U8(a) = &mut filled_vol {
            a.fill(5);
        }
        let filled = Brick::new(logical_b, logical_b, filled_vol).unwrap();

        let wall = BrickWall::new(
            Box3::new(c(0, 0, 0), c(4, 2, 2)),
            Grid::new(c(2, 2, 2), Coord3::zero()).unwrap(),
            Collection::new(vec![empty, filled], Backend::Sequential),
        );
        let dropped = wall.drop_empty().unwrap();
        assert_eq!(dropped.bricks.len(), 1);
    }

    #[test]
    fn translate_moves_boxes_without_touching_data() {
        let wall = dense_wall(2, 2, 7);
        let translated = wall.translate(c(10, 0, 0)).unwrap();
        assert_eq!(translated.grid.offset, c(10, 0, 0));
        let bricks = translated.bricks.into_vec();
        assert_eq!(bricks[0].logical_box.lo, c(10, 0, 0));
        if let VoxelBuffer::U8(a) = &*bricks[0].volume().unwrap() {
            assert!(a.iter().all(|v| *v == 7));
        } else {
            panic!("wrong dtype");
        }
    }

    #[test]
    fn copy_is_independent_of_the_original() {
        let wall = dense_wall(2, 2, 3);
        let copy = wall.copy();
        assert_eq!(copy.bricks.len(), wall.bricks.len());
    }

    #[test]
    fn realign_to_new_grid_preserves_total_volume() {
        let wall = dense_wall(4, 4, 9);
        let new_grid = Grid::new(c(2, 4, 4), Coord3::zero()).unwrap();
        let realigned = wall.realign_to_new_grid(new_grid).unwrap();
        let total_vol: u64 = realigned
            .bricks
            .as_slice()
            .iter()
            .map(|b| b.physical_box.volume())
            .sum();
        assert_eq!(total_vol, 4 * 4 * 4);
    }
}
