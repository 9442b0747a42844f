//! Partition-local label relabeling.

use brickflow_brick::Brick;
use brickflow_core::{Result, VoxelBuffer};
use hashbrown::HashMap;

/// A label-to-label mapping built once per partition and then applied to
/// every brick in that partition. Labels not present in the mapping pass
/// through unchanged.
pub struct LabelMapper {
    pairs: HashMap<u64, u64>,
}

impl LabelMapper {
    #[must_use]
    pub fn new(pairs: &[(u64, u64)]) -> Self {
        Self {
            pairs: pairs.iter().copied().collect(),
        }
    }

    fn map_one(&self, v: u64) -> u64 {
        *self.pairs.get(&v).unwrap_or(&v)
    }

    /// Remap every voxel in `buf` in place; unmapped labels are left
    /// untouched.
    pub fn apply_inplace(&self, buf: &mut VoxelBuffer) {
        match buf {
            VoxelBuffer::U8(a) => a.mapv_inplace(|v| self.map_one(u64::from(v)) as u8),
            VoxelBuffer::U16(a) => a.mapv_inplace(|v| self.map_one(u64::from(v)) as u16),
            VoxelBuffer::U32(a) => a.mapv_inplace(|v| self.map_one(u64::from(v)) as u32),
            VoxelBuffer::U64(a) => a.mapv_inplace(|v| self.map_one(v)),
        }
    }
}

/// Remap `brick`'s buffer in place according to `mapper`.
pub fn relabel_brick(mapper: &LabelMapper, brick: &Brick) -> Result<()> {
    brick.with_volume_mut(|buf| mapper.apply_inplace(buf))
}
