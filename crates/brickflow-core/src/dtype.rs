//! The fixed set of scalar voxel types a brick's buffer may hold.

use serde::{Deserialize, Serialize};

/// One of the four scalar dtypes a [`Brick`](../brickflow_brick/struct.Brick.html)'s
/// voxel buffer may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    U8,
    U16,
    U32,
    U64,
}

impl Dtype {
    /// Size in bytes of one scalar of this dtype.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::U16 => 2,
            Dtype::U32 => 4,
            Dtype::U64 => 8,
        }
    }
}
