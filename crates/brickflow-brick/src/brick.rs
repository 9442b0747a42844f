//! The `Brick` type and its four-state volume lifecycle.

use crate::compressed::CompressedVolume;
use brickflow_core::{Box3, Error, Result, VolumeAccessor, VoxelBuffer};
use std::cell::{Ref, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The internal state of a Brick's voxel buffer.
///
/// Transitions: `Lazy` and `Compressed` both collapse to `Materialised`
/// on first read; `compress()` moves `Materialised` back to `Compressed`;
/// `destroy()` moves any state to the terminal `Destroyed`.
enum BrickData {
    Materialised(VoxelBuffer),
    Compressed(CompressedVolume),
    Lazy(Arc<dyn VolumeAccessor>),
    Destroyed,
}

impl Clone for BrickData {
    fn clone(&self) -> Self {
        match self {
            BrickData::Materialised(v) => BrickData::Materialised(v.clone()),
            BrickData::Compressed(c) => BrickData::Compressed(c.clone()),
            BrickData::Lazy(f) => BrickData::Lazy(Arc::clone(f)),
            BrickData::Destroyed => BrickData::Destroyed,
        }
    }
}

/// A unit of work: a logical grid cell, the physical extent actually
/// backed by data, and a lazily-materialised voxel buffer.
///
/// `logical_box` is always an exact grid cell;
/// `physical_box` is the region the buffer covers and may be smaller
/// (edge of volume) or larger (halo present).
pub struct Brick {
    pub logical_box: Box3,
    pub physical_box: Box3,
    data: RefCell<BrickData>,
    custom_hash: Option<u64>,
}

impl Brick {
    /// Construct an already-materialised brick.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `volume`'s shape doesn't equal
    /// `shape(physical_box)`.
    pub fn new(logical_box: Box3, physical_box: Box3, volume: VoxelBuffer) -> Result<Self> {
        if volume.shape() != physical_box.shape() {
            return Err(Error::ShapeMismatch {
                expected: physical_box.shape().to_array(),
                actual: volume.shape().to_array(),
            });
        }
        Ok(Self {
            logical_box,
            physical_box,
            data: RefCell::new(BrickData::Materialised(volume)),
            custom_hash: None,
        })
    }

    /// Construct a brick whose data will be fetched from `accessor` on
    /// first read of [`Brick::volume`].
    #[must_use]
    pub fn new_lazy(logical_box: Box3, physical_box: Box3, accessor: Arc<dyn VolumeAccessor>) -> Self {
        Self {
            logical_box,
            physical_box,
            data: RefCell::new(BrickData::Lazy(accessor)),
            custom_hash: None,
        }
    }

    /// Construct a brick directly from a pre-compressed payload (used
    /// when reassembling a brick received from a shuffle).
    #[must_use]
    pub fn from_compressed(logical_box: Box3, physical_box: Box3, compressed: CompressedVolume) -> Self {
        Self {
            logical_box,
            physical_box,
            data: RefCell::new(BrickData::Compressed(compressed)),
            custom_hash: None,
        }
    }

    /// Explicitly set this brick's hash, overriding the default
    /// logical-box-derived one. Used during regridding to force
    /// fragments destined for the same logical box into the same
    /// shuffle partition.
    #[must_use]
    pub fn with_hash(mut self, hash: u64) -> Self {
        self.custom_hash = Some(hash);
        self
    }

    /// This brick's hash: the explicit override if one was set via
    /// [`Brick::with_hash`], else a deterministic function of
    /// `logical_box.lo` that spreads cells uniformly across partitions.
    #[must_use]
    pub fn brick_hash(&self) -> u64 {
        match self.custom_hash {
            Some(h) => h,
            None => {
                let mut hasher = DefaultHasher::new();
                self.logical_box.lo.to_array().hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    /// Materialise the buffer in place if currently `Lazy` or
    /// `Compressed`; a no-op if already `Materialised`.
    fn materialise(&self) -> Result<()> {
        let mut data = self.data.borrow_mut();
        match &*data {
            BrickData::Destroyed => {
                return Err(Error::DestroyedBrick(format!("{self}")));
            }
            BrickData::Materialised(_) => {}
            BrickData::Compressed(compressed) => {
                let vol = compressed.decompress()?;
                *data = BrickData::Materialised(vol);
            }
            BrickData::Lazy(accessor) => {
                let vol = accessor.fetch(self.physical_box)?;
                if vol.shape() != self.physical_box.shape() {
                    return Err(Error::ShapeMismatch {
                        expected: self.physical_box.shape().to_array(),
                        actual: vol.shape().to_array(),
                    });
                }
                *data = BrickData::Materialised(vol);
            }
        }
        Ok(())
    }

    /// Access the voxel buffer, materialising it first if the brick is
    /// currently `Lazy` or `Compressed`.
    ///
    /// # Errors
    /// [`Error::DestroyedBrick`] if the brick was explicitly destroyed.
    /// [`Error::ShapeMismatch`] if a lazy accessor's returned buffer
    /// doesn't match `shape(physical_box)` — this is a permanent,
    /// non-retryable failure of the brick.
    pub fn volume(&self) -> Result<Ref<'_, VoxelBuffer>> {
        self.materialise()?;
        Ok(Ref::map(self.data.borrow(), |d| match d {
            BrickData::Materialised(v) => v,
            _ => unreachable!("just materialised above"),
        }))
    }

    /// Mutate the materialised buffer in place, materialising first if
    /// necessary. Used by transforms that rewrite voxels without
    /// changing the buffer's shape (e.g. label remapping), so they avoid
    /// allocating a whole new buffer per brick.
    ///
    /// # Errors
    /// Same as [`Brick::volume`].
    pub fn with_volume_mut<R>(&self, f: impl FnOnce(&mut VoxelBuffer) -> R) -> Result<R> {
        self.materialise()?;
        let mut data = self.data.borrow_mut();
        match &mut *data {
            BrickData::Materialised(v) => Ok(f(v)),
            _ => unreachable!("just materialised above"),
        }
    }

    /// Compress the buffer in place. A no-op unless currently
    /// `Materialised`; will be decompressed again transparently on the
    /// next [`Brick::volume`] call.
    ///
    /// # Errors
    /// [`Error::DestroyedBrick`] if already destroyed.
    pub fn compress(&self) -> Result<()> {
        let mut data = self.data.borrow_mut();
        match &*data {
            BrickData::Destroyed => Err(Error::DestroyedBrick(format!(
                "logical: {:?}",
                self.logical_box
            ))),
            BrickData::Materialised(vol) => {
                let compressed = CompressedVolume::compress(vol)?;
                *data = BrickData::Compressed(compressed);
                Ok(())
            }
            BrickData::Compressed(_) | BrickData::Lazy(_) => Ok(()),
        }
    }

    /// Release the buffer and mark the brick terminally destroyed. Any
    /// subsequent call to [`Brick::volume`] or [`Brick::compress`] fails.
    /// Used during assembly to bound peak memory.
    pub fn destroy(&self) {
        *self.data.borrow_mut() = BrickData::Destroyed;
    }

    /// True if this brick's state is `Destroyed`.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        matches!(&*self.data.borrow(), BrickData::Destroyed)
    }
}

impl Clone for Brick {
    fn clone(&self) -> Self {
        Self {
            logical_box: self.logical_box,
            physical_box: self.physical_box,
            data: RefCell::new(self.data.borrow().clone()),
            custom_hash: self.custom_hash,
        }
    }
}

impl fmt::Display for Brick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.logical_box == self.physical_box {
            write!(f, "logical & physical: {:?}", self.logical_box)
        } else {
            write!(
                f,
                "logical: {:?}, physical: {:?}",
                self.logical_box, self.physical_box
            )
        }
    }
}

impl fmt::Debug for Brick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Brick({self})")
    }
}
