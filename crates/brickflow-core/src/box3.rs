//! Axis-aligned integer 3D intervals, half-open `[lo, hi)`.

use crate::coord::Coord3;
use crate::error::{Error, Result};
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A half-open axis-aligned box `[lo, hi)` in global (z, y, x) coordinates.
///
/// A box with a non-positive shape component (i.e. `hi <= lo` on some
/// axis) is empty and represents "no intersection".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box3 {
    pub lo: Coord3,
    pub hi: Coord3,
}

impl Box3 {
    #[inline]
    #[must_use]
    pub const fn new(lo: Coord3, hi: Coord3) -> Self {
        Self { lo, hi }
    }

    /// Shape of the box: `hi - lo`. May have non-positive components if
    /// the box is empty.
    #[inline]
    #[must_use]
    pub fn shape(self) -> Coord3 {
        self.hi - self.lo
    }

    /// A box is empty if its shape is not strictly positive on every axis.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.shape().all_positive()
    }

    /// Total voxel count. Zero for an empty box.
    #[must_use]
    pub fn volume(self) -> u64 {
        if self.is_empty() {
            0
        } else {
            let s = self.shape();
            (s.z as u64) * (s.y as u64) * (s.x as u64)
        }
    }

    /// Componentwise intersection. The result may be empty (non-positive
    /// shape), which is not an error — callers check `is_empty()`.
    #[inline]
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::new(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    /// Translate both endpoints by `delta`.
    #[inline]
    #[must_use]
    pub fn translate(self, delta: Coord3) -> Self {
        Self::new(self.lo + delta, self.hi + delta)
    }

    /// True if `self` and `other` overlap on every axis (non-empty
    /// intersection).
    #[inline]
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Expand the box outward by `halo` on every axis (subtract from lo,
    /// add to hi).
    #[inline]
    #[must_use]
    pub fn expand(self, halo: Coord3) -> Self {
        Self::new(self.lo - halo, self.hi + halo)
    }

    /// Elementwise scale (used by `downsample`/`translate` on grids).
    #[inline]
    #[must_use]
    pub fn scaled_down(self, factor: i64) -> Self {
        Self::new(self.lo / factor, self.hi / factor)
    }

    /// Convert `self` (assumed to lie within a buffer whose origin is
    /// `origin`) to `usize` ranges suitable for `ndarray` slicing.
    ///
    /// # Errors
    /// Returns [`Error::ContractViolation`] if `self - origin` is not
    /// non-negative on every axis, i.e. `self` is not contained in a
    /// buffer rooted at `origin`.
    pub fn to_slice(self, origin: Coord3) -> Result<[Range<usize>; 3]> {
        let rel = self.translate(Coord3::zero() - origin);
        if !rel.lo.all_non_negative() || !rel.shape().all_positive() {
            return Err(Error::ContractViolation(format!(
                "box {self:?} is not contained in a buffer rooted at {origin:?}"
            )));
        }
        Ok([
            rel.lo.z as usize..rel.hi.z as usize,
            rel.lo.y as usize..rel.hi.y as usize,
            rel.lo.x as usize..rel.hi.x as usize,
        ])
    }
}

/// Copy the subregion `b` (in the same global coordinates as `vol`'s
/// origin) out of `vol`, where `vol`'s origin (the coordinate of its
/// `[0,0,0]` element) is `origin`.
///
/// # Errors
/// Returns an error if `b` does not lie within `vol`'s extent.
pub fn extract_subvol<T: Clone>(vol: &Array3<T>, b: Box3, origin: Coord3) -> Result<Array3<T>> {
    let slice = b.to_slice(origin)?;
    let [rz, ry, rx] = slice;
    Ok(vol.slice(ndarray::s![rz, ry, rx]).to_owned())
}

/// Write `src` into `vol[b - origin]`, where `vol`'s origin is `origin`.
///
/// # Errors
/// Returns an error if `b` does not lie within `vol`'s extent, or if
/// `src`'s shape doesn't match `shape(b)`.
pub fn overwrite_subvol<T: Clone>(
    vol: &mut Array3<T>,
    b: Box3,
    origin: Coord3,
    src: ArrayView3<'_, T>,
) -> Result<()> {
    let slice = b.to_slice(origin)?;
    let want = b.shape();
    let want_shape = [want.z as usize, want.y as usize, want.x as usize];
    if src.shape() != want_shape {
        return Err(Error::ShapeMismatch {
            expected: want.to_array(),
            actual: [
                src.shape()[0] as i64,
                src.shape()[1] as i64,
                src.shape()[2] as i64,
            ],
        });
    }
    let [rz, ry, rx] = slice;
    vol.slice_mut(ndarray::s![rz, ry, rx]).assign(&src);
    Ok(())
}
