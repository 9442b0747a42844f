//! Isotropic brick downsampling: block averaging for grayscale data,
//! zero-suppressed mode filtering for label data.

use brickflow_brick::Brick;
use brickflow_core::{Box3, Coord3, Error, Result, VoxelBuffer};
use hashbrown::HashMap;
use ndarray::Array3;

/// Which reduction a [`downsample_brick`] call applies to each
/// `factor`-sized block of voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownsampleMethod {
    /// Most frequent non-zero value in the block; zero only if every
    /// voxel in the block is zero.
    Label,
    /// Rounded mean of the block.
    Grayscale,
}

/// Downsample `brick` by the isotropic `factor`, scaling both its
/// logical and physical boxes down to match.
///
/// # Errors
/// [`Error::ContractViolation`] if `factor` does not evenly divide every
/// coordinate of `brick.logical_box` or `brick.physical_box`.
pub fn downsample_brick(method: DownsampleMethod, factor: i64, brick: &Brick) -> Result<Brick> {
    if factor < 1 {
        return Err(Error::ContractViolation(format!(
            "downsample factor must be positive, got {factor}"
        )));
    }
    if !divides_evenly(brick.logical_box, factor) || !divides_evenly(brick.physical_box, factor) {
        return Err(Error::ContractViolation(format!(
            "downsample factor {factor} does not evenly divide logical_box {:?} or physical_box {:?}",
            brick.logical_box, brick.physical_box
        )));
    }

    let volume = brick.volume()?;
    let downsampled = match method {
        DownsampleMethod::Grayscale => downsample_grayscale(&volume, factor as usize),
        DownsampleMethod::Label => downsample_label(&volume, factor as usize),
    };
    drop(volume);

    let new_logical = brick.logical_box.scaled_down(factor);
    let new_physical = brick.physical_box.scaled_down(factor);
    Brick::new(new_logical, new_physical, downsampled)
}

fn divides_evenly(b: Box3, factor: i64) -> bool {
    b.lo
        .to_array()
        .iter()
        .chain(b.hi.to_array().iter())
        .all(|v| v.rem_euclid(factor) == 0)
}

fn downsample_grayscale(buf: &VoxelBuffer, factor: usize) -> VoxelBuffer {
    match buf {
        VoxelBuffer::U8(a) => VoxelBuffer::U8(block_mean_u8(a, factor)),
        VoxelBuffer::U16(a) => VoxelBuffer::U16(block_mean_u16(a, factor)),
        VoxelBuffer::U32(a) => VoxelBuffer::U32(block_mean_u32(a, factor)),
        VoxelBuffer::U64(a) => VoxelBuffer::U64(block_mean_u64(a, factor)),
    }
}

fn downsample_label(buf: &VoxelBuffer, factor: usize) -> VoxelBuffer {
    match buf {
        VoxelBuffer::U8(a) => VoxelBuffer::U8(block_mode_u8(a, factor)),
        VoxelBuffer::U16(a) => VoxelBuffer::U16(block_mode_u16(a, factor)),
        VoxelBuffer::U32(a) => VoxelBuffer::U32(block_mode_u32(a, factor)),
        VoxelBuffer::U64(a) => VoxelBuffer::U64(block_mode_u64(a, factor)),
    }
}

macro_rules! block_mean_fn {
    ($name:ident, $ty:ty) => {
        fn $name(arr: &Array3<$ty>, factor: usize) -> Array3<$ty> {
            let (dz, dy, dx) = arr.dim();
            let (oz, oy, ox) = (dz / factor, dy / factor, dx / factor);
            let count = (factor * factor * factor) as u64;
            Array3::from_shape_fn((oz, oy, ox), |(z, y, x)| {
                let mut sum: u64 = 0;
                for iz in 0..factor {
                    for iy in 0..factor {
                        for ix in 0..factor {
                            sum += u64::from(arr[[z * factor + iz, y * factor + iy, x * factor + ix]]);
                        }
                    }
                }
                ((sum + count / 2) / count) as $ty
            })
        }
    };
}

block_mean_fn!(block_mean_u8, u8);
block_mean_fn!(block_mean_u16, u16);
block_mean_fn!(block_mean_u32, u32);

fn block_mean_u64(arr: &Array3<u64>, factor: usize) -> Array3<u64> {
    let (dz, dy, dx) = arr.dim();
    let (oz, oy, ox) = (dz / factor, dy / factor, dx / factor);
    let count = (factor * factor * factor) as u128;
    Array3::from_shape_fn((oz, oy, ox), |(z, y, x)| {
        let mut sum: u128 = 0;
        for iz in 0..factor {
            for iy in 0..factor {
                for ix in 0..factor {
                    sum += u128::from(arr[[z * factor + iz, y * factor + iy, x * factor + ix]]);
                }
            }
        }
        ((sum + count / 2) / count) as u64
    })
}

macro_rules! block_mode_fn {
    ($name:ident, $ty:ty) => {
        fn $name(arr: &Array3<$ty>, factor: usize) -> Array3<$ty> {
            let (dz, dy, dx) = arr.dim();
            let (oz, oy, ox) = (dz / factor, dy / factor, dx / factor);
            Array3::from_shape_fn((oz, oy, ox), |(z, y, x)| {
                let mut counts: HashMap<$ty, usize> = HashMap::new();
                for iz in 0..factor {
                    for iy in 0..factor {
                        for ix in 0..factor {
                            let v = arr[[z * factor + iz, y * factor + iy, x * factor + ix]];
                            *counts.entry(v).or_insert(0) += 1;
                        }
                    }
                }
                let mut best: Option<($ty, usize)> = None;
                for (&v, &c) in &counts {
                    if v == 0 {
                        continue;
                    }
                    match best {
                        None => best = Some((v, c)),
                        Some((_, bc)) if c > bc => best = Some((v, c)),
                        _ => {}
                    }
                }
                best.map_or(0, |(v, _)| v)
            })
        }
    };
}

block_mode_fn!(block_mode_u8, u8);
block_mode_fn!(block_mode_u16, u16);
block_mode_fn!(block_mode_u32, u32);
block_mode_fn!(block_mode_u64, u64);
