//! Regridding: reshuffling bricks tiled on one grid into bricks tiled on
//! another, via split → shuffle → assemble.

use brickflow_brick::Brick;
use brickflow_collection::{Backend, Collection, HashedKey};
use brickflow_core::{Box3, Coord3, Error, Grid, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Chop up every brick in `bricks` according to the cells of `new_grid`
/// it overlaps, shuffle fragments by destination, and reassemble them
/// into a fresh set of bricks tiled on `new_grid`.
///
/// Destination cells whose only contributing fragments lie entirely
/// within `new_grid`'s halo (i.e. none of the fragment data actually
/// falls inside the logical box) are dropped, matching
/// [`assemble_brick_fragments`]'s `None` case.
pub fn realign_to_new_grid(new_grid: Grid, bricks: Collection<Brick>) -> Result<Collection<Brick>> {
    let backend = bricks.backend();
    let fragments: Vec<(HashedKey<Box3>, Brick)> = bricks
        .into_vec()
        .into_iter()
        .map(|brick| split_brick(new_grid, &brick))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    let grouped = Collection::new(fragments, backend).group_by_key();
    let assembled: Vec<Brick> = grouped
        .into_vec()
        .into_iter()
        .map(|(_, frags)| assemble_brick_fragments(frags))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(Collection::new(assembled, backend))
}

/// Split a single brick into fragments, one per cell of `new_grid` its
/// physical extent overlaps (including cells only reached via
/// `new_grid`'s halo).
///
/// `brick`'s physical box must not exceed its logical box — splitting a
/// brick with an existing halo would duplicate voxels across fragments
/// with no defined ownership.
///
/// # Errors
/// [`Error::ContractViolation`] if `brick.physical_box` is larger than
/// `brick.logical_box`.
pub fn split_brick(new_grid: Grid, brick: &Brick) -> Result<Vec<(HashedKey<Box3>, Brick)>> {
    if !within(brick.physical_box, brick.logical_box) {
        return Err(Error::ContractViolation(format!(
            "split_brick requires physical_box ({:?}) within logical_box ({:?})",
            brick.physical_box, brick.logical_box
        )));
    }

    let volume = brick.volume()?;
    let mut fragments = Vec::new();

    for new_logical in new_grid.cells_over(brick.physical_box, true) {
        let destination_box = new_logical.expand(new_grid.halo);
        let split_box = destination_box.intersect(brick.physical_box);
        if split_box.is_empty() {
            continue;
        }

        let fragment_vol = volume.extract(split_box, brick.physical_box.lo)?;
        let fragment = Brick::new(new_logical, split_box, fragment_vol)?;
        fragment.compress()?;

        let hash = cell_hash(new_logical, new_grid);
        fragments.push((HashedKey::new(new_logical, hash), fragment));
    }

    Ok(fragments)
}

/// Splice a group of same-destination fragments into one brick covering
/// their combined physical extent.
///
/// Returns `Ok(None)` if every fragment lies entirely within the
/// destination's halo (no fragment data overlaps the logical box at
/// all) — there is nothing meaningful to assemble.
///
/// # Errors
/// Propagates any error reading or writing a fragment's buffer.
pub fn assemble_brick_fragments(fragments: Vec<Brick>) -> Result<Option<Brick>> {
    let Some(first) = fragments.first() else {
        return Ok(None);
    };
    let final_logical_box = first.logical_box;

    let mut final_physical_box = fragments[0].physical_box;
    for frag in &fragments[1..] {
        debug_assert_eq!(
            frag.logical_box, final_logical_box,
            "cannot assemble fragments from different logical boxes"
        );
        final_physical_box = Box3::new(
            final_physical_box.lo.min(frag.physical_box.lo),
            final_physical_box.hi.max(frag.physical_box.hi),
        );
    }

    let interior = final_physical_box.intersect(final_logical_box);
    if interior.is_empty() {
        return Ok(None);
    }

    let dtype = fragments[0].volume()?.dtype();
    let mut final_volume = brickflow_core::VoxelBuffer::zeros(final_physical_box.shape(), dtype);

    for frag in &fragments {
        let frag_vol = frag.volume()?;
        final_volume.overwrite(frag.physical_box, final_physical_box.lo, &frag_vol)?;
        drop(frag_vol);
        frag.destroy();
    }

    let brick = Brick::new(final_logical_box, final_physical_box, final_volume)?;
    brick.compress()?;
    Ok(Some(brick))
}

fn cell_hash(logical_box: Box3, grid: Grid) -> u64 {
    let index = (logical_box.lo - grid.offset).div_floor(grid.block_shape);
    let mut hasher = DefaultHasher::new();
    index.to_array().hash(&mut hasher);
    hasher.finish()
}

fn within(inner: Box3, outer: Box3) -> bool {
    let il = inner.lo.to_array();
    let ih = inner.hi.to_array();
    let ol = outer.lo.to_array();
    let oh = outer.hi.to_array();
    (0..3).all(|i| il[i] >= ol[i] && ih[i] <= oh[i])
}
