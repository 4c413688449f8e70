//! Placement validation
//!
//! The individual checks are exposed separately so that the position
//! enumerator can skip the bounds check, which its loop already guarantees.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::cidr::{prefix_size, AddressRange, BaseBlock};
use crate::store::PlacedSubnet;
use crate::Error;

/// Fail unless `candidate` is a block of a power-of-two size whose `end` matches it
///
/// A bad size is reported as [`Error::NotAligned`], a bad end as
/// [`Error::OutOfBounds`].
pub fn check_shape(candidate: &AddressRange) -> Result<(), Error> {
    if !candidate.size.is_power_of_two() || candidate.size > prefix_size(0) {
        return Err(Error::NotAligned);
    }
    if u64::from(candidate.end) + 1 != u64::from(candidate.start) + candidate.size {
        return Err(Error::OutOfBounds);
    }
    Ok(())
}

/// Fail with [`Error::OutOfBounds`] unless `candidate` lies within `base`
pub fn check_bounds(candidate: &AddressRange, base: &BaseBlock) -> Result<(), Error> {
    if candidate.start < base.start() || candidate.end > base.end() {
        return Err(Error::OutOfBounds);
    }
    Ok(())
}

/// Fail with [`Error::NotAligned`] unless `candidate` starts on a multiple of
/// its own size, counted from the start of `base`
pub fn check_alignment(candidate: &AddressRange, base: &BaseBlock) -> Result<(), Error> {
    let relative = candidate
        .start
        .checked_sub(base.start())
        .ok_or(Error::OutOfBounds)?;
    if candidate.size == 0 || u64::from(relative) % candidate.size != 0 {
        return Err(Error::NotAligned);
    }
    Ok(())
}

/// Index of the first entry in `existing` that `candidate` overlaps,
/// ignoring the entry at `exclude`
#[must_use]
pub fn find_overlap(
    candidate: &AddressRange,
    existing: &[PlacedSubnet],
    exclude: Option<usize>,
) -> Option<usize> {
    existing
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != exclude)
        .find(|(_, subnet)| candidate.overlaps(&subnet.range))
        .map(|(index, _)| index)
}

/// Check that `candidate` may be placed into `base` next to `existing`
///
/// The shape of `candidate` is checked first, then bounds, alignment and
/// overlap in that order, and the first failure is returned. `exclude` names an entry of `existing` to ignore,
/// which is the subnet itself when validating a move.
pub fn validate(
    candidate: &AddressRange,
    base: &BaseBlock,
    existing: &[PlacedSubnet],
    exclude: Option<usize>,
) -> Result<(), Error> {
    check_shape(candidate)?;
    check_bounds(candidate, base)?;
    check_alignment(candidate, base)?;
    match find_overlap(candidate, existing, exclude) {
        Some(index) => Err(Error::Overlaps(index)),
        None => Ok(()),
    }
}
