//! Legal placement positions for a subnet size

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::cidr::{prefix_size, range_of, AddressRange, BaseBlock};
use crate::store::{PlacedSubnet, Role};
use crate::validate::{check_alignment, find_overlap, validate};
use crate::Error;

/// A position where a subnet can be placed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    pub range: AddressRange,
    /// The subnet that placing into this slot would create
    pub candidate: PlacedSubnet,
}

/// Every slot of `prefix_len` in `base` that is free in `existing`, by ascending start
///
/// Slots are walked in steps of the subnet size from the base start up to
/// and including `base.end - size + 1`. `exclude` names an entry of
/// `existing` to ignore, used while moving that entry.
#[must_use]
pub fn enumerate(
    prefix_len: u8,
    role: Role,
    base: &BaseBlock,
    existing: &[PlacedSubnet],
    exclude: Option<usize>,
) -> Vec<Slot> {
    let size = prefix_size(prefix_len);
    let Some(last) = (u64::from(base.end()) + 1).checked_sub(size) else {
        // Larger than the base
        return Vec::new();
    };
    let mut slots = Vec::new();
    let mut pos = u64::from(base.start());
    while pos <= last {
        let Ok(start) = u32::try_from(pos) else {
            break;
        };
        pos += size;
        let Ok(range) = range_of(start, prefix_len) else {
            continue;
        };
        if check_alignment(&range, base).is_err() {
            continue;
        }
        if find_overlap(&range, existing, exclude).is_some() {
            continue;
        }
        slots.push(Slot {
            range,
            candidate: PlacedSubnet {
                range,
                prefix_len,
                base_start: base.start(),
                role,
            },
        });
    }
    slots
}

/// Round `address` down to the nearest boundary of a `prefix_len` subnet,
/// counted from the base start
///
/// Fails with [`Error::OutOfBounds`] if `address` is outside the base.
pub fn snap(address: u32, prefix_len: u8, base: &BaseBlock) -> Result<AddressRange, Error> {
    if !base.range().contains(address) {
        return Err(Error::OutOfBounds);
    }
    let relative = u64::from(address - base.start());
    let aligned = relative - relative % prefix_size(prefix_len);
    let start = u32::try_from(u64::from(base.start()) + aligned).map_err(|_| Error::OutOfBounds)?;
    range_of(start, prefix_len)
}

/// Snap `address` and validate the result as a placement
///
/// This is the single-target counterpart of [`enumerate`]: it returns the
/// slot under the pointer or the reason it cannot be used.
pub fn target(
    address: u32,
    prefix_len: u8,
    role: Role,
    base: &BaseBlock,
    existing: &[PlacedSubnet],
    exclude: Option<usize>,
) -> Result<Slot, Error> {
    let range = snap(address, prefix_len, base)?;
    validate(&range, base, existing, exclude)?;
    Ok(Slot {
        range,
        candidate: PlacedSubnet {
            range,
            prefix_len,
            base_start: base.start(),
            role,
        },
    })
}
