//! CIDRPLAN -- carve an IPv4 block into aligned, non-overlapping subnets
//!
//! The library is the placement engine behind an interactive subnet planner.
//! It parses and normalises a base block, lists the subnet sizes that fit in
//! it, validates and enumerates placement positions, and keeps the ordered
//! collection of placed subnets. Rendering and input handling belong to the
//! caller, which drives everything through [`Planner`] or the lower-level
//! functions directly.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod catalog;
pub mod cidr;
pub mod geometry;
pub mod planner;
pub mod position;
pub mod store;
pub mod validate;

pub use catalog::{generate_catalog, CandidateSize};
pub use cidr::{AddressRange, BaseBlock, Cidr4};
pub use planner::{Intent, Planner};
pub use position::{enumerate, snap, Slot};
pub use store::{AllocationStore, PlacedSubnet, Role};
pub use validate::validate;

use std::fmt;

/// Coarsest prefix accepted for a base block
pub const MIN_BASE_PREFIX: u8 = 16;

/// Finest prefix offered by the subnet catalog (16-address subnets)
pub const FINEST_PREFIX: u8 = 28;

/// Part of a CIDR string that failed to parse
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Field {
    /// The string is not `a.b.c.d/prefix`
    Shape,
    /// Octet at the given index (0 is leftmost) is not a number in 0..=255
    Octet(u8),
    /// Prefix length is not a number in 0..=32
    Prefix,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape => write!(f, "shape"),
            Self::Octet(n) => write!(f, "octet {n}"),
            Self::Prefix => write!(f, "prefix length"),
        }
    }
}

/// Planner errors
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid CIDR notation ({0})")]
    InvalidFormat(Field),
    #[error("prefix /{0} is broader than /16")]
    PrefixTooBroad(u8),
    #[error("subnet is not aligned to its size within the base block")]
    NotAligned,
    #[error("subnet lies outside the base block")]
    OutOfBounds,
    #[error("subnet overlaps the subnet at index {0}")]
    Overlaps(usize),
    #[error("no subnet at index {0}")]
    IndexOutOfRange(usize),
    #[error("no base block has been set")]
    NoBase,
}
