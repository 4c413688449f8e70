//! The ordered collection of placed subnets

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::cidr::{prefix_size, range_of, to_dotted, AddressRange, BaseBlock, Cidr4};
use crate::validate::validate;
use crate::Error;
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Number of [`Role`] variants
const ROLE_COUNT: u8 = 3;

/// Unrecognised role name
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid subnet role {0:?}")]
pub struct InvalidRole(pub String);

/// Descriptive tag of a placed subnet
///
/// Only used to group subnets for display; it has no effect on addressing.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Primitive)]
#[cfg_attr(
    feature = "impl-serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[repr(u8)]
pub enum Role {
    Public = 0,
    Private = 1,
    Database = 2,
}

impl Role {
    /// The role after this one in the cycle `public -> private -> database -> public`
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_u8((self as u8 + 1) % ROLE_COUNT).unwrap_or(Self::Public)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
            Self::Database => write!(f, "database"),
        }
    }
}

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "database" | "db" => Ok(Self::Database),
            _ => Err(InvalidRole(s.to_string())),
        }
    }
}

/// A subnet placed into a base block
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedSubnet {
    pub range: AddressRange,
    pub prefix_len: u8,
    /// Start of the base block the subnet was placed into
    pub base_start: u32,
    pub role: Role,
}

impl PlacedSubnet {
    /// Build a subnet of `prefix_len` at `start` for `base`
    ///
    /// This only computes the footprint; placement rules are checked when the
    /// subnet is added to an [`AllocationStore`].
    pub fn new(start: u32, prefix_len: u8, base: &BaseBlock, role: Role) -> Result<Self, Error> {
        Ok(Self {
            range: range_of(start, prefix_len)?,
            prefix_len,
            base_start: base.start(),
            role,
        })
    }

    #[must_use]
    pub const fn start(&self) -> u32 {
        self.range.start
    }

    #[must_use]
    pub const fn end(&self) -> u32 {
        self.range.end
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.range.size
    }

    /// Usable host addresses
    #[must_use]
    pub const fn host_count(&self) -> u64 {
        self.range.size.saturating_sub(2)
    }

    #[must_use]
    pub fn cidr(&self) -> Cidr4 {
        Cidr4::new(Ipv4Addr::from(self.range.start), self.prefix_len)
    }
}

impl Display for PlacedSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cidr(), self.role)
    }
}

/// One line of the allocation summary
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SummaryRow {
    /// Position of the subnet counted from the lowest address, starting at 1
    pub rank: usize,
    pub cidr: String,
    pub first: String,
    pub last: String,
    pub host_count: u64,
    pub role: Role,
}

/// Placed subnets of one base block, in insertion order
///
/// Every entry is inside the base, aligned to its own size relative to the
/// base start, and disjoint from every other entry.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize))]
pub struct AllocationStore {
    base: BaseBlock,
    subnets: Vec<PlacedSubnet>,
}

impl AllocationStore {
    /// Create an empty store for `base`
    #[must_use]
    pub const fn new(base: BaseBlock) -> Self {
        Self {
            base,
            subnets: Vec::new(),
        }
    }

    #[must_use]
    pub const fn base(&self) -> &BaseBlock {
        &self.base
    }

    /// Switch to a new base block, dropping every placement
    pub fn replace_base(&mut self, base: BaseBlock) {
        self.base = base;
        self.clear();
    }

    #[must_use]
    pub fn subnets(&self) -> &[PlacedSubnet] {
        &self.subnets
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PlacedSubnet> {
        self.subnets.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subnets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subnets.is_empty()
    }

    /// Append a subnet after validating it against all current entries
    ///
    /// Returns the index of the new entry. A subnet built for another base
    /// block is rejected as out of bounds, one whose prefix length does not
    /// match its size as not aligned.
    pub fn add(&mut self, subnet: PlacedSubnet) -> Result<usize, Error> {
        if subnet.base_start != self.base.start() {
            return Err(Error::OutOfBounds);
        }
        if prefix_len_of(subnet.range.size) != Some(subnet.prefix_len) {
            return Err(Error::NotAligned);
        }
        validate(&subnet.range, &self.base, &self.subnets, None)?;
        self.subnets.push(subnet);
        Ok(self.subnets.len() - 1)
    }

    /// Build and add a subnet of `prefix_len` at `start`
    pub fn place(&mut self, start: u32, prefix_len: u8, role: Role) -> Result<usize, Error> {
        let subnet = PlacedSubnet::new(start, prefix_len, &self.base, role)?;
        self.add(subnet)
    }

    /// Move the entry at `index` to `range`, keeping its role
    ///
    /// The entry's own current position is ignored when checking overlap.
    /// The stored range is rebuilt from `range.start` and `range.size`. On
    /// failure the store is left unchanged.
    pub fn move_to(&mut self, index: usize, range: AddressRange) -> Result<(), Error> {
        let role = self
            .subnets
            .get(index)
            .ok_or(Error::IndexOutOfRange(index))?
            .role;
        let prefix_len = prefix_len_of(range.size).ok_or(Error::NotAligned)?;
        validate(&range, &self.base, &self.subnets, Some(index))?;
        let range = range_of(range.start, prefix_len)?;
        self.subnets[index] = PlacedSubnet {
            range,
            prefix_len,
            base_start: self.base.start(),
            role,
        };
        Ok(())
    }

    /// Remove and return the entry at `index`
    pub fn remove(&mut self, index: usize) -> Result<PlacedSubnet, Error> {
        if index >= self.subnets.len() {
            return Err(Error::IndexOutOfRange(index));
        }
        Ok(self.subnets.remove(index))
    }

    /// Advance the role of the entry at `index` and return the new role
    pub fn cycle_role(&mut self, index: usize) -> Result<Role, Error> {
        let subnet = self
            .subnets
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange(index))?;
        subnet.role = subnet.role.next();
        Ok(subnet.role)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.subnets.clear();
    }

    /// Display rank of every entry, indexed like [`Self::subnets`]
    ///
    /// Ranks count from 1 at the lowest start address. Entries are matched
    /// back by `(start, prefix_len)`, which is unique only because entries
    /// never overlap.
    #[must_use]
    pub fn rank(&self) -> Vec<usize> {
        let mut sorted: Vec<(u32, u8)> = self
            .subnets
            .iter()
            .map(|subnet| (subnet.start(), subnet.prefix_len))
            .collect();
        sorted.sort_unstable_by_key(|(start, _)| *start);
        debug_assert!(
            sorted.windows(2).all(|w| w[0].0 != w[1].0),
            "placed subnets share a start address"
        );
        self.subnets
            .iter()
            .map(|subnet| {
                let key = (subnet.start(), subnet.prefix_len);
                // Every key comes from `self.subnets`, so it is always found
                sorted.iter().position(|k| *k == key).map_or(0, |i| i + 1)
            })
            .collect()
    }

    /// Total number of addresses taken by placed subnets
    #[must_use]
    pub fn allocated_size(&self) -> u64 {
        self.subnets.iter().map(PlacedSubnet::size).sum()
    }

    /// Share of the base block taken by placed subnets, rounded to a whole percent
    #[must_use]
    pub fn allocated_percent(&self) -> u64 {
        let allocated = self.allocated_size();
        let total = self.base.size();
        (allocated * 100 + total / 2) / total
    }

    /// Summary rows in insertion order
    #[must_use]
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.subnets
            .iter()
            .zip(self.rank())
            .map(|(subnet, rank)| SummaryRow {
                rank,
                cidr: subnet.cidr().to_string(),
                first: to_dotted(subnet.start()),
                last: to_dotted(subnet.end()),
                host_count: subnet.host_count(),
                role: subnet.role,
            })
            .collect()
    }
}

/// Prefix length whose block has exactly `size` addresses
fn prefix_len_of(size: u64) -> Option<u8> {
    if !size.is_power_of_two() || size > prefix_size(0) {
        return None;
    }
    u8::try_from(32 - size.trailing_zeros()).ok()
}
