//! IPv4 CIDR arithmetic
//!
//! Every address is a plain `u32` in host order. Sizes are kept as `u64` so
//! that a /0 range (2^32 addresses) is representable without wrapping.

// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::module_name_repetitions)]

use crate::{Error, Field, MIN_BASE_PREFIX};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Number of addresses covered by a prefix length
///
/// Prefix lengths above 32 are treated as 32.
#[must_use]
pub const fn prefix_size(prefix_len: u8) -> u64 {
    let host_bits = if prefix_len > 32 { 0 } else { 32 - prefix_len };
    1u64 << host_bits
}

/// Parse one octet of a dotted-decimal address: one to three ASCII digits, at most 255
fn parse_octet(text: &str, index: u8) -> Result<u8, Error> {
    if text.is_empty() || text.len() > 3 || !text.bytes().all(|c| c.is_ascii_digit()) {
        return Err(Error::InvalidFormat(Field::Shape));
    }
    text.parse()
        .map_err(|_| Error::InvalidFormat(Field::Octet(index)))
}

/// Parse a prefix length: `0`..`32` without leading zeros
fn parse_prefix_len(text: &str) -> Result<u8, Error> {
    let well_formed = match text.as_bytes() {
        [d] => d.is_ascii_digit(),
        [b'1'..=b'2', d] => d.is_ascii_digit(),
        [b'3', b'0'..=b'2'] => true,
        _ => false,
    };
    if !well_formed {
        return Err(Error::InvalidFormat(Field::Prefix));
    }
    text.parse().map_err(|_| Error::InvalidFormat(Field::Prefix))
}

/// Pack a dotted-decimal address into a `u32`, leftmost octet most significant
pub fn to_address(dotted: &str) -> Result<u32, Error> {
    let mut octets = [0u8; 4];
    let mut parts = dotted.split('.');
    for (index, octet) in (0u8..).zip(octets.iter_mut()) {
        let part = parts.next().ok_or(Error::InvalidFormat(Field::Shape))?;
        *octet = parse_octet(part, index)?;
    }
    if parts.next().is_some() {
        return Err(Error::InvalidFormat(Field::Shape));
    }
    Ok(u32::from_be_bytes(octets))
}

/// Format a `u32` address as dotted decimal
#[must_use]
pub fn to_dotted(address: u32) -> String {
    Ipv4Addr::from(address).to_string()
}

/// Clear the host bits of `address` for the given prefix length
#[must_use]
pub const fn network_boundary(address: u32, prefix_len: u8) -> u32 {
    let host_bits = if prefix_len > 32 { 0 } else { 32 - prefix_len as u32 };
    let mask = match u32::MAX.checked_shl(host_bits) {
        Some(mask) => mask,
        None => 0,
    };
    address & mask
}

/// Inclusive address range of a power-of-two size
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AddressRange {
    pub start: u32,
    pub end: u32,
    pub size: u64,
}

impl AddressRange {
    /// Range of `2^(32 - prefix_len)` addresses starting at `start`
    ///
    /// `start` is taken as-is; normalise it with [`network_boundary`] first
    /// if it may carry host bits.
    pub fn from_start(start: u32, prefix_len: u8) -> Result<Self, Error> {
        if prefix_len > 32 {
            return Err(Error::InvalidFormat(Field::Prefix));
        }
        let size = prefix_size(prefix_len);
        let end = u32::try_from(u64::from(start) + size - 1).map_err(|_| Error::OutOfBounds)?;
        Ok(Self { start, end, size })
    }

    /// Whether `address` lies within the range
    #[must_use]
    pub const fn contains(&self, address: u32) -> bool {
        self.start <= address && address <= self.end
    }

    /// Whether the two ranges share at least one address
    ///
    /// Either endpoint of `self` inside `other`, or `self` covering `other`.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        other.contains(self.start)
            || other.contains(self.end)
            || (self.start <= other.start && self.end >= other.end)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", to_dotted(self.start), to_dotted(self.end))
    }
}

/// Range of the block of `prefix_len` starting at `address`
pub fn range_of(address: u32, prefix_len: u8) -> Result<AddressRange, Error> {
    AddressRange::from_start(address, prefix_len)
}

/// A IPv4 CIDR block
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cidr4 {
    pub addr: Ipv4Addr,
    pub prefix_len: u8,
}

impl fmt::Display for Cidr4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Cidr4 {
    type Err = Error;

    /// Strict `a.b.c.d/prefix` parsing; host bits are kept.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix_len) = s
            .split_once('/')
            .ok_or(Error::InvalidFormat(Field::Shape))?;
        let addr = to_address(addr)?;
        let prefix_len = parse_prefix_len(prefix_len)?;
        Ok(Self::new(Ipv4Addr::from(addr), prefix_len))
    }
}

impl Cidr4 {
    #[must_use]
    pub const fn new(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }

    /// Address as a `u32`
    #[must_use]
    pub fn address(&self) -> u32 {
        u32::from(self.addr)
    }

    /// The same block with its host bits cleared
    #[must_use]
    pub fn normalize(self) -> Self {
        let network = network_boundary(self.address(), self.prefix_len);
        Self::new(Ipv4Addr::from(network), self.prefix_len)
    }

    /// Address range of the normalised block
    #[must_use]
    pub fn range(&self) -> AddressRange {
        let network = network_boundary(self.address(), self.prefix_len);
        // A network address plus its own block size never leaves the address space
        AddressRange {
            start: network,
            end: network | !network_boundary(u32::MAX, self.prefix_len),
            size: prefix_size(self.prefix_len),
        }
    }
}

/// Parse user input as a CIDR block, refusing blocks broader than a /16
pub fn parse_cidr(text: &str) -> Result<Cidr4, Error> {
    let cidr: Cidr4 = text.parse()?;
    if cidr.prefix_len < MIN_BASE_PREFIX {
        return Err(Error::PrefixTooBroad(cidr.prefix_len));
    }
    Ok(cidr)
}

/// The block being partitioned
///
/// Always network-aligned: its start is a multiple of its size.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseBlock {
    cidr: Cidr4,
    range: AddressRange,
}

impl fmt::Display for BaseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cidr)
    }
}

impl FromStr for BaseBlock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(parse_cidr(s)?)
    }
}

impl BaseBlock {
    /// Create a base block from any CIDR, clearing its host bits
    pub fn new(cidr: Cidr4) -> Result<Self, Error> {
        if cidr.prefix_len < MIN_BASE_PREFIX {
            return Err(Error::PrefixTooBroad(cidr.prefix_len));
        }
        if cidr.prefix_len > 32 {
            return Err(Error::InvalidFormat(Field::Prefix));
        }
        let cidr = cidr.normalize();
        Ok(Self {
            cidr,
            range: cidr.range(),
        })
    }

    /// Canonical (normalised) CIDR of the block
    #[must_use]
    pub const fn cidr(&self) -> Cidr4 {
        self.cidr
    }

    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.cidr.prefix_len
    }

    #[must_use]
    pub const fn range(&self) -> AddressRange {
        self.range
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
}
