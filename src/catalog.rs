//! Subnet sizes that can be placed into a base block

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::cidr::prefix_size;
use crate::FINEST_PREFIX;

/// A subnet size offered for placement
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateSize {
    pub prefix_len: u8,
    /// Number of addresses
    pub size: u64,
    /// Usable hosts, excluding the network and broadcast addresses
    pub host_count: u64,
}

impl CandidateSize {
    #[must_use]
    pub const fn new(prefix_len: u8) -> Self {
        let size = prefix_size(prefix_len);
        Self {
            prefix_len,
            size,
            host_count: size.saturating_sub(2),
        }
    }
}

/// Every prefix strictly finer than `base_prefix` down to [`FINEST_PREFIX`],
/// largest subnets first
///
/// A base already at or below the finest granularity yields an empty list.
#[must_use]
pub fn generate_catalog(base_prefix: u8) -> Vec<CandidateSize> {
    (base_prefix.saturating_add(1)..=FINEST_PREFIX)
        .map(CandidateSize::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_slash16() {
        let catalog = generate_catalog(16);
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog[0].prefix_len, 17);
        assert_eq!(catalog[11].prefix_len, 28);
        for (candidate, prefix_len) in catalog.iter().zip(17u8..) {
            assert_eq!(candidate.prefix_len, prefix_len);
            assert_eq!(candidate.size, 1 << (32 - prefix_len));
            assert_eq!(candidate.host_count, (1 << (32 - prefix_len)) - 2);
        }
    }

    #[test]
    fn test_catalog_descending_size() {
        let catalog = generate_catalog(20);
        assert!(catalog.windows(2).all(|w| w[0].size > w[1].size));
    }

    #[test]
    fn test_catalog_empty() {
        assert!(generate_catalog(28).is_empty());
        assert!(generate_catalog(32).is_empty());
        assert!(generate_catalog(u8::MAX).is_empty());
        assert_eq!(generate_catalog(27).len(), 1);
    }

    #[test]
    fn test_candidate_slash28() {
        let candidate = CandidateSize::new(28);
        assert_eq!(candidate.size, 16);
        assert_eq!(candidate.host_count, 14);
    }
}
