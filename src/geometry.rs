//! Mapping between addresses and a proportional bar of a given pixel width

// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::cidr::AddressRange;

/// Horizontal extent of a range drawn on the bar
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "impl-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarSpan {
    pub left: f64,
    pub width: f64,
}

impl BarSpan {
    /// Where `range` lands on a bar of `bar_width` showing `base`
    #[must_use]
    pub fn of(range: &AddressRange, base: &AddressRange, bar_width: f64) -> Self {
        let relative = u64::from(range.start.saturating_sub(base.start));
        Self {
            left: bar_offset(relative, base.size, bar_width),
            width: bar_span(range.size, base.size, bar_width),
        }
    }
}

/// Pixel offset of an address `relative` to the bar start
#[must_use]
pub fn bar_offset(relative: u64, total: u64, bar_width: f64) -> f64 {
    relative as f64 / total as f64 * bar_width
}

/// Pixel width of `size` addresses
#[must_use]
pub fn bar_span(size: u64, total: u64, bar_width: f64) -> f64 {
    size as f64 / total as f64 * bar_width
}

/// Address under a pointer `offset` pixels from the left of the bar
///
/// Offsets outside the bar are clamped to its ends.
#[must_use]
pub fn pointer_to_address(base: &AddressRange, offset: f64, bar_width: f64) -> u32 {
    if bar_width.is_nan() || bar_width <= 0.0 || !offset.is_finite() {
        return base.start;
    }
    let fraction = (offset / bar_width).clamp(0.0, 1.0);
    let position = (fraction * base.size as f64).floor() as u64;
    let address = (u64::from(base.start) + position).min(u64::from(base.end));
    u32::try_from(address).unwrap_or(base.end)
}
