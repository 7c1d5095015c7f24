//! Position mapping: inverts the shell's bucket encoding of grid lines.
//!
//! The desktop stores each icon's row and column as a 16-bit bucket value
//! rather than a line number. Buckets are spaced like the upper half of an
//! IEEE float (16256, 16384, 16448, 16512, ...): the spacing halves every
//! time the line count doubles. This module rebuilds that sequence with
//! integer shifts and maps each bucket back to its 1-based line.

use std::collections::BTreeMap;

/// Bucket value of the first grid line.
pub const FIRST_BUCKET: u32 = 0;

/// Bucket value of the second grid line.
pub const SECOND_BUCKET: u32 = 16256;

/// Grid index reported for a bucket outside the generated domain.
pub const UNMAPPED: u32 = 0;

/// Strictly increasing map from encoded bucket to 1-based grid index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMapping {
    buckets: BTreeMap<u32, u32>,
}

impl PositionMapping {
    /// Grid index for an encoded bucket, or [`UNMAPPED`] if unknown.
    pub fn grid_index(&self, encoded: u32) -> u32 {
        self.buckets.get(&encoded).copied().unwrap_or(UNMAPPED)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `(bucket, index)` pairs in ascending bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.buckets.iter().map(|(k, v)| (*k, *v))
    }
}

/// Number of significant bits in `value` (0 for 0).
fn bit_length(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

/// Distance from the bucket of line `i - 1` to the bucket of line `i`, `i >= 3`.
///
/// Saturates at 1 once the exponent runs out so the sequence keeps increasing.
fn bucket_step(i: u32) -> u32 {
    1 << 8u32.saturating_sub(bit_length(i - 2))
}

/// Build the bucket → grid index mapping for a layout of `n` items.
pub fn build_mapping(n: u32) -> PositionMapping {
    let mut buckets = BTreeMap::new();
    buckets.insert(FIRST_BUCKET, 1);

    if n >= 2 {
        let mut acc = SECOND_BUCKET;
        buckets.insert(acc, 2);
        for i in 3..=n {
            acc += bucket_step(i);
            buckets.insert(acc, i);
        }
    }

    PositionMapping { buckets }
}
