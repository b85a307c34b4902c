// SPDX-License-Identifier: MIT OR Apache-2.0
//! SIMD-within-a-register fallbacks
//!
//! Byte-parallel classification over eight bytes packed in a `u64`, for
//! hosts with no vector unit. The zero-byte trick underlies everything:
//! after XOR-ing with a splatted pattern, `(w - 0x01…) & !w & 0x80…`
//! raises the high bit of exactly the bytes that matched.

use crate::classify::BlockMasks;

/// Broadcast one byte into all eight lanes
#[must_use]
pub const fn splat(byte: u8) -> u64 {
    u64::from_le_bytes([byte; 8])
}

const LOW_BITS: u64 = 0x0101_0101_0101_0101;
const HIGH_BITS: u64 = 0x8080_8080_8080_8080;

/// High bit set in every lane equal to `byte`
#[must_use]
pub const fn eq_lanes(word: u64, byte: u8) -> u64 {
    let x = word ^ splat(byte);
    x.wrapping_sub(LOW_BITS) & !x & HIGH_BITS
}

/// Collapse per-lane high bits into one bit per byte (LSB = first byte)
#[must_use]
pub const fn lanes_to_bitmask(lanes: u64) -> u64 {
    // Each matching lane contributes 0x01 after the shift; the multiply
    // accumulates them into the top byte in lane order.
    ((lanes >> 7).wrapping_mul(0x0102_0408_1020_4080) >> 56) & 0xFF
}

/// Bitmask of `"` positions in eight bytes
///
/// The quote-scan primitive: one XOR against the splatted quote pattern
/// and the zero-byte trick, no per-byte branches.
#[must_use]
pub const fn quote_scan(word: u64) -> u64 {
    lanes_to_bitmask(eq_lanes(word, b'"'))
}

/// Classify eight bytes into block masks
#[must_use]
pub const fn classify8(block: &[u8; 8]) -> BlockMasks {
    let word = u64::from_le_bytes(*block);
    let ws = eq_lanes(word, b' ')
        | eq_lanes(word, b'\t')
        | eq_lanes(word, b'\n')
        | eq_lanes(word, b'\r');
    let structural = eq_lanes(word, b'{')
        | eq_lanes(word, b'}')
        | eq_lanes(word, b'[')
        | eq_lanes(word, b']')
        | eq_lanes(word, b',')
        | eq_lanes(word, b':');
    BlockMasks {
        ws: lanes_to_bitmask(ws),
        quote: lanes_to_bitmask(eq_lanes(word, b'"')),
        escape: lanes_to_bitmask(eq_lanes(word, b'\\')),
        structural: lanes_to_bitmask(structural),
    }
}

/// Classify a 64-byte lane as eight SWAR words
#[must_use]
pub fn classify_lane64_swar(block: &[u8; 64]) -> BlockMasks {
    let mut merged = BlockMasks::default();
    for (i, word) in block.chunks_exact(8).enumerate() {
        let mut lane = [0u8; 8];
        lane.copy_from_slice(word);
        merged = merged.merge_shifted(classify8(&lane), i * 8);
    }
    merged
}
