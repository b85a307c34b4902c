// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-block structural classification
//!
//! Stage one of the two-stage pipeline: for a vector-sized block, compute
//! one bit per byte for each of four classes — whitespace, quote,
//! backslash, and the structural set `{}[],:`. Bit `i` corresponds to byte
//! `i` of the block (LSB first). The structural mask is maintained for
//! symmetry with the other classes but nothing acts on it yet.

use crate::cpu::CpuCapabilities;
use crate::swar;

/// Classification bitmasks for one block of up to 64 bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockMasks {
    /// Space, tab, LF, CR
    pub ws: u64,
    /// `"` bytes
    pub quote: u64,
    /// `\` bytes
    pub escape: u64,
    /// `{` `}` `[` `]` `,` `:` bytes
    pub structural: u64,
}

impl BlockMasks {
    /// Whether the block contains any quote or escape byte
    #[must_use]
    pub const fn has_string_events(&self) -> bool {
        (self.quote | self.escape) != 0
    }

    /// Keep-mask over `lanes` bytes: everything that is not whitespace
    #[must_use]
    pub const fn keep_mask(&self, lanes: usize) -> u64 {
        !self.ws & lane_mask(lanes)
    }

    /// Merge `other`, with its masks shifted left by `lanes` bit positions
    ///
    /// Used to widen narrow classifications into a 64-byte lane view.
    #[must_use]
    pub const fn merge_shifted(self, other: Self, lanes: usize) -> Self {
        Self {
            ws: self.ws | (other.ws << lanes),
            quote: self.quote | (other.quote << lanes),
            escape: self.escape | (other.escape << lanes),
            structural: self.structural | (other.structural << lanes),
        }
    }
}

/// All-ones mask over the low `lanes` bits
#[must_use]
pub const fn lane_mask(lanes: usize) -> u64 {
    if lanes >= 64 { !0 } else { (1u64 << lanes) - 1 }
}

/// Scalar reference classifier for a block of up to 64 bytes
///
/// Ground truth for the vectorised classifiers in differential tests, and
/// the fallback wherever no vector unit exists.
#[must_use]
pub fn classify_block(block: &[u8]) -> BlockMasks {
    debug_assert!(block.len() <= 64);
    let mut masks = BlockMasks::default();
    for (i, &byte) in block.iter().enumerate() {
        let bit = 1u64 << i;
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' => masks.ws |= bit,
            b'"' => masks.quote |= bit,
            b'\\' => masks.escape |= bit,
            b'{' | b'}' | b'[' | b']' | b',' | b':' => masks.structural |= bit,
            _ => {}
        }
    }
    masks
}

/// Classify a full 64-byte lane with the widest available unit
///
/// Narrower vector widths classify sub-blocks and merge the masks; hosts
/// with no vector unit use the SWAR path.
#[must_use]
pub fn classify_lane64(block: &[u8; 64], caps: &CpuCapabilities) -> BlockMasks {
    #[cfg(target_arch = "x86_64")]
    {
        if caps.has_512 {
            // SAFETY: avx512f+avx512bw presence was verified by the probe
            // and the slice holds 64 bytes.
            return unsafe { x86::classify64(block.as_slice()) };
        }
        if caps.has_256 {
            // SAFETY: avx2 presence was verified by the probe and each
            // half holds 32 bytes.
            let (lo, hi) = unsafe { (x86::classify32(&block[..32]), x86::classify32(&block[32..])) };
            return lo.merge_shifted(hi, 32);
        }
        if caps.has_128 {
            let mut merged = BlockMasks::default();
            for (i, quarter) in block.chunks_exact(16).enumerate() {
                // SAFETY: sse2 presence was verified by the probe and each
                // quarter holds 16 bytes.
                let masks = unsafe { x86::classify16(quarter) };
                merged = merged.merge_shifted(masks, i * 16);
            }
            return merged;
        }
    }
    let _ = caps;
    swar::classify_lane64_swar(block)
}

/// Classify one block at the kernel's native width
#[must_use]
pub fn classify_native(block: &[u8], caps: &CpuCapabilities) -> BlockMasks {
    #[cfg(target_arch = "x86_64")]
    {
        match block.len() {
            // SAFETY: each arm checks both the block length and the probed
            // feature the classifier needs.
            64 if caps.has_512 => return unsafe { x86::classify64(block) },
            32 if caps.has_256 => return unsafe { x86::classify32(block) },
            16 if caps.has_128 => return unsafe { x86::classify16(block) },
            _ => {}
        }
    }
    let _ = caps;
    if block.len() == 8 {
        let mut lane = [0u8; 8];
        lane.copy_from_slice(block);
        return swar::classify8(&lane);
    }
    classify_block(block)
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::BlockMasks;
    #[allow(clippy::wildcard_imports)]
    use std::arch::x86_64::*;

    /// Equality bitmask over 16 lanes
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports SSE2.
    #[target_feature(enable = "sse2")]
    unsafe fn eq16(v: __m128i, byte: u8) -> u64 {
        // SAFETY: register-only operations, gated on sse2 by the caller.
        unsafe { u64::from(_mm_movemask_epi8(_mm_cmpeq_epi8(v, _mm_set1_epi8(byte as i8))) as u16) }
    }

    /// Classify 16 bytes with SSE2 compare-and-movemask
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports SSE2 and `block` holds at
    /// least 16 bytes.
    #[target_feature(enable = "sse2")]
    pub unsafe fn classify16(block: &[u8]) -> BlockMasks {
        debug_assert!(block.len() >= 16);
        // SAFETY: the pointer covers at least 16 readable bytes; loadu has
        // no alignment requirement.
        unsafe {
            let v = _mm_loadu_si128(block.as_ptr().cast());
            BlockMasks {
                ws: eq16(v, b' ') | eq16(v, b'\t') | eq16(v, b'\n') | eq16(v, b'\r'),
                quote: eq16(v, b'"'),
                escape: eq16(v, b'\\'),
                structural: eq16(v, b'{')
                    | eq16(v, b'}')
                    | eq16(v, b'[')
                    | eq16(v, b']')
                    | eq16(v, b',')
                    | eq16(v, b':'),
            }
        }
    }

    /// Equality bitmask over 32 lanes
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports AVX2.
    #[target_feature(enable = "avx2")]
    unsafe fn eq32(v: __m256i, byte: u8) -> u64 {
        // SAFETY: register-only operations, gated on avx2 by the caller.
        unsafe {
            u64::from(_mm256_movemask_epi8(_mm256_cmpeq_epi8(v, _mm256_set1_epi8(byte as i8))) as u32)
        }
    }

    /// Classify 32 bytes with AVX2 compare-and-movemask
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports AVX2 and `block` holds at
    /// least 32 bytes.
    #[target_feature(enable = "avx2")]
    pub unsafe fn classify32(block: &[u8]) -> BlockMasks {
        debug_assert!(block.len() >= 32);
        // SAFETY: the pointer covers at least 32 readable bytes; loadu has
        // no alignment requirement.
        unsafe {
            let v = _mm256_loadu_si256(block.as_ptr().cast());
            BlockMasks {
                ws: eq32(v, b' ') | eq32(v, b'\t') | eq32(v, b'\n') | eq32(v, b'\r'),
                quote: eq32(v, b'"'),
                escape: eq32(v, b'\\'),
                structural: eq32(v, b'{')
                    | eq32(v, b'}')
                    | eq32(v, b'[')
                    | eq32(v, b']')
                    | eq32(v, b',')
                    | eq32(v, b':'),
            }
        }
    }

    /// Equality bitmask over 64 lanes
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports AVX-512F and AVX-512BW.
    #[target_feature(enable = "avx512f", enable = "avx512bw")]
    unsafe fn eq64(v: __m512i, byte: u8) -> u64 {
        // SAFETY: register-only operations, gated on avx512f+avx512bw by
        // the caller.
        unsafe { _mm512_cmpeq_epi8_mask(v, _mm512_set1_epi8(byte as i8)) }
    }

    /// Classify 64 bytes with AVX-512BW mask compares
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports AVX-512F and AVX-512BW and
    /// `block` holds at least 64 bytes.
    #[target_feature(enable = "avx512f", enable = "avx512bw")]
    pub unsafe fn classify64(block: &[u8]) -> BlockMasks {
        debug_assert!(block.len() >= 64);
        // SAFETY: the pointer covers at least 64 readable bytes; loadu has
        // no alignment requirement.
        unsafe {
            let v = _mm512_loadu_si512(block.as_ptr().cast());
            BlockMasks {
                ws: eq64(v, b' ') | eq64(v, b'\t') | eq64(v, b'\n') | eq64(v, b'\r'),
                quote: eq64(v, b'"'),
                escape: eq64(v, b'\\'),
                structural: eq64(v, b'{')
                    | eq64(v, b'}')
                    | eq64(v, b'[')
                    | eq64(v, b']')
                    | eq64(v, b',')
                    | eq64(v, b':'),
            }
        }
    }
}
