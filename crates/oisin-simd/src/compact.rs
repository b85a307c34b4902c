// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mask-driven byte compaction
//!
//! Stage two of the two-stage pipeline: given a keep-mask from
//! classification, append the surviving bytes of a block to the output in
//! order. Hosts with a byte-granular compress instruction do this in one
//! instruction per 64-byte block; everywhere else a gather walks the set
//! bits of the mask. A dense-mask fast path bulk-copies blocks with no
//! whitespace at all, which dominates real documents.

/// Append the bytes of `block` selected by `keep` to `out`
///
/// Bit `i` of `keep` selects `block[i]`; output order is input order.
pub fn compact_scalar(block: &[u8], keep: u64, out: &mut Vec<u8>) {
    debug_assert!(block.len() <= 64);
    if keep == crate::classify::lane_mask(block.len()) {
        out.extend_from_slice(block);
        return;
    }
    let mut mask = keep;
    while mask != 0 {
        let i = mask.trailing_zeros() as usize;
        out.push(block[i]);
        mask &= mask - 1;
    }
}

/// Compact one block with the best primitive the host offers
///
/// `use_compress` must only be true when the probe reported a byte-compress
/// instruction.
pub fn compact_block(block: &[u8], keep: u64, use_compress: bool, out: &mut Vec<u8>) {
    #[cfg(target_arch = "x86_64")]
    {
        if use_compress && block.len() == 64 {
            // SAFETY: the caller only sets use_compress when the probe
            // detected avx512vbmi2, and the block length was just checked.
            unsafe { x86::compact64_compress(block, keep, out) };
            return;
        }
    }
    let _ = use_compress;
    compact_scalar(block, keep, out);
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    #[allow(clippy::wildcard_imports)]
    use std::arch::x86_64::*;

    /// Compact 64 bytes with the AVX-512 VBMI2 byte-compress instruction
    ///
    /// # Safety
    ///
    /// Caller must ensure the host supports AVX-512F, AVX-512BW, and
    /// AVX-512VBMI2, and that `block` holds at least 64 bytes.
    #[target_feature(enable = "avx512f", enable = "avx512bw", enable = "avx512vbmi2")]
    pub unsafe fn compact64_compress(block: &[u8], keep: u64, out: &mut Vec<u8>) {
        debug_assert!(block.len() >= 64);
        let survivors = keep.count_ones() as usize;
        // SAFETY: the load covers at least 64 readable bytes, the store
        // writes a full 64-byte scratch array, and only the surviving
        // prefix is appended.
        unsafe {
            let v = _mm512_loadu_si512(block.as_ptr().cast());
            let compressed = _mm512_maskz_compress_epi8(keep, v);
            let mut scratch = [0u8; 64];
            _mm512_storeu_si512(scratch.as_mut_ptr().cast(), compressed);
            out.extend_from_slice(&scratch[..survivors]);
        }
    }
}
