// SPDX-License-Identifier: MIT OR Apache-2.0
//! Safe split-point discovery
//!
//! A byte offset is a safe split point when the minifier state there is
//! outside any string literal: chunks cut at such offsets can be minified
//! independently from the initial state and concatenated without changing
//! the output.
//!
//! Discovery walks only the quote and backslash bytes of the document
//! (via `memchr`), carrying the string automaton between them, so cost
//! scales with string density rather than input length. Offsets that land
//! inside a string literal are pushed forward to just past its closing
//! quote. Nothing here assumes quotes come in matched pairs; an
//! unterminated string simply ends split emission and leaves the tail as
//! one chunk.

use smallvec::SmallVec;
use std::ops::Range;

/// Split offsets for chunking `input` at roughly `chunk_size` boundaries
///
/// Returned offsets are strictly increasing, each one a safe split point
/// in `1..input.len()`. Consecutive offsets bound one chunk; the implied
/// first chunk starts at 0 and the last ends at `input.len()`.
#[must_use]
pub fn find_split_points(input: &[u8], chunk_size: usize) -> SmallVec<[usize; 16]> {
    let len = input.len();
    let mut splits = SmallVec::new();
    if chunk_size == 0 || len <= chunk_size {
        return splits;
    }

    let mut boundary = chunk_size;
    let mut in_string = false;
    let mut escape_armed_at = None::<usize>;

    for pos in memchr::memchr2_iter(b'"', b'\\', input) {
        // An armed escape consumes exactly the next byte as a literal
        if let Some(armed) = escape_armed_at.take() {
            if pos == armed + 1 {
                continue;
            }
        }
        if in_string {
            if input[pos] == b'"' {
                in_string = false;
                // Offsets inside the string were unsafe; the first pending
                // boundary resumes just past the closing quote
                if boundary <= pos {
                    let resume = pos + 1;
                    if resume < len {
                        splits.push(resume);
                    }
                    boundary = next_boundary_after(pos, chunk_size);
                }
            } else {
                escape_armed_at = Some(pos);
            }
        } else {
            // Everything from the last split candidate up to here is
            // outside strings; emit pending boundaries at face value
            while boundary <= pos {
                splits.push(boundary);
                boundary += chunk_size;
            }
            if input[pos] == b'"' {
                in_string = true;
            }
        }
    }

    // Tail after the last event: safe only when no string is left open
    if !in_string && escape_armed_at.is_none() {
        while boundary < len {
            splits.push(boundary);
            boundary += chunk_size;
        }
    }

    splits
}

/// Smallest multiple of `chunk_size` strictly greater than `pos`
const fn next_boundary_after(pos: usize, chunk_size: usize) -> usize {
    (pos / chunk_size + 1) * chunk_size
}

/// Chunk ranges implied by split offsets over `len` bytes
#[must_use]
pub fn chunk_ranges(splits: &[usize], len: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(splits.len() + 1);
    let mut start = 0;
    for &split in splits {
        ranges.push(start..split);
        start = split;
    }
    ranges.push(start..len);
    ranges
}
