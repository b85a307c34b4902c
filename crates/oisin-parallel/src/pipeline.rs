// SPDX-License-Identifier: MIT OR Apache-2.0
//! Four-stage pipeline orchestration
//!
//! The document flows through four stage workers connected by bounded
//! SPSC rings, each sub-chunk travelling the whole way in order:
//!
//! 1. **Classify** computes the per-byte bitmasks for each 64-byte lane
//!    of an 8 KiB sub-chunk.
//! 2. **Mark** turns quote and escape masks into a per-byte in-string
//!    bitmap, carrying the automaton state across lane and sub-chunk
//!    seams (it is the only stage that touches that state, and SPSC
//!    ordering feeds it sub-chunks in document order).
//! 3. **Compact** kills whitespace outside strings with the combined
//!    keep-mask and emits surviving bytes per sub-chunk.
//! 4. **Emit** appends sub-chunk outputs to the final buffer in index
//!    order.
//!
//! Best suited to hosts with at least four cores; smaller inputs short-
//! circuit to the single-threaded kernel.

use crate::spsc::{Consumer, Producer, ring};
use oisin_core::{MinifyError, Result, State};
use oisin_simd::classify::{BlockMasks, lane_mask};
use oisin_simd::compact::compact_block;
use oisin_simd::{CpuCapabilities, SimdMinifier, classify_block, classify_lane64};

/// Bytes per pipeline sub-chunk
pub const SUB_CHUNK: usize = 8 * 1024;

/// In-flight sub-chunks per ring
const RING_DEPTH: usize = 16;

/// Lane masks for one classified sub-chunk
struct Classified {
    index: usize,
    start: usize,
    len: usize,
    lanes: Vec<BlockMasks>,
}

/// Keep-masks for one marked sub-chunk
struct Marked {
    index: usize,
    start: usize,
    len: usize,
    keep: Vec<u64>,
}

/// Minified bytes of one sub-chunk
struct Compacted {
    index: usize,
    bytes: Vec<u8>,
}

/// Minify `input` through the four-stage pipeline
///
/// # Errors
///
/// [`MinifyError::WorkerSpawnFailed`] when the stage threads cannot be
/// created, or [`MinifyError::WorkerFault`] when a stage panics.
pub fn minify_pipelined(input: &[u8], caps: &CpuCapabilities) -> Result<Vec<u8>> {
    if input.len() < 2 * SUB_CHUNK {
        let mut out = Vec::new();
        SimdMinifier::widest(caps).push(input, &mut out);
        return Ok(out);
    }

    let (classified_tx, classified_rx) = ring::<Classified>(RING_DEPTH);
    let (marked_tx, marked_rx) = ring::<Marked>(RING_DEPTH);
    let (compacted_tx, compacted_rx) = ring::<Compacted>(RING_DEPTH);

    let spawn_error = || MinifyError::WorkerSpawnFailed { requested: 4 };

    std::thread::scope(|scope| {
        let classify_handle = std::thread::Builder::new()
            .name("oisin-classify".to_owned())
            .spawn_scoped(scope, move || stage_classify(input, caps, &classified_tx))
            .map_err(|_| spawn_error())?;
        let mark_handle = std::thread::Builder::new()
            .name("oisin-mark".to_owned())
            .spawn_scoped(scope, move || stage_mark(&classified_rx, &marked_tx))
            .map_err(|_| spawn_error())?;
        let compact_handle = std::thread::Builder::new()
            .name("oisin-compact".to_owned())
            .spawn_scoped(scope, move || {
                stage_compact(input, caps, &marked_rx, &compacted_tx);
            })
            .map_err(|_| spawn_error())?;
        let emit_handle = std::thread::Builder::new()
            .name("oisin-emit".to_owned())
            .spawn_scoped(scope, move || stage_emit(input.len(), &compacted_rx))
            .map_err(|_| spawn_error())?;

        for (stage, handle) in [
            ("classify", classify_handle),
            ("mark", mark_handle),
            ("compact", compact_handle),
        ]
        .into_iter()
        .map(|(name, h)| (name, h.join()))
        {
            if let Err(payload) = handle {
                return Err(stage_fault(stage, payload.as_ref()));
            }
        }
        emit_handle
            .join()
            .map_err(|payload| stage_fault("emit", payload.as_ref()))
    })
}

fn stage_fault(stage: &str, payload: &(dyn std::any::Any + Send)) -> MinifyError {
    let message = payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "opaque panic payload".to_owned())
        },
        |s| (*s).to_owned(),
    );
    MinifyError::WorkerFault {
        chunk_index: 0,
        message: format!("{stage} stage panicked: {message}"),
    }
}

/// Stage 1: per-lane classification masks for every sub-chunk
fn stage_classify(input: &[u8], caps: &CpuCapabilities, tx: &Producer<Classified>) {
    for (index, sub) in input.chunks(SUB_CHUNK).enumerate() {
        let start = index * SUB_CHUNK;
        let mut lanes = Vec::with_capacity(sub.len().div_ceil(64));
        let mut offset = 0;
        while offset + 64 <= sub.len() {
            let lane: &[u8; 64] = sub[offset..offset + 64].try_into().expect("lane is exact");
            lanes.push(classify_lane64(lane, caps));
            offset += 64;
        }
        if offset < sub.len() {
            lanes.push(classify_block(&sub[offset..]));
        }
        if tx
            .send(Classified {
                index,
                start,
                len: sub.len(),
                lanes,
            })
            .is_err()
        {
            // Downstream died; its panic is reported at join
            return;
        }
    }
}

/// Stage 2: in-string bitmap and keep-mask, state carried across seams
fn stage_mark(rx: &Consumer<Classified>, tx: &Producer<Marked>) {
    let mut state = State::OutsideString;
    let mut expected = 0usize;
    while let Some(chunk) = rx.recv() {
        debug_assert_eq!(chunk.index, expected, "sub-chunks must arrive in order");
        expected += 1;
        let mut keep = Vec::with_capacity(chunk.lanes.len());
        let mut remaining = chunk.len;
        for masks in &chunk.lanes {
            let lanes = remaining.min(64);
            let in_string = mark_lane(masks, lanes, &mut state);
            keep.push((!masks.ws | in_string) & lane_mask(lanes));
            remaining -= lanes;
        }
        if tx
            .send(Marked {
                index: chunk.index,
                start: chunk.start,
                len: chunk.len,
                keep,
            })
            .is_err()
        {
            return;
        }
    }
}

/// Stage 3: mask-driven compaction of every lane
fn stage_compact(
    input: &[u8],
    caps: &CpuCapabilities,
    rx: &Consumer<Marked>,
    tx: &Producer<Compacted>,
) {
    while let Some(chunk) = rx.recv() {
        let mut bytes = Vec::with_capacity(chunk.len);
        let mut offset = chunk.start;
        let end = chunk.start + chunk.len;
        for &keep in &chunk.keep {
            let lane_end = (offset + 64).min(end);
            let lane = &input[offset..lane_end];
            compact_block(
                lane,
                keep,
                caps.has_byte_compress && lane.len() == 64,
                &mut bytes,
            );
            offset = lane_end;
        }
        if tx
            .send(Compacted {
                index: chunk.index,
                bytes,
            })
            .is_err()
        {
            return;
        }
    }
}

/// Stage 4: ordered concatenation into the final buffer
fn stage_emit(input_len: usize, rx: &Consumer<Compacted>) -> Vec<u8> {
    let mut out = Vec::with_capacity(input_len);
    let mut expected = 0usize;
    while let Some(chunk) = rx.recv() {
        debug_assert_eq!(chunk.index, expected, "sub-chunks must arrive in order");
        expected += 1;
        out.extend_from_slice(&chunk.bytes);
    }
    out
}

/// Per-byte in-string bitmap for one lane, advancing the automaton
///
/// A bit is set when the byte at that position sits inside a string
/// literal (its pre-state is in-string). Only quote and escape positions
/// can change state, so the walk visits event bits and fills the gaps
/// between them wholesale.
fn mark_lane(masks: &BlockMasks, lanes: usize, state: &mut State) -> u64 {
    let mut in_string = 0u64;
    let mut events = (masks.quote | masks.escape) & lane_mask(lanes);
    let mut pos = 0usize;

    while events != 0 {
        let p = events.trailing_zeros() as usize;
        events &= events - 1;
        if p > pos {
            // Non-event gap: state can only decay out of the escape
            if state.in_string() {
                in_string |= bit_range(pos, p);
            }
            if *state == State::AfterBackslash {
                *state = State::InsideString;
            }
        }
        let is_quote = masks.quote & (1 << p) != 0;
        match *state {
            State::OutsideString => {
                if is_quote {
                    *state = State::InsideString;
                }
            }
            State::InsideString => {
                in_string |= 1 << p;
                *state = if is_quote {
                    State::OutsideString
                } else {
                    State::AfterBackslash
                };
            }
            State::AfterBackslash => {
                // The event byte itself is the escaped literal
                in_string |= 1 << p;
                *state = State::InsideString;
            }
        }
        pos = p + 1;
    }

    if pos < lanes {
        if state.in_string() {
            in_string |= bit_range(pos, lanes);
        }
        if *state == State::AfterBackslash {
            *state = State::InsideString;
        }
    }

    in_string
}

/// Bits `a..b` set
const fn bit_range(a: usize, b: usize) -> u64 {
    lane_mask(b) & !lane_mask(a)
}
