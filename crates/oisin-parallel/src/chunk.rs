// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chunk-parallel orchestration
//!
//! The input is cut at safe split points into chunks of roughly the
//! configured size. Workers claim chunks through one atomic counter
//! (fetch-and-add, no locks on the fast path), minify each claimed chunk
//! into a scratch buffer of their own with the widest kernel the host
//! offers, and the orchestrator concatenates the buffers in chunk index
//! order. Late workers can never reorder output.

use crate::split::{chunk_ranges, find_split_points};
use oisin_core::{MinifyConfig, MinifyError, Result};
use oisin_pool::{Executor, PoolError};
use oisin_simd::{CpuCapabilities, SimdMinifier};
use std::ops::Range;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Minify `input` across a worker pool, concatenating in chunk order
///
/// Falls back to the single-threaded kernel when the input yields fewer
/// than two chunks or only one worker is available.
///
/// # Errors
///
/// - [`MinifyError::WorkerSpawnFailed`] when the executor cannot create
///   workers (the caller may retry single-threaded),
/// - [`MinifyError::WorkerFault`] wrapping the first worker panic with
///   its chunk index,
/// - [`MinifyError::Cancelled`] when the configured token fired between
///   chunks.
pub fn minify_chunked(
    input: &[u8],
    caps: &CpuCapabilities,
    config: &MinifyConfig,
    executor: &dyn Executor,
) -> Result<Vec<u8>> {
    let splits = find_split_points(input, config.chunk_size);
    let chunks = chunk_ranges(&splits, input.len());
    let workers = config
        .effective_threads(caps.logical_cores)
        .min(chunks.len());

    if chunks.len() < 2 || workers < 2 {
        let mut out = Vec::new();
        SimdMinifier::widest(caps).push(input, &mut out);
        return Ok(out);
    }

    let slots: Vec<OnceLock<Vec<u8>>> = chunks.iter().map(|_| OnceLock::new()).collect();
    let next_chunk = AtomicUsize::new(0);
    // Which chunk each worker currently holds, for fault attribution
    let active: Vec<AtomicUsize> = (0..workers).map(|_| AtomicUsize::new(usize::MAX)).collect();

    let worker_body = |worker: usize| {
        loop {
            let index = next_chunk.fetch_add(1, Ordering::Relaxed);
            if index >= chunks.len() {
                break;
            }
            if config
                .cancel
                .as_ref()
                .is_some_and(oisin_core::CancelToken::is_cancelled)
            {
                break;
            }
            active[worker].store(index, Ordering::Relaxed);
            let chunk = &input[chunks[index].clone()];
            // Worst case output equals the chunk itself
            let mut scratch = Vec::with_capacity(chunk.len());
            SimdMinifier::widest(caps).push(chunk, &mut scratch);
            let _ = slots[index].set(scratch);
        }
    };

    match executor.run(workers, &worker_body) {
        Ok(()) => {}
        Err(PoolError::SpawnFailed { requested }) => {
            return Err(MinifyError::WorkerSpawnFailed { requested });
        }
        Err(PoolError::WorkerPanic { worker, message }) => {
            let chunk_index = active
                .get(worker)
                .map_or(0, |slot| slot.load(Ordering::Relaxed));
            return Err(MinifyError::WorkerFault {
                chunk_index: if chunk_index == usize::MAX { 0 } else { chunk_index },
                message,
            });
        }
    }

    reassemble(&chunks, slots, config)
}

/// Concatenate per-chunk outputs in index order
fn reassemble(
    chunks: &[Range<usize>],
    slots: Vec<OnceLock<Vec<u8>>>,
    config: &MinifyConfig,
) -> Result<Vec<u8>> {
    let mut outputs = Vec::with_capacity(slots.len());
    let mut completed_bytes = 0usize;
    for (index, slot) in slots.into_iter().enumerate() {
        match slot.into_inner() {
            Some(bytes) => {
                completed_bytes += chunks[index].len();
                outputs.push(bytes);
            }
            None => {
                // Only cancellation leaves a hole; the executor surfaced
                // every other failure before we got here
                debug_assert!(
                    config
                        .cancel
                        .as_ref()
                        .is_some_and(oisin_core::CancelToken::is_cancelled)
                );
                return Err(MinifyError::Cancelled {
                    bytes_processed: completed_bytes,
                });
            }
        }
    }

    let total: usize = outputs.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for piece in outputs {
        out.extend_from_slice(&piece);
    }
    Ok(out)
}
