// SPDX-License-Identifier: MIT OR Apache-2.0
//! oisin - a tiered SIMD-parallel streaming JSON minifier
//!
//! Removes insignificant whitespace from JSON documents while preserving
//! string literals byte for byte. A strategy selector picks between the
//! scalar kernel, width-specialised SIMD kernels, a chunk-parallel
//! orchestrator, a four-stage pipeline, and a fixed-memory streaming
//! processor, based on input size and the probed CPU capabilities.
//!
//! ```
//! let result = oisin::minify(br#"{ "a" : 1 , "b" : [ 2 , 3 ] }"#, &oisin::MinifyConfig::new())
//!     .expect("valid JSON");
//! assert_eq!(result.output, br#"{"a":1,"b":[2,3]}"#);
//! ```
//!
//! Every strategy produces output byte-identical to the scalar reference;
//! the choice only affects speed.

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::cargo)]

/// Strategy selection and throughput estimation
pub mod select;

use std::io::{Read, Write};
use std::time::Instant;

pub use oisin_core::{
    CancelToken, ConfigError, InputErrorKind, Minified, MinifyConfig, MinifyError, MinifyStats,
    Result, ScalarMinifier, Strategy, StreamStats, minify_scalar, validate,
};
pub use oisin_pool::{Executor, SharedPool, SpawnExecutor};
pub use oisin_simd::{CpuCapabilities, SimdMinifier, cached_capabilities, probe};
pub use select::{SCALAR_CUTOFF, estimate, select};

/// The capability record for this host, probed once per process
#[must_use]
pub fn capabilities() -> &'static CpuCapabilities {
    cached_capabilities()
}

/// Minify a JSON document held in memory
///
/// The only mandatory input is the byte slice; [`MinifyConfig::new`] gives
/// the defaults (auto strategy, validation on, all logical cores). The
/// returned buffer is owned by the caller and never longer than the input.
///
/// # Errors
///
/// Configuration errors are rejected before any processing; input errors
/// carry the byte offset of the defect; a parallel call whose workers
/// cannot be spawned is retried once single-threaded before the resource
/// error surfaces.
pub fn minify(input: &[u8], config: &MinifyConfig) -> Result<Minified> {
    minify_with_executor(input, config, &SpawnExecutor::new())
}

/// Minify with a caller-supplied executor (e.g. a [`SharedPool`])
///
/// # Errors
///
/// As [`minify`].
pub fn minify_with_executor(
    input: &[u8],
    config: &MinifyConfig,
    executor: &dyn Executor,
) -> Result<Minified> {
    let caps = cached_capabilities();
    config.validate(caps.logical_cores)?;
    if config.validate_input {
        validate(input)?;
    }

    let strategy = select(input.len(), caps, config);
    let started = Instant::now();
    let (output, strategy_used) = run_strategy(input, strategy, caps, config, executor)?;
    let duration_micros = started.elapsed().as_micros() as u64;

    let stats = MinifyStats::new(
        input.len(),
        output.len(),
        duration_micros,
        peak_memory_model(strategy_used, input.len(), config),
        strategy_used,
        estimate(strategy_used, input.len(), caps),
    );
    Ok(Minified { output, stats })
}

/// Minify a stream with bounded memory
///
/// Wraps [`oisin_stream::minify_stream`] with the process capability
/// record. Reader and writer errors surface unchanged.
///
/// # Errors
///
/// Configuration errors, or [`MinifyError::IoRead`] /
/// [`MinifyError::IoWrite`] from the underlying stream.
pub fn minify_stream<R: Read, W: Write>(
    reader: R,
    writer: W,
    config: &MinifyConfig,
) -> Result<StreamStats> {
    let caps = cached_capabilities();
    config.validate(caps.logical_cores)?;
    oisin_stream::minify_stream(reader, writer, config, caps)
}

/// Dispatch to the chosen kernel; returns the output and the strategy
/// that actually ran (spawn failures downgrade to scalar once)
fn run_strategy(
    input: &[u8],
    strategy: Strategy,
    caps: &CpuCapabilities,
    config: &MinifyConfig,
    executor: &dyn Executor,
) -> Result<(Vec<u8>, Strategy)> {
    match strategy {
        Strategy::Scalar => {
            let mut out = reserve_output(input.len())?;
            minify_scalar(input, &mut out);
            Ok((out, Strategy::Scalar))
        }
        Strategy::Simd128 | Strategy::Simd256 | Strategy::Simd512 => {
            let mut out = reserve_output(input.len())?;
            oisin_simd::minify_simd(input, strategy, caps, &mut out);
            Ok((out, strategy))
        }
        Strategy::Streaming => {
            let mut out = reserve_output(input.len())?;
            oisin_stream::minify_stream(std::io::Cursor::new(input), &mut out, config, caps)?;
            Ok((out, Strategy::Streaming))
        }
        Strategy::ChunkParallel => {
            match oisin_parallel::minify_chunked(input, caps, config, executor) {
                Ok(out) => Ok((out, Strategy::ChunkParallel)),
                Err(MinifyError::WorkerSpawnFailed { .. }) => {
                    // Resource errors fall back once
                    let mut out = reserve_output(input.len())?;
                    minify_scalar(input, &mut out);
                    Ok((out, Strategy::Scalar))
                }
                Err(other) => Err(other),
            }
        }
        Strategy::PipelineParallel => match oisin_parallel::minify_pipelined(input, caps) {
            Ok(out) => Ok((out, Strategy::PipelineParallel)),
            Err(MinifyError::WorkerSpawnFailed { .. }) => {
                let mut out = reserve_output(input.len())?;
                minify_scalar(input, &mut out);
                Ok((out, Strategy::Scalar))
            }
            Err(other) => Err(other),
        },
    }
}

/// Output buffer sized for the worst case (no removable whitespace)
fn reserve_output(input_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.try_reserve_exact(input_len)
        .map_err(|_| MinifyError::AllocationFailed {
            requested: input_len,
        })?;
    Ok(out)
}

/// Peak additional memory of each strategy's allocation model
const fn peak_memory_model(strategy: Strategy, input_len: usize, config: &MinifyConfig) -> usize {
    match strategy {
        // One output buffer bounded by the input
        Strategy::Scalar | Strategy::Simd128 | Strategy::Simd256 | Strategy::Simd512 => input_len,
        // Staged buffer plus its minified image
        Strategy::Streaming => 2 * config.buffer_size,
        // Worker scratch buffers sum to at most the input, plus the final
        // concatenation
        Strategy::ChunkParallel | Strategy::PipelineParallel => 2 * input_len,
    }
}
