// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strategy selection
//!
//! A decision table maps input size, the capability record, and the
//! configuration to the strategy predicted to be fastest; first matching
//! row wins. The throughput model behind [`estimate`] is deliberately
//! coarse: fixed base rates per strategy bent by a small-input ramp, used
//! for tie-breaks and the telemetry field of the result record, never as
//! a scheduling guarantee.

use oisin_core::{MinifyConfig, Strategy};
use oisin_simd::CpuCapabilities;

/// Inputs below this size always take the scalar kernel (64 KiB)
pub const SCALAR_CUTOFF: usize = 64 * 1024;

/// Pick the strategy for `input_len` bytes on this host
///
/// The decision table, first matching row wins:
///
/// | Condition | Selection |
/// |---|---|
/// | override configured | that strategy |
/// | below 64 KiB | scalar |
/// | 512-bit vectors, below two chunks | simd-512 |
/// | 256-bit vectors, below two chunks | simd-256 |
/// | at least two chunks and four cores | chunk-parallel |
/// | larger than half of available memory | streaming |
/// | otherwise | widest SIMD, else scalar |
#[must_use]
pub fn select(input_len: usize, caps: &CpuCapabilities, config: &MinifyConfig) -> Strategy {
    if let Some(strategy) = config.strategy_override {
        return strategy;
    }
    if input_len < SCALAR_CUTOFF {
        return Strategy::Scalar;
    }
    let parallel_cutoff = 2 * config.chunk_size;
    if caps.has_512 && input_len < parallel_cutoff {
        return Strategy::Simd512;
    }
    if caps.has_256 && input_len < parallel_cutoff {
        return Strategy::Simd256;
    }
    if input_len >= parallel_cutoff && caps.logical_cores >= 4 {
        return Strategy::ChunkParallel;
    }
    if let Some(available) = available_memory()
        && input_len as u64 > available / 2
    {
        return Strategy::Streaming;
    }
    caps.best_simd().unwrap_or(Strategy::Scalar)
}

/// Predicted throughput in MB/s for `strategy` over `input_len` bytes
///
/// Base rates come from the performance envelope each kernel is designed
/// for; the ramp discounts small inputs that cannot amortise setup.
#[must_use]
pub fn estimate(strategy: Strategy, input_len: usize, caps: &CpuCapabilities) -> f64 {
    let base = match strategy {
        Strategy::Scalar => 400.0,
        Strategy::Simd128 => 900.0,
        Strategy::Simd256 => 1_600.0,
        Strategy::Simd512 => 2_800.0,
        Strategy::Streaming => 350.0,
        Strategy::ChunkParallel => {
            let per_core = caps.best_simd().map_or(400.0, |simd| match simd {
                Strategy::Simd512 => 2_800.0,
                Strategy::Simd256 => 1_600.0,
                _ => 900.0,
            });
            // 0.7x linear scaling up to eight cores
            per_core * 0.7 * caps.logical_cores.min(8) as f64
        }
        Strategy::PipelineParallel => 1_200.0,
    };
    base * ramp(input_len)
}

/// Setup amortisation: approaches 1.0 as inputs grow past a few blocks
fn ramp(input_len: usize) -> f64 {
    let len = input_len as f64;
    len / (len + 4096.0)
}

/// Free memory the streaming row compares against; `None` off Linux or
/// when `/proc/meminfo` is unreadable
fn available_memory() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemAvailable:") {
            let kib: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}
