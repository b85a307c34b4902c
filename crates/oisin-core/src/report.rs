// SPDX-License-Identifier: MIT OR Apache-2.0
//! Result record and processing statistics
//!
//! Every successful minify call returns the output bytes together with a
//! serialisable statistics record: sizes, compression ratio, wall-clock
//! duration, the peak-memory model of the chosen strategy, and which
//! strategy ran.

use crate::config::Strategy;

/// Output of a successful minify call
#[derive(Debug, Clone)]
pub struct Minified {
    /// The minified document, owned by the caller
    pub output: Vec<u8>,
    /// Processing statistics
    pub stats: MinifyStats,
}

impl Minified {
    /// Compression ratio convenience accessor
    #[must_use]
    pub const fn compression_ratio(&self) -> f64 {
        self.stats.compression_ratio
    }
}

/// Statistics for one minify call
#[derive(Debug, Clone, serde::Serialize)]
pub struct MinifyStats {
    /// Input length in bytes
    pub input_size: usize,
    /// Output length in bytes
    pub output_size: usize,
    /// `1 - output_size / input_size`; 0.0 for empty input
    pub compression_ratio: f64,
    /// Wall-clock duration in microseconds
    pub duration_micros: u64,
    /// Peak additional memory of the chosen strategy's allocation model
    pub peak_memory_bytes: usize,
    /// The strategy that produced the output
    pub strategy_used: Strategy,
    /// The selector's throughput prediction for this input size, in MB/s
    pub estimated_throughput_mb_s: f64,
}

impl MinifyStats {
    /// Build a statistics record, deriving the compression ratio
    #[must_use]
    pub fn new(
        input_size: usize,
        output_size: usize,
        duration_micros: u64,
        peak_memory_bytes: usize,
        strategy_used: Strategy,
        estimated_throughput_mb_s: f64,
    ) -> Self {
        let compression_ratio = if input_size == 0 {
            0.0
        } else {
            1.0 - (output_size as f64 / input_size as f64)
        };
        Self {
            input_size,
            output_size,
            compression_ratio,
            duration_micros,
            peak_memory_bytes,
            strategy_used,
            estimated_throughput_mb_s,
        }
    }

    /// Achieved throughput in MB/s; `None` when the call was too fast to time
    #[must_use]
    pub fn achieved_throughput_mb_s(&self) -> Option<f64> {
        if self.duration_micros == 0 {
            return None;
        }
        Some(self.input_size as f64 / self.duration_micros as f64)
    }
}

/// Totals reported by the streaming kernel
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StreamStats {
    /// Total bytes consumed from the reader
    pub total_in: u64,
    /// Total bytes handed to the writer
    pub total_out: u64,
}
