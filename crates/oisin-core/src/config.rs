// SPDX-License-Identifier: MIT OR Apache-2.0
//! Minification configuration and strategy descriptors
//!
//! All fields are optional with documented defaults. A configuration is
//! validated once at the API boundary; kernels assume a valid one.

use crate::error::ConfigError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default chunk size for the chunk-parallel orchestrator (256 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default staged buffer size for the streaming kernel (1 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Smallest accepted chunk or buffer size (4 KiB)
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;

/// Identifies one minification strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Byte-at-a-time reference kernel with lookup-table fast paths
    Scalar,
    /// 128-bit vectorised kernel (16-byte blocks)
    #[serde(rename = "simd-128")]
    Simd128,
    /// 256-bit vectorised kernel (32-byte blocks)
    #[serde(rename = "simd-256")]
    Simd256,
    /// 512-bit vectorised kernel (64-byte blocks)
    #[serde(rename = "simd-512")]
    Simd512,
    /// Fixed-memory staged processing for inputs larger than RAM
    Streaming,
    /// Safe-split chunk fan-out across a worker pool
    ChunkParallel,
    /// Four-stage classify/mark/compact/emit pipeline
    PipelineParallel,
}

impl Strategy {
    /// True for strategies that never spawn worker threads
    #[must_use]
    pub const fn is_single_threaded(self) -> bool {
        matches!(
            self,
            Self::Scalar | Self::Simd128 | Self::Simd256 | Self::Simd512 | Self::Streaming
        )
    }

    /// Block size in bytes for the vectorised strategies, 1 otherwise
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Simd128 => 16,
            Self::Simd256 => 32,
            Self::Simd512 => 64,
            _ => 1,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Simd128 => "simd-128",
            Self::Simd256 => "simd-256",
            Self::Simd512 => "simd-512",
            Self::Streaming => "streaming",
            Self::ChunkParallel => "chunk-parallel",
            Self::PipelineParallel => "pipeline-parallel",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation token checked by workers between chunks
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; workers observe it at their next chunk boundary
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Minification configuration
///
/// Built with chained setters; every field has a default:
///
/// ```
/// use oisin_core::{MinifyConfig, Strategy};
///
/// let config = MinifyConfig::new()
///     .with_threads(4)
///     .with_strategy(Strategy::ChunkParallel);
/// assert_eq!(config.thread_count, Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct MinifyConfig {
    /// Worker count override; `None` uses all logical cores
    pub thread_count: Option<usize>,
    /// Bytes per chunk for the chunk-parallel orchestrator
    pub chunk_size: usize,
    /// Pin strategy selection; `None` selects automatically
    pub strategy_override: Option<Strategy>,
    /// Run the lightweight validator before processing
    pub validate_input: bool,
    /// Staged buffer size for the streaming kernel
    pub buffer_size: usize,
    /// Cooperative cancellation token, checked between chunks
    pub cancel: Option<CancelToken>,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MinifyConfig {
    /// Configuration with all defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            strategy_override: None,
            validate_input: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
            cancel: None,
        }
    }

    /// Override the worker count
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.thread_count = Some(threads);
        self
    }

    /// Override the chunk size
    #[must_use]
    pub const fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Pin the strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy_override = Some(strategy);
        self
    }

    /// Skip the pre-processing validation pass
    #[must_use]
    pub const fn without_validation(mut self) -> Self {
        self.validate_input = false;
        self
    }

    /// Override the streaming buffer size
    #[must_use]
    pub const fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Attach a cancellation token
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Effective worker count given the hardware limit
    #[must_use]
    pub fn effective_threads(&self, logical_cores: usize) -> usize {
        self.thread_count.unwrap_or(logical_cores).max(1)
    }

    /// Reject defective configurations before any processing
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: a chunk or buffer size below
    /// the 4 KiB minimum, a thread count of zero or beyond `max_threads`, or
    /// a single-threaded strategy override combined with an explicit thread
    /// count other than 1.
    pub fn validate(&self, max_threads: usize) -> Result<(), ConfigError> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                got: self.chunk_size,
                min: MIN_CHUNK_SIZE,
            });
        }
        if self.buffer_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::InvalidBufferSize {
                got: self.buffer_size,
                min: MIN_CHUNK_SIZE,
            });
        }
        if let Some(threads) = self.thread_count {
            if threads == 0 || threads > max_threads {
                return Err(ConfigError::InvalidThreadCount {
                    got: threads,
                    max: max_threads,
                });
            }
            if let Some(strategy) = self.strategy_override
                && strategy.is_single_threaded()
                && threads != 1
            {
                return Err(ConfigError::ConflictingOverrides { strategy, threads });
            }
        }
        Ok(())
    }
}
