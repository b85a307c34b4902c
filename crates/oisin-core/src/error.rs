// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy for minification operations
//!
//! Errors fall into five categories: input errors (carrying the byte offset
//! where the problem was detected), resource errors, I/O errors from the
//! streaming kernel, configuration errors rejected before any processing,
//! and internal worker faults wrapping the first failure by chunk index.

use crate::config::Strategy;
use std::fmt;
use thiserror::Error;

/// Result type alias for minification operations
pub type Result<T> = std::result::Result<T, MinifyError>;

/// Structural defect classes reported by the lightweight validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputErrorKind {
    /// A string literal was opened but never closed
    UnterminatedString,
    /// A closing bracket with no matching opener, or depth over the limit
    UnbalancedBracket,
    /// A backslash followed by a byte that is not a legal JSON escape
    InvalidEscape,
    /// Input ended mid-escape or mid-structure
    TruncatedInput,
}

impl fmt::Display for InputErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnterminatedString => "unterminated string",
            Self::UnbalancedBracket => "unbalanced bracket",
            Self::InvalidEscape => "invalid escape",
            Self::TruncatedInput => "truncated input",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by minification calls
#[derive(Debug, Error)]
pub enum MinifyError {
    /// The input is not structurally valid JSON
    #[error("invalid input: {kind} at byte {offset}")]
    InvalidInput {
        /// Defect class
        kind: InputErrorKind,
        /// Byte offset where the defect was detected
        offset: usize,
    },
    /// An output or scratch buffer could not be allocated
    #[error("allocation of {requested} bytes failed")]
    AllocationFailed {
        /// Requested allocation size in bytes
        requested: usize,
    },
    /// Worker threads could not be spawned
    #[error("failed to spawn {requested} worker threads")]
    WorkerSpawnFailed {
        /// Number of workers requested
        requested: usize,
    },
    /// The streaming reader failed
    #[error("read failed: {0}")]
    IoRead(#[source] std::io::Error),
    /// The streaming writer failed
    #[error("write failed: {0}")]
    IoWrite(#[source] std::io::Error),
    /// The configuration was rejected before processing
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// A worker failed; wraps the first failure in chunk index order
    #[error("worker fault in chunk {chunk_index}: {message}")]
    WorkerFault {
        /// Index of the chunk whose worker failed
        chunk_index: usize,
        /// Description of the captured failure
        message: String,
    },
    /// A cooperative cancellation token was triggered mid-call
    #[error("cancelled after {bytes_processed} bytes")]
    Cancelled {
        /// Bytes fully processed before the cancellation was observed
        bytes_processed: usize,
    },
}

impl MinifyError {
    /// Byte offset associated with the error, when one exists
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::InvalidInput { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// True for input errors, which are fatal with no fallback
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

/// Configuration defects rejected before any processing starts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Chunk size below the minimum
    #[error("chunk size {got} is below the {min} byte minimum")]
    InvalidChunkSize {
        /// Configured chunk size
        got: usize,
        /// Minimum accepted chunk size
        min: usize,
    },
    /// Thread count of zero or beyond the hardware limit
    #[error("thread count {got} is outside 1..={max}")]
    InvalidThreadCount {
        /// Configured thread count
        got: usize,
        /// Hardware thread limit
        max: usize,
    },
    /// Overrides that contradict each other
    #[error("strategy override {strategy} conflicts with thread count {threads}")]
    ConflictingOverrides {
        /// The pinned strategy
        strategy: Strategy,
        /// The explicit thread count it conflicts with
        threads: usize,
    },
    /// Streaming buffer below the minimum
    #[error("buffer size {got} is below the {min} byte minimum")]
    InvalidBufferSize {
        /// Configured buffer size
        got: usize,
        /// Minimum accepted buffer size
        min: usize,
    },
}
