// SPDX-License-Identifier: MIT OR Apache-2.0
//! CPU capability probing
//!
//! One-shot detection of vector extensions, logical core count, and NUMA
//! topology. The record is immutable and threaded through calls explicitly;
//! [`cached_capabilities`] memoises one probe for callers that do not carry
//! their own record. Features that cannot be probed on a platform report
//! as absent, never as an error.

use oisin_core::Strategy;
use std::sync::OnceLock;

/// Immutable CPU capability record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// 128-bit vector operations available
    pub has_128: bool,
    /// 256-bit vector operations available
    pub has_256: bool,
    /// 512-bit vector operations available
    pub has_512: bool,
    /// Byte-granular compress instruction available (keep-mask compaction
    /// in one instruction instead of an unrolled gather)
    pub has_byte_compress: bool,
    /// Logical core count
    pub logical_cores: usize,
    /// NUMA node count, at least 1
    pub numa_nodes: usize,
}

impl CpuCapabilities {
    /// Record with every feature absent and a single core
    #[must_use]
    pub const fn none() -> Self {
        Self {
            has_128: false,
            has_256: false,
            has_512: false,
            has_byte_compress: false,
            logical_cores: 1,
            numa_nodes: 1,
        }
    }

    /// Whether any vector width is available
    #[must_use]
    pub const fn has_simd(&self) -> bool {
        self.has_128 || self.has_256 || self.has_512
    }

    /// Available vector widths in bits, widest first
    #[must_use]
    pub fn vector_widths(&self) -> Vec<u32> {
        let mut widths = Vec::new();
        if self.has_512 {
            widths.push(512);
        }
        if self.has_256 {
            widths.push(256);
        }
        if self.has_128 {
            widths.push(128);
        }
        widths
    }

    /// The widest SIMD strategy this host supports, if any
    #[must_use]
    pub const fn best_simd(&self) -> Option<Strategy> {
        if self.has_512 {
            Some(Strategy::Simd512)
        } else if self.has_256 {
            Some(Strategy::Simd256)
        } else if self.has_128 {
            Some(Strategy::Simd128)
        } else {
            None
        }
    }

    /// Human-readable name of the widest available instruction set
    #[must_use]
    pub const fn best_instruction_set(&self) -> &'static str {
        if self.has_512 {
            "avx-512"
        } else if self.has_256 {
            "avx2"
        } else if self.has_128 {
            "sse2"
        } else {
            "scalar"
        }
    }
}

/// Probe the host once and build a capability record
///
/// Safe to call repeatedly; every call re-queries the host. Use
/// [`cached_capabilities`] for the memoised process-wide copy.
#[must_use]
pub fn probe() -> CpuCapabilities {
    let logical_cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let numa_nodes = numa_node_count();

    #[cfg(target_arch = "x86_64")]
    {
        CpuCapabilities {
            has_128: is_x86_feature_detected!("sse2"),
            has_256: is_x86_feature_detected!("avx2"),
            has_512: is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512bw"),
            has_byte_compress: is_x86_feature_detected!("avx512vbmi2"),
            logical_cores,
            numa_nodes,
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        CpuCapabilities {
            logical_cores,
            numa_nodes,
            ..CpuCapabilities::none()
        }
    }
}

/// Process-wide memoised capability record
#[must_use]
pub fn cached_capabilities() -> &'static CpuCapabilities {
    static CAPABILITIES: OnceLock<CpuCapabilities> = OnceLock::new();
    CAPABILITIES.get_or_init(probe)
}

/// NUMA node count from sysfs on Linux; 1 wherever that cannot be read
fn numa_node_count() -> usize {
    #[cfg(target_os = "linux")]
    {
        if let Ok(entries) = std::fs::read_dir("/sys/devices/system/node") {
            let nodes = entries
                .filter_map(std::result::Result::ok)
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|name| name.strip_prefix("node").is_some_and(|rest| {
                            !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
                        }))
                })
                .count();
            if nodes > 0 {
                return nodes;
            }
        }
    }
    1
}
