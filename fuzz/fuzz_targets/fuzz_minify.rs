// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for the full minification surface.
//!
//! For arbitrary bytes: no call may panic, output never exceeds a buffer
//! sized to the input, and every strategy that succeeds must agree with
//! the scalar reference byte for byte.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oisin::{MinifyConfig, Strategy};

fuzz_target!(|data: &[u8]| {
    // Skip extremely large inputs
    if data.len() > 1_000_000 {
        return;
    }

    let mut reference = Vec::new();
    oisin::minify_scalar(data, &mut reference);
    assert!(reference.len() <= data.len(), "length bound violated");

    let config = MinifyConfig::new().without_validation();
    for strategy in [
        Strategy::Scalar,
        Strategy::Simd128,
        Strategy::Simd256,
        Strategy::Simd512,
        Strategy::Streaming,
        Strategy::ChunkParallel,
        Strategy::PipelineParallel,
    ] {
        let result = oisin::minify(data, &config.clone().with_strategy(strategy))
            .unwrap_or_else(|e| panic!("strategy {strategy} failed on arbitrary bytes: {e}"));
        assert_eq!(
            result.output, reference,
            "strategy {strategy} diverged from the scalar reference"
        );
    }

    // Validated path: either a clean rejection with an in-bounds offset
    // or the same output
    match oisin::minify(data, &MinifyConfig::new()) {
        Ok(result) => assert_eq!(result.output, reference),
        Err(err) => {
            if let Some(offset) = err.offset() {
                assert!(offset <= data.len(), "error offset out of bounds");
            }
        }
    }
});
