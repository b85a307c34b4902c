// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for block classification.
//!
//! The vectorised and SWAR classifiers must agree with the scalar
//! reference on every block, and the four class masks must never overlap.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oisin_simd::{cached_capabilities, classify_block, classify_lane64};

fuzz_target!(|data: &[u8]| {
    let caps = cached_capabilities();

    for block in data.chunks(64) {
        let reference = classify_block(block);

        // Class masks partition the byte space
        assert_eq!(reference.ws & reference.quote, 0);
        assert_eq!(reference.ws & reference.escape, 0);
        assert_eq!(reference.ws & reference.structural, 0);
        assert_eq!(reference.quote & reference.escape, 0);
        assert_eq!(reference.quote & reference.structural, 0);
        assert_eq!(reference.escape & reference.structural, 0);

        if block.len() == 64 {
            let block: &[u8; 64] = block.try_into().unwrap();
            assert_eq!(
                classify_lane64(block, caps),
                reference,
                "vector classifier diverged from scalar"
            );
            assert_eq!(
                oisin_simd::swar::classify_lane64_swar(block),
                reference,
                "SWAR classifier diverged from scalar"
            );
        }
    }
});
