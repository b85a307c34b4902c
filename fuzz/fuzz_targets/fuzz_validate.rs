// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for the lightweight validator.
//!
//! The validator must never panic, must report offsets inside the input,
//! and must accept anything `serde_json` accepts (it is strictly more
//! permissive than a full parser).

#![no_main]

use libfuzzer_sys::fuzz_target;
use oisin_core::validate;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1_000_000 {
        return;
    }

    match validate(data) {
        Ok(()) => {}
        Err(err) => {
            let offset = err.offset().expect("input errors carry an offset");
            assert!(offset <= data.len(), "offset {offset} out of bounds");
        }
    }

    // Anything a strict parser accepts, the lightweight pass must too
    if let Ok(text) = std::str::from_utf8(data)
        && serde_json::from_str::<serde_json::Value>(text).is_ok()
    {
        assert!(
            validate(data).is_ok(),
            "validator rejected JSON a strict parser accepts"
        );
    }
});
