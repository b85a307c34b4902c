// SPDX-License-Identifier: MIT OR Apache-2.0
//! libFuzzer target for safe split-point discovery.
//!
//! Every emitted split must sit at a position where the string automaton
//! is outside any literal, and chunked minification at those splits must
//! compose to the whole-document output.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oisin_core::State;
use oisin_parallel::{find_split_points, split::chunk_ranges};

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    let splits = find_split_points(data, 64);

    // Safety of every split point against the byte-at-a-time automaton
    let mut state = State::OutsideString;
    let mut split_iter = splits.iter().copied().peekable();
    for (offset, &byte) in data.iter().enumerate() {
        if split_iter.peek() == Some(&offset) {
            assert_eq!(state, State::OutsideString, "unsafe split at {offset}");
            split_iter.next();
        }
        state = state.step(byte);
    }
    assert!(split_iter.peek().is_none(), "split past end of input");

    // Composition: chunked minification equals the one-shot output
    let mut whole = Vec::new();
    oisin_core::minify_scalar(data, &mut whole);
    let mut pieced = Vec::new();
    for range in chunk_ranges(&splits, data.len()) {
        oisin_core::minify_scalar(&data[range], &mut pieced);
    }
    assert_eq!(whole, pieced, "chunked output diverged");
});
