// SPDX-License-Identifier: MIT OR Apache-2.0
//! Width-dispatched minifier kernels
//!
//! One kernel per vector width, all sharing the same shape: walk the input
//! in native-width blocks, classify each block, and either compact it with
//! the keep-mask (no string machinery in sight) or hand that block to the
//! scalar automaton. The automaton also owns the remainder tail and every
//! byte consumed while inside a string, so correctness never depends on
//! the vector path.

use crate::classify::{classify_native, lane_mask};
use crate::compact::compact_block;
use crate::cpu::CpuCapabilities;
use oisin_core::{ScalarMinifier, State, Strategy};

/// Processing granularity of a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockWidth {
    /// Byte-at-a-time scalar
    Scalar,
    /// Eight-byte SWAR words
    Swar,
    /// 16-byte vectors
    W128,
    /// 32-byte vectors
    W256,
    /// 64-byte vectors
    W512,
}

impl BlockWidth {
    /// Block size in bytes; zero means no block loop at all
    #[must_use]
    pub const fn block_size(self) -> usize {
        match self {
            Self::Scalar => 0,
            Self::Swar => 8,
            Self::W128 => 16,
            Self::W256 => 32,
            Self::W512 => 64,
        }
    }

    /// Widest width the capability record supports
    #[must_use]
    pub const fn widest(caps: &CpuCapabilities) -> Self {
        if caps.has_512 {
            Self::W512
        } else if caps.has_256 {
            Self::W256
        } else if caps.has_128 {
            Self::W128
        } else {
            Self::Swar
        }
    }

    /// Width for a pinned strategy, downgraded to what the host can run
    #[must_use]
    pub const fn for_strategy(strategy: Strategy, caps: &CpuCapabilities) -> Self {
        match strategy {
            Strategy::Simd512 if caps.has_512 => Self::W512,
            Strategy::Simd512 | Strategy::Simd256 if caps.has_256 => Self::W256,
            Strategy::Simd512 | Strategy::Simd256 | Strategy::Simd128 if caps.has_128 => {
                Self::W128
            }
            Strategy::Simd512 | Strategy::Simd256 | Strategy::Simd128 => Self::Swar,
            _ => Self::Scalar,
        }
    }
}

/// Resumable vectorised minifier
///
/// Like [`ScalarMinifier`], state survives across `push` calls, so the
/// streaming kernel can run vectorised over each staged buffer.
#[derive(Debug, Clone)]
pub struct SimdMinifier {
    scalar: ScalarMinifier,
    width: BlockWidth,
    use_compress: bool,
}

impl SimdMinifier {
    /// Kernel for a pinned strategy on the given host
    #[must_use]
    pub const fn new(strategy: Strategy, caps: &CpuCapabilities) -> Self {
        Self {
            scalar: ScalarMinifier::new(),
            width: BlockWidth::for_strategy(strategy, caps),
            use_compress: caps.has_byte_compress,
        }
    }

    /// Kernel at the widest width the host supports
    #[must_use]
    pub const fn widest(caps: &CpuCapabilities) -> Self {
        Self {
            scalar: ScalarMinifier::new(),
            width: BlockWidth::widest(caps),
            use_compress: caps.has_byte_compress,
        }
    }

    /// The width this kernel runs at
    #[must_use]
    pub const fn width(&self) -> BlockWidth {
        self.width
    }

    /// Current automaton state
    #[must_use]
    pub const fn state(&self) -> State {
        self.scalar.state()
    }

    /// Force the automaton state (used when resuming mid-document)
    pub const fn set_state(&mut self, state: State) {
        self.scalar.set_state(state);
    }

    /// Minify `input`, appending to `out` and carrying state forward
    ///
    /// Returns the number of bytes appended.
    pub fn push(&mut self, input: &[u8], out: &mut Vec<u8>) -> usize {
        let start = out.len();
        out.reserve(input.len());
        let block_size = self.width.block_size();
        if block_size == 0 {
            self.scalar.push(input, out);
            return out.len() - start;
        }

        let mut i = 0;
        let full_blocks_end = input.len() - input.len() % block_size;
        let caps_keep = lane_mask(block_size);
        while i < full_blocks_end {
            let block = &input[i..i + block_size];
            if self.scalar.in_string() {
                // Inside a string every byte is copied; let the automaton
                // chase the closing quote for this block
                self.scalar.push(block, out);
                i += block_size;
                continue;
            }
            let masks = self.classify(block);
            if masks.has_string_events() {
                self.scalar.push(block, out);
            } else {
                // Entirely outside strings with no events: state cannot
                // change, whitespace dies by mask
                compact_block(block, !masks.ws & caps_keep, self.use_compress, out);
            }
            i += block_size;
        }
        if i < input.len() {
            self.scalar.push(&input[i..], out);
        }
        out.len() - start
    }

    fn classify(&self, block: &[u8]) -> crate::classify::BlockMasks {
        match self.width {
            BlockWidth::Swar => {
                let mut lane = [0u8; 8];
                lane.copy_from_slice(block);
                crate::swar::classify8(&lane)
            }
            _ => classify_native(block, &self.caps_for_width()),
        }
    }

    /// Capability view narrowed to this kernel's width
    ///
    /// `classify_native` dispatches on block length and capability flags;
    /// narrowing prevents a wider unit from being picked for a narrower
    /// pinned kernel.
    const fn caps_for_width(&self) -> CpuCapabilities {
        CpuCapabilities {
            has_128: matches!(self.width, BlockWidth::W128),
            has_256: matches!(self.width, BlockWidth::W256),
            has_512: matches!(self.width, BlockWidth::W512),
            has_byte_compress: self.use_compress,
            logical_cores: 1,
            numa_nodes: 1,
        }
    }
}

/// One-shot vectorised minification at the host's best width
///
/// Returns the number of bytes appended to `out`.
pub fn minify_simd(
    input: &[u8],
    strategy: Strategy,
    caps: &CpuCapabilities,
    out: &mut Vec<u8>,
) -> usize {
    let mut kernel = SimdMinifier::new(strategy, caps);
    kernel.push(input, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::probe;
    use oisin_core::minify_scalar;
    use oisin_core::Strategy;
    use proptest::prelude::*;

    fn scalar_reference(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        minify_scalar(input, &mut out);
        out
    }

    fn all_widths() -> Vec<SimdMinifier> {
        let caps = probe();
        let mut kernels = vec![
            SimdMinifier::new(Strategy::Scalar, &caps),
            SimdMinifier {
                scalar: ScalarMinifier::new(),
                width: BlockWidth::Swar,
                use_compress: false,
            },
        ];
        if caps.has_128 {
            kernels.push(SimdMinifier::new(Strategy::Simd128, &caps));
        }
        if caps.has_256 {
            kernels.push(SimdMinifier::new(Strategy::Simd256, &caps));
        }
        if caps.has_512 {
            kernels.push(SimdMinifier::new(Strategy::Simd512, &caps));
        }
        kernels
    }

    #[test]
    fn test_kernels_match_scalar_on_fixtures() {
        let fixtures: &[&[u8]] = &[
            b"",
            b" ",
            b"   ",
            br#"{ "a" : 1 , "b" : [ 2 , 3 ] }"#,
            b"\"  hello\tworld  \"",
            b"[\n  \"x\",\n  \"y\"\n]",
            br#"{"k":"a\"b"}"#,
            br#"{"s":"\\"}"#,
            b"\"\x00\"",
            b"\xEF\xBB\xBF {}",
        ];
        for fixture in fixtures {
            let expected = scalar_reference(fixture);
            for mut kernel in all_widths() {
                let mut out = Vec::new();
                kernel.push(fixture, &mut out);
                assert_eq!(out, expected, "width {:?} diverged", kernel.width());
            }
        }
    }

    #[test]
    fn test_exact_vector_width_inputs() {
        // Inputs at exactly one and two native blocks for each width
        for width in [16usize, 32, 64, 128] {
            let mut input = br#"{ "k" : [ 1 , 2 ] , "s" : "v v" }"#.to_vec();
            input.resize(width, b' ');
            let expected = scalar_reference(&input);
            for mut kernel in all_widths() {
                let mut out = Vec::new();
                kernel.push(&input, &mut out);
                assert_eq!(out, expected, "width {:?} diverged", kernel.width());
            }
        }
    }

    #[test]
    fn test_alternating_whitespace() {
        let input: Vec<u8> = (0..257)
            .map(|i| if i % 2 == 0 { b' ' } else { b'1' })
            .collect();
        let expected = scalar_reference(&input);
        for mut kernel in all_widths() {
            let mut out = Vec::new();
            kernel.push(&input, &mut out);
            assert_eq!(out, expected, "width {:?} diverged", kernel.width());
        }
    }

    #[test]
    fn test_long_string_spanning_blocks() {
        let mut input = b"{\"k\":\"".to_vec();
        input.extend(std::iter::repeat_n(b'x', 100));
        input.extend_from_slice(b" y \"} ");
        let expected = scalar_reference(&input);
        for mut kernel in all_widths() {
            let mut out = Vec::new();
            kernel.push(&input, &mut out);
            assert_eq!(out, expected, "width {:?} diverged", kernel.width());
        }
    }

    #[test]
    fn test_state_carries_across_pushes() {
        let caps = probe();
        let input = br#"{ "a" : "long string with   spaces inside", "b" :  2 }"#;
        let expected = scalar_reference(input);
        for split in 0..input.len() {
            let mut kernel = SimdMinifier::widest(&caps);
            let mut out = Vec::new();
            kernel.push(&input[..split], &mut out);
            kernel.push(&input[split..], &mut out);
            assert_eq!(out, expected, "diverged at split {split}");
        }
    }

    #[test]
    fn test_pinned_strategy_downgrades_gracefully() {
        let no_simd = CpuCapabilities::none();
        let kernel = SimdMinifier::new(Strategy::Simd512, &no_simd);
        assert_eq!(kernel.width(), BlockWidth::Swar);
    }

    proptest! {
        #[test]
        fn prop_widest_matches_scalar(input in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let caps = probe();
            let mut kernel = SimdMinifier::widest(&caps);
            let mut out = Vec::new();
            kernel.push(&input, &mut out);
            prop_assert_eq!(out, scalar_reference(&input));
        }

        #[test]
        fn prop_swar_matches_scalar(input in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let mut kernel = SimdMinifier {
                scalar: ScalarMinifier::new(),
                width: BlockWidth::Swar,
                use_compress: false,
            };
            let mut out = Vec::new();
            kernel.push(&input, &mut out);
            prop_assert_eq!(out, scalar_reference(&input));
        }

        #[test]
        fn prop_jsonish_inputs_match_scalar(
            parts in proptest::collection::vec(
                prop_oneof![
                    Just(br#"{"key": "value with  spaces"}"#.to_vec()),
                    Just(b"  [1, 2,\t3]\n".to_vec()),
                    Just(br#""esc\"aped \\ string""#.to_vec()),
                    Just(b"     ".to_vec()),
                ],
                0..16,
            )
        ) {
            let input: Vec<u8> = parts.concat();
            let caps = probe();
            let mut kernel = SimdMinifier::widest(&caps);
            let mut out = Vec::new();
            kernel.push(&input, &mut out);
            prop_assert_eq!(out, scalar_reference(&input));
        }
    }
}
