// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end minification scenarios
//!
//! The literal input/output table every strategy must reproduce byte for
//! byte, plus the boundary scenarios around empty inputs, vector-width
//! edges, and error reporting.

#![allow(missing_docs)]

use oisin::{
    CancelToken, InputErrorKind, MinifyConfig, MinifyError, Strategy, capabilities, minify,
    minify_stream,
};
use std::io::Cursor;

const ALL_STRATEGIES: [Strategy; 7] = [
    Strategy::Scalar,
    Strategy::Simd128,
    Strategy::Simd256,
    Strategy::Simd512,
    Strategy::Streaming,
    Strategy::ChunkParallel,
    Strategy::PipelineParallel,
];

fn minify_with(input: &[u8], strategy: Strategy) -> Vec<u8> {
    let config = MinifyConfig::new().with_strategy(strategy);
    minify(input, &config)
        .unwrap_or_else(|e| panic!("strategy {strategy} failed: {e}"))
        .output
}

/// The six canonical scenarios, all strategies
#[test]
fn test_canonical_scenarios_for_every_strategy() {
    let scenarios: &[(&[u8], &[u8])] = &[
        (br#"{ "a" : 1 , "b" : [ 2 , 3 ] }"#, br#"{"a":1,"b":[2,3]}"#),
        (b"\"  hello\tworld  \"", b"\"  hello\tworld  \""),
        (b"[\n  \"x\",\n  \"y\"\n]", b"[\"x\",\"y\"]"),
        (br#"{"k":"a\"b"}"#, br#"{"k":"a\"b"}"#),
        (b"   ", b""),
        (br#"{"s":"\\"}"#, br#"{"s":"\\"}"#),
    ];
    for (input, expected) in scenarios {
        for strategy in ALL_STRATEGIES {
            assert_eq!(
                minify_with(input, strategy),
                *expected,
                "strategy {strategy} diverged on {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }
}

#[test]
fn test_empty_input() {
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(b"", strategy), b"");
    }
}

#[test]
fn test_single_whitespace_byte() {
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(b" ", strategy), b"");
    }
}

#[test]
fn test_single_character_string() {
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(b"\"a\"", strategy), b"\"a\"");
    }
}

#[test]
fn test_string_of_only_escapes() {
    let input = br#""\\\\""#;
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(input, strategy), input);
    }
}

#[test]
fn test_embedded_nul_in_string() {
    let input = b"\"\x00\"";
    let config = MinifyConfig::new().without_validation();
    for strategy in ALL_STRATEGIES {
        let out = minify(input, &config.clone().with_strategy(strategy))
            .unwrap()
            .output;
        assert_eq!(out, input);
    }
}

#[test]
fn test_unicode_nul_escape_in_string() {
    let input = br#""\u0000""#;
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(input, strategy), input);
    }
}

#[test]
fn test_leading_bom_is_preserved() {
    let out = minify(b"\xEF\xBB\xBF { }", &MinifyConfig::new().without_validation()).unwrap();
    assert_eq!(out.output, b"\xEF\xBB\xBF{}");
}

#[test]
fn test_inputs_at_vector_width_multiples() {
    // Exactly one and two blocks of every kernel width
    for width in [16usize, 32, 64, 128] {
        let mut input = br#"[ "pad" , 1 , 2 ]"#.to_vec();
        input.resize(width, b' ');
        let expected = minify_with(&input, Strategy::Scalar);
        for strategy in ALL_STRATEGIES {
            assert_eq!(
                minify_with(&input, strategy),
                expected,
                "strategy {strategy} diverged at width {width}"
            );
        }
    }
}

#[test]
fn test_alternating_whitespace_every_byte() {
    let input: Vec<u8> = (0..4096)
        .map(|i| if i % 2 == 0 { b'\n' } else { b'7' })
        .collect();
    let expected = minify_with(&input, Strategy::Scalar);
    assert_eq!(expected.len(), 2048);
    for strategy in ALL_STRATEGIES {
        assert_eq!(minify_with(&input, strategy), expected);
    }
}

#[test]
fn test_deeply_nested_structure_at_depth_limit() {
    let depth = 1024;
    let mut input = Vec::new();
    input.extend(std::iter::repeat_n(b'[', depth));
    input.extend(std::iter::repeat_n(b']', depth));
    let out = minify(&input, &MinifyConfig::new()).unwrap();
    assert_eq!(out.output, input);

    let mut too_deep = Vec::new();
    too_deep.extend(std::iter::repeat_n(b'[', depth + 1));
    too_deep.extend(std::iter::repeat_n(b']', depth + 1));
    let err = minify(&too_deep, &MinifyConfig::new()).unwrap_err();
    assert!(matches!(
        err,
        MinifyError::InvalidInput {
            kind: InputErrorKind::UnbalancedBracket,
            ..
        }
    ));
}

#[test]
fn test_unterminated_string_reports_offset() {
    let err = minify(br#"{"a": "oops}"#, &MinifyConfig::new()).unwrap_err();
    match err {
        MinifyError::InvalidInput { kind, offset } => {
            assert_eq!(kind, InputErrorKind::UnterminatedString);
            assert_eq!(offset, 6);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_stats_record_is_populated() {
    let input = br#"{ "a" : 1 }"#;
    let result = minify(input, &MinifyConfig::new()).unwrap();
    let stats = &result.stats;
    assert_eq!(stats.input_size, input.len());
    assert_eq!(stats.output_size, result.output.len());
    assert!(stats.peak_memory_bytes >= input.len());
    assert!(stats.estimated_throughput_mb_s > 0.0);

    let json = serde_json::to_value(stats).unwrap();
    assert!(json.get("strategy_used").is_some());
    assert!(json.get("compression_ratio").is_some());
}

#[test]
fn test_auto_selection_on_large_input_matches_scalar() {
    let mut input = b"[".to_vec();
    for i in 0..40_000 {
        if i > 0 {
            input.extend_from_slice(b", ");
        }
        input.extend_from_slice(format!(r#"{{"id": {i}, "tag": "v {i}"}}"#).as_bytes());
    }
    input.push(b']');
    let auto = minify(&input, &MinifyConfig::new()).unwrap();
    let scalar = minify_with(&input, Strategy::Scalar);
    assert_eq!(auto.output, scalar);
}

#[test]
fn test_streaming_call_reports_totals() {
    let input = br#"[ 1 , 2 , 3 ]"#;
    let mut out = Vec::new();
    let stats = minify_stream(Cursor::new(input.as_slice()), &mut out, &MinifyConfig::new())
        .unwrap();
    assert_eq!(out, b"[1,2,3]");
    assert_eq!(stats.total_in, input.len() as u64);
    assert_eq!(stats.total_out, 7);
}

#[test]
fn test_cancel_token_aborts_parallel_call() {
    if capabilities().logical_cores < 2 {
        return;
    }
    let input = vec![b'1'; 4 * 1024 * 1024];
    let token = CancelToken::new();
    token.cancel();
    let config = MinifyConfig::new()
        .with_strategy(Strategy::ChunkParallel)
        .with_cancel(token);
    let err = minify(&input, &config).unwrap_err();
    assert!(matches!(err, MinifyError::Cancelled { .. }));
}

#[test]
fn test_conflicting_overrides_are_rejected() {
    let config = MinifyConfig::new()
        .with_strategy(Strategy::Scalar)
        .with_threads(2);
    let err = minify(b"{}", &config).unwrap_err();
    assert!(matches!(err, MinifyError::InvalidConfiguration(_)));
}

#[test]
fn test_capability_record_is_coherent() {
    let caps = capabilities();
    assert!(caps.logical_cores >= 1);
    assert!(caps.numa_nodes >= 1);
    if caps.has_byte_compress {
        assert!(caps.has_512);
    }
}
