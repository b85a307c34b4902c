// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-memory streaming minification
//!
//! For inputs too large to hold in memory: a staged buffer is filled from
//! the reader, minified with the widest kernel the host offers, and the
//! output drained to the writer before the next refill. The automaton
//! state (including a pending escape) carries across refills, so the
//! output is byte-identical to the in-memory kernels whatever the buffer
//! size. Peak memory stays proportional to the configured buffer size,
//! independent of input length.

#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::cargo)]

use oisin_core::{MinifyConfig, MinifyError, Result, StreamStats};
use oisin_simd::{CpuCapabilities, SimdMinifier};
use std::io::{Read, Write};

/// Minify everything `reader` yields into `writer`
///
/// Reads at most `config.buffer_size` bytes at a time and writes each
/// staged buffer's minified output before refilling. Interrupted reads
/// are retried; everything else from the reader or writer is surfaced
/// unchanged.
///
/// # Errors
///
/// [`MinifyError::IoRead`] or [`MinifyError::IoWrite`] wrapping the
/// underlying I/O failure.
pub fn minify_stream<R: Read, W: Write>(
    mut reader: R,
    mut writer: W,
    config: &MinifyConfig,
    caps: &CpuCapabilities,
) -> Result<StreamStats> {
    let mut kernel = SimdMinifier::widest(caps);
    let mut staged = vec![0u8; config.buffer_size];
    let mut minified = Vec::with_capacity(config.buffer_size);
    let mut total_in = 0u64;
    let mut total_out = 0u64;

    loop {
        let filled = match reader.read(&mut staged) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MinifyError::IoRead(e)),
        };
        total_in += filled as u64;

        minified.clear();
        kernel.push(&staged[..filled], &mut minified);
        writer
            .write_all(&minified)
            .map_err(MinifyError::IoWrite)?;
        total_out += minified.len() as u64;
    }

    writer.flush().map_err(MinifyError::IoWrite)?;
    Ok(StreamStats {
        total_in,
        total_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oisin_core::minify_scalar;
    use oisin_simd::probe;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn scalar_reference(input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        minify_scalar(input, &mut out);
        out
    }

    fn stream_with_buffer(input: &[u8], buffer_size: usize) -> (Vec<u8>, StreamStats) {
        let config = MinifyConfig::new().with_buffer_size(buffer_size);
        let caps = probe();
        let mut out = Vec::new();
        let stats = minify_stream(Cursor::new(input), &mut out, &config, &caps).unwrap();
        (out, stats)
    }

    #[test]
    fn test_matches_scalar_for_small_buffers() {
        let mut input = b"{ \"items\" : [".to_vec();
        for i in 0..2000 {
            if i > 0 {
                input.extend_from_slice(b" , ");
            }
            input.extend_from_slice(format!("{{ \"v\" : \"text {i}  pad\" }}").as_bytes());
        }
        input.extend_from_slice(b"] }");
        let expected = scalar_reference(&input);
        for buffer_size in [4096, 8192, 65536] {
            let (out, stats) = stream_with_buffer(&input, buffer_size);
            assert_eq!(out, expected, "buffer size {buffer_size}");
            assert_eq!(stats.total_in, input.len() as u64);
            assert_eq!(stats.total_out, expected.len() as u64);
        }
    }

    #[test]
    fn test_string_spans_buffer_seam() {
        // String interior whitespace must survive a refill boundary
        let mut input = b"{\"s\":\"".to_vec();
        input.extend(std::iter::repeat_n(b' ', 3 * 4096));
        input.extend_from_slice(b"\"}  ");
        let expected = scalar_reference(&input);
        let (out, _) = stream_with_buffer(&input, 4096);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_escape_spans_buffer_seam() {
        // Backslash as the last byte of one refill, escaped quote first in
        // the next
        let mut input = vec![b' '; 4096 - 8];
        input.extend_from_slice(br#"{"k":"a\"#);
        input.extend_from_slice(br#""b"} "#);
        assert_eq!(input[4095], b'\\');
        let expected = scalar_reference(&input);
        let (out, _) = stream_with_buffer(&input, 4096);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_empty_reader() {
        let (out, stats) = stream_with_buffer(b"", 4096);
        assert!(out.is_empty());
        assert_eq!(stats.total_in, 0);
        assert_eq!(stats.total_out, 0);
    }

    #[test]
    fn test_write_errors_surface() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink is broken"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let config = MinifyConfig::new();
        let caps = probe();
        let err = minify_stream(Cursor::new(b"{ }".as_slice()), FailingWriter, &config, &caps)
            .unwrap_err();
        assert!(matches!(err, MinifyError::IoWrite(_)));
    }

    #[test]
    fn test_read_errors_surface() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("source is broken"))
            }
        }
        let config = MinifyConfig::new();
        let caps = probe();
        let mut out = Vec::new();
        let err = minify_stream(FailingReader, &mut out, &config, &caps).unwrap_err();
        assert!(matches!(err, MinifyError::IoRead(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn prop_streaming_equals_one_shot(
            parts in proptest::collection::vec(
                prop_oneof![
                    Just(br#"{"k": "v  v"} "#.to_vec()),
                    Just(b" [1,\t2]\n".to_vec()),
                    Just(br#""e\"s\\c  ""#.to_vec()),
                    Just(b"        ".to_vec()),
                ],
                0..600,
            ),
            buffer_size in prop_oneof![Just(4096usize), Just(5000), Just(8192)],
        ) {
            let input: Vec<u8> = parts.concat();
            let expected = scalar_reference(&input);
            let (out, stats) = stream_with_buffer(&input, buffer_size);
            prop_assert_eq!(out, expected);
            prop_assert_eq!(stats.total_in, input.len() as u64);
        }
    }
}
