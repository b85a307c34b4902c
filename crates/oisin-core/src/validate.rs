// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lightweight structural validation
//!
//! A single pass over the input confirming balanced brackets and legal
//! quote/escape pairing. This is deliberately not full JSON validation:
//! numbers, literals, and member ordering are never inspected. The pass
//! shares the string automaton with the kernels and jumps between string
//! event bytes with `memchr`, so cost scales with structural density
//! rather than raw length.

use crate::error::{InputErrorKind, MinifyError, Result};

/// Maximum bracket nesting depth accepted by the validator
pub const MAX_DEPTH: usize = 1024;

/// Legal bytes after a backslash inside a string literal
const fn is_legal_escape(byte: u8) -> bool {
    matches!(
        byte,
        b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' | b'u'
    )
}

/// Validate the structural shape of `input`
///
/// # Errors
///
/// Returns [`MinifyError::InvalidInput`] with the defect kind and the byte
/// offset where it was detected:
///
/// - `unterminated_string`: a string opened (offset of its quote) and never
///   closed,
/// - `unbalanced_bracket`: a closer with no matching opener, mismatched
///   nesting at end of input, or depth beyond [`MAX_DEPTH`],
/// - `invalid_escape`: a backslash followed by an illegal escape byte,
/// - `truncated_input`: input ending immediately after a backslash.
pub fn validate(input: &[u8]) -> Result<()> {
    let len = input.len();
    let mut depth = 0usize;
    let mut string_start = 0usize;
    let mut i = 0usize;

    while i < len {
        let byte = input[i];
        match byte {
            b'"' => {
                string_start = i;
                i += 1;
                // Inside the string: hop between event bytes
                loop {
                    match memchr::memchr2(b'"', b'\\', &input[i..]) {
                        Some(off) => {
                            let j = i + off;
                            if input[j] == b'"' {
                                i = j + 1;
                                break;
                            }
                            // Escape: the next byte must exist and be legal
                            let Some(&escaped) = input.get(j + 1) else {
                                return Err(MinifyError::InvalidInput {
                                    kind: InputErrorKind::TruncatedInput,
                                    offset: j,
                                });
                            };
                            if !is_legal_escape(escaped) {
                                return Err(MinifyError::InvalidInput {
                                    kind: InputErrorKind::InvalidEscape,
                                    offset: j + 1,
                                });
                            }
                            i = j + 2;
                        }
                        None => {
                            return Err(MinifyError::InvalidInput {
                                kind: InputErrorKind::UnterminatedString,
                                offset: string_start,
                            });
                        }
                    }
                }
            }
            b'{' | b'[' => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(MinifyError::InvalidInput {
                        kind: InputErrorKind::UnbalancedBracket,
                        offset: i,
                    });
                }
                i += 1;
            }
            b'}' | b']' => {
                if depth == 0 {
                    return Err(MinifyError::InvalidInput {
                        kind: InputErrorKind::UnbalancedBracket,
                        offset: i,
                    });
                }
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    if depth != 0 {
        return Err(MinifyError::InvalidInput {
            kind: InputErrorKind::UnbalancedBracket,
            offset: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_at(input: &[u8]) -> Option<(InputErrorKind, usize)> {
        match validate(input) {
            Ok(()) => None,
            Err(MinifyError::InvalidInput { kind, offset }) => Some((kind, offset)),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_accepts_valid_documents() {
        assert!(validate(b"").is_ok());
        assert!(validate(b"   ").is_ok());
        assert!(validate(br#"{ "a" : 1 , "b" : [ 2 , 3 ] }"#).is_ok());
        assert!(validate(br#""just a string""#).is_ok());
        assert!(validate(br#"{"s":"\\"}"#).is_ok());
        assert!(validate(br#"{"k":"a\"b"}"#).is_ok());
    }

    #[test]
    fn test_lightweight_only() {
        // Not full JSON: garbage tokens pass as long as structure balances
        assert!(validate(b"truefalse 12..3").is_ok());
        assert!(validate(b"[nonsense]").is_ok());
    }

    #[test]
    fn test_unterminated_string_reports_opening_quote() {
        assert_eq!(
            kind_at(br#"{"a": "oops}"#),
            Some((InputErrorKind::UnterminatedString, 6))
        );
    }

    #[test]
    fn test_unbalanced_closer() {
        assert_eq!(
            kind_at(b"{}]"),
            Some((InputErrorKind::UnbalancedBracket, 2))
        );
    }

    #[test]
    fn test_unclosed_bracket_reports_end() {
        assert_eq!(
            kind_at(b"[[1,2]"),
            Some((InputErrorKind::UnbalancedBracket, 6))
        );
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        assert!(validate(br#""}{][""#).is_ok());
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            kind_at(br#""a\q""#),
            Some((InputErrorKind::InvalidEscape, 3))
        );
    }

    #[test]
    fn test_legal_escapes() {
        assert!(validate(br#""\" \\ \/ \b \f \n \r \t A""#).is_ok());
    }

    #[test]
    fn test_truncated_after_backslash() {
        assert_eq!(
            kind_at(br#""abc\"#),
            Some((InputErrorKind::TruncatedInput, 4))
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut deep = vec![b'['; MAX_DEPTH];
        deep.extend(vec![b']'; MAX_DEPTH]);
        assert!(validate(&deep).is_ok());

        let mut too_deep = vec![b'['; MAX_DEPTH + 1];
        too_deep.extend(vec![b']'; MAX_DEPTH + 1]);
        assert_eq!(
            kind_at(&too_deep),
            Some((InputErrorKind::UnbalancedBracket, MAX_DEPTH))
        );
    }
}
