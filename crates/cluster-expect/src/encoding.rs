//! Text handling for the raw byte stream a remote shell produces.
//!
//! A chunk read off the channel is arbitrary bytes: it may split a UTF-8
//! sequence, and login banners are usually decorated with ANSI escapes.
//! Decoding is lossy by design — a replacement character in an echoed
//! banner is harmless, an error mid-login is not.

use std::borrow::Cow;

/// Result of decoding one received chunk.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    /// The decoded text.
    pub text: String,
    /// Number of replacement characters inserted.
    pub replacements: usize,
}

impl DecodedChunk {
    /// Whether any byte failed to decode.
    #[must_use]
    pub const fn had_errors(&self) -> bool {
        self.replacements > 0
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD.
#[must_use]
pub fn decode_utf8_lossy(bytes: &[u8]) -> DecodedChunk {
    let text = String::from_utf8_lossy(bytes);
    let replacements = text.matches('\u{FFFD}').count();
    DecodedChunk {
        text: text.into_owned(),
        replacements,
    }
}

/// Remove ANSI escape sequences from text.
///
/// Handles CSI (`ESC [ ... final`), OSC (`ESC ] ... BEL/ST`), charset
/// designation, and simple two-byte escapes. Unknown sequences lose only
/// the ESC byte.
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(&next) = chars.peek() {
                match next {
                    '[' => {
                        // CSI sequence: ESC [ ... final byte
                        chars.next();
                        while let Some(&param) = chars.peek() {
                            if param.is_ascii_alphabetic() || param == '@' || param == '`' {
                                chars.next();
                                break;
                            }
                            chars.next();
                        }
                    }
                    ']' => {
                        // OSC sequence: ESC ] ... ST or BEL
                        chars.next();
                        while let Some(osc_char) = chars.next() {
                            if osc_char == '\x07' || osc_char == '\x1b' {
                                if osc_char == '\x1b' && chars.peek() == Some(&'\\') {
                                    chars.next();
                                }
                                break;
                            }
                        }
                    }
                    '(' | ')' | '*' | '+' => {
                        // Designate character set: ESC ( X
                        chars.next();
                        chars.next();
                    }
                    _ if next.is_ascii_uppercase() || next == '=' || next == '>' => {
                        chars.next();
                    }
                    _ => {}
                }
            }
        } else {
            result.push(c);
        }
    }

    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_clean_utf8() {
        let chunk = decode_utf8_lossy(b"Passcode or option (1-3):");
        assert_eq!(chunk.text, "Passcode or option (1-3):");
        assert!(!chunk.had_errors());
    }

    #[test]
    fn decode_truncated_sequence() {
        // A multi-byte sequence cut off by the chunk boundary.
        let chunk = decode_utf8_lossy(&[b'o', b'k', 0xE2, 0x82]);
        assert!(chunk.had_errors());
        assert!(chunk.text.starts_with("ok"));
    }

    #[test]
    fn strip_ansi_csi() {
        let result = strip_ansi("\x1b[32m[alice@login01 ~]$\x1b[0m ");
        assert_eq!(result, "[alice@login01 ~]$ ");
    }

    #[test]
    fn strip_ansi_borrows_when_clean() {
        let result = strip_ansi("plain prompt");
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn strip_ansi_osc_title() {
        let result = strip_ansi("\x1b]0;alice@login01\x07[alice@login01 ~]$");
        assert_eq!(result, "[alice@login01 ~]$");
    }
}
