//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded words and charset
//! conversion to UTF-8.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;

use crate::error::Result;

/// Maximum encoded line length (RFC 2045 section 6.7/6.8).
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes carried by one RFC 2047 encoded word so the word stays under 75 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes data as a single line of Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 broken into CRLF-terminated lines of 76 characters.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        // Base64 output is ASCII, so every chunk is valid UTF-8.
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
    out
}

/// Length of `n` bytes after Base64 encoding, before line breaks.
#[must_use]
pub const fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

/// Decodes Base64 data, ignoring whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes bytes using Quoted-Printable (RFC 2045 section 6.7).
///
/// CRLF and bare LF in the input are kept as hard line breaks (written as
/// CRLF). Lines longer than 76 characters get soft breaks, and whitespace at
/// the end of a line is encoded.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 8);
    let mut lines = data.split(|&b| b == b'\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let mut column = 0;

        for (i, &byte) in line.iter().enumerate() {
            let last = i + 1 == line.len();
            let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~')
                || ((byte == b' ' || byte == b'\t') && !last);
            let width = if literal { 1 } else { 3 };

            // Leave room for the trailing '=' of a soft break.
            let limit = if last { MAX_LINE_LENGTH } else { MAX_LINE_LENGTH - 1 };
            if column + width > limit {
                out.push_str("=\r\n");
                column = 0;
            }

            if literal {
                out.push(char::from(byte));
            } else {
                let _ = write!(out, "={byte:02X}");
            }
            column += width;
        }

        if lines.peek().is_some() {
            out.push_str("\r\n");
        }
    }
    out
}

/// Decodes Quoted-Printable data.
///
/// Malformed escapes are kept literally, as RFC 2045 recommends for robust
/// decoders.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        let rest = &data[i + 1..];
        // Soft line break, allowing transport-added whitespace before it.
        let ws = rest
            .iter()
            .take_while(|b| **b == b' ' || **b == b'\t')
            .count();
        match &rest[ws..] {
            [b'\r', b'\n', ..] => {
                i += 1 + ws + 2;
                continue;
            }
            [b'\n', ..] => {
                i += 1 + ws + 1;
                continue;
            }
            [] => {
                i = data.len();
                continue;
            }
            _ => {}
        }

        match rest {
            [hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push((hex_value(*hi) << 4) | hex_value(*lo));
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    out
}

const fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Returns true when a header value must be carried as encoded words.
#[must_use]
pub fn needs_rfc2047(text: &str) -> bool {
    !text.is_ascii() || text.contains("=?") || text.bytes().any(|b| b.is_ascii_control())
}

/// Encodes a header value as UTF-8 `B` encoded words when needed.
///
/// Plain ASCII text is returned unchanged. Long values are split on
/// character boundaries into several encoded words joined by folding
/// whitespace.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if !needs_rfc2047(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk_start = 0;
    let mut chunk_len = 0;
    for (idx, ch) in text.char_indices() {
        if chunk_len + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(&text[chunk_start..idx]);
            chunk_start = idx;
            chunk_len = 0;
        }
        chunk_len += ch.len_utf8();
    }
    words.push(&text[chunk_start..]);

    words
        .iter()
        .map(|w| format!("=?utf-8?B?{}?=", encode_base64(w.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Decodes RFC 2047 encoded words inside a header value.
///
/// Text outside encoded words is kept; whitespace between two adjacent
/// encoded words is dropped (RFC 2047 section 6.2). Words that fail to
/// decode are kept verbatim.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_ws = String::new();
    let mut after_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = rest.strip_prefix("=?").and_then(decode_word) {
            if !after_word {
                out.push_str(&pending_ws);
            }
            pending_ws.clear();
            out.push_str(&decoded);
            rest = &rest[2 + consumed..];
            after_word = true;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch.is_whitespace() {
            pending_ws.push(ch);
        } else {
            out.push_str(&pending_ws);
            pending_ws.clear();
            out.push(ch);
            after_word = false;
        }
        rest = &rest[ch.len_utf8()..];
    }
    out.push_str(&pending_ws);
    out
}

/// Decodes `charset?enc?text?=`, returning the text and bytes consumed.
fn decode_word(s: &str) -> Option<(String, usize)> {
    let (charset, after) = s.split_once('?')?;
    let (enc, after) = after.split_once('?')?;
    let end = after.find("?=")?;
    let payload = &after[..end];
    if charset.is_empty() || payload.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match enc {
        "B" | "b" => decode_base64(payload.as_bytes()).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };
    let consumed = charset.len() + 1 + enc.len() + 1 + end + 2;
    // RFC 2231 allows a language suffix: charset*lang
    let label = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(&bytes, label), consumed))
}

/// Converts bytes in `charset` to UTF-8.
///
/// Unknown charsets are treated as UTF-8; invalid sequences become U+FFFD.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    let encoding = Encoding::for_label(charset.trim().as_bytes()).unwrap_or(encoding_rs::UTF_8);
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base64_lines_wrap_at_76() {
        let data = vec![0xABu8; 100];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines.concat().len(), base64_len(100));
        assert_eq!(decode_base64(encoded.as_bytes()).unwrap(), data);
    }

    #[test]
    fn base64_len_matches_engine() {
        for n in [0, 1, 2, 3, 4, 1024, 1_048_576] {
            assert_eq!(base64_len(n), encode_base64(&vec![0; n]).len());
        }
    }

    #[test]
    fn quoted_printable_basics() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable("Héllo".as_bytes()), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable(b"line \r\nnext\n"), "line=20\r\nnext\r\n");
    }

    #[test]
    fn quoted_printable_soft_breaks() {
        let long = "x".repeat(200);
        let encoded = encode_quoted_printable(long.as_bytes());
        assert!(encoded.split("\r\n").all(|l| l.len() <= MAX_LINE_LENGTH));
        assert_eq!(decode_quoted_printable(encoded.as_bytes()), long.as_bytes());
    }

    #[test]
    fn quoted_printable_decode_is_lenient() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello= \nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"100=%"), b"100=%");
        assert_eq!(decode_quoted_printable(b"end="), b"end");
    }

    #[test]
    fn rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello"), "Hello");
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");

        let long = "ü".repeat(60);
        let encoded = encode_rfc2047(&long);
        assert!(encoded.contains("\r\n "));
        assert!(encoded.split("\r\n ").all(|w| w.len() <= 75));
        assert_eq!(decode_rfc2047(&encoded), long);
    }

    #[test]
    fn rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_rfc2047("=?UTF-8?Q?H=C3=A9llo_world?="), "Héllo world");
        assert_eq!(
            decode_rfc2047("Re: =?iso-8859-1?q?caf=E9?= =?utf-8?B?IQ==?= ok"),
            "Re: café! ok"
        );
        assert_eq!(decode_rfc2047("=?bogus"), "=?bogus");
    }

    #[test]
    fn charset_fallback() {
        assert_eq!(decode_charset(&[0x63, 0x61, 0x66, 0xE9], "latin1"), "café");
        assert_eq!(decode_charset(b"plain", "x-unknown"), "plain");
        assert_eq!(decode_charset(&[0xFF], "utf-8"), "\u{FFFD}");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quoted_printable_round_trips(
                data in proptest::collection::vec(any::<u8>(), 0..400)
            ) {
                // Line breaks are normalized to CRLF, so compare without them.
                let input: Vec<u8> =
                    data.iter().copied().filter(|b| *b != b'\n' && *b != b'\r').collect();
                let encoded = encode_quoted_printable(&input);
                prop_assert!(encoded.split("\r\n").all(|l| l.len() <= MAX_LINE_LENGTH));
                prop_assert_eq!(decode_quoted_printable(encoded.as_bytes()), input);
            }

            #[test]
            fn rfc2047_round_trips(text in "\\PC{0,80}") {
                prop_assert_eq!(decode_rfc2047(&encode_rfc2047(&text)), text);
            }
        }
    }
}
