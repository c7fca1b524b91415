//! Relaxed canonicalization (RFC 6376 section 3.4).

/// A raw header field as it appears in the message, folding included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader<'a> {
    /// Field name as written.
    pub name: &'a str,
    /// Everything after the colon, including folding line breaks.
    pub value: &'a str,
}

/// Splits a message into raw header fields and the body.
///
/// The header block ends at the first empty line. Both CRLF and bare LF
/// line endings are accepted. Lines that are neither a field nor a
/// continuation are ignored.
#[must_use]
pub fn split_message(message: &[u8]) -> (Vec<RawHeader<'_>>, &[u8]) {
    let (header_end, body_start) = header_boundary(message);
    // Header bytes are expected to be ASCII; anything else is not signable
    // anyway, so invalid UTF-8 ends the header block early.
    let header_text = match std::str::from_utf8(&message[..header_end]) {
        Ok(text) => text,
        Err(err) => std::str::from_utf8(&message[..err.valid_up_to()]).unwrap_or_default(),
    };

    let mut fields: Vec<RawHeader<'_>> = Vec::new();
    let mut offset = 0;
    let mut current: Option<(usize, usize, usize)> = None; // (start, colon, end)

    for line in header_text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        if line.starts_with([' ', '\t']) {
            if let Some(field) = current.as_mut() {
                field.2 = offset;
            }
            continue;
        }
        if let Some((s, colon, end)) = current.take() {
            fields.push(raw_field(header_text, s, colon, end));
        }
        if let Some(colon) = line.find(':') {
            current = Some((start, start + colon, offset));
        }
    }
    if let Some((s, colon, end)) = current {
        fields.push(raw_field(header_text, s, colon, end));
    }

    (fields, &message[body_start..])
}

fn raw_field(text: &str, start: usize, colon: usize, end: usize) -> RawHeader<'_> {
    RawHeader {
        name: &text[start..colon],
        value: &text[colon + 1..end],
    }
}

fn header_boundary(message: &[u8]) -> (usize, usize) {
    let mut offset = 0;
    while offset < message.len() {
        let line_end = message[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(message.len(), |i| offset + i + 1);
        let line = &message[offset..line_end];
        if line == b"\r\n" || line == b"\n" {
            return (offset, line_end);
        }
        offset = line_end;
    }
    (message.len(), message.len())
}

/// Canonicalizes one header field: lower-case name, unfolded value with
/// whitespace runs collapsed and trimmed, `name:value` with CRLF.
#[must_use]
pub fn relaxed_header(name: &str, value: &str) -> String {
    let mut out = name.trim().to_ascii_lowercase();
    out.push(':');
    out.push_str(&collapse_whitespace(value));
    out.push_str("\r\n");
    out
}

fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.chars() {
        if matches!(ch, ' ' | '\t' | '\r' | '\n') {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }
    }
    out
}

/// Canonicalizes a body: trailing whitespace removed from each line,
/// whitespace runs collapsed, trailing empty lines dropped, and a final
/// CRLF ensured on non-empty bodies. Bare LF line endings become CRLF.
#[must_use]
pub fn relaxed_body(body: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let (line, next) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        lines.push(collapse_line(line));
        rest = next;
    }

    while lines.last().is_some_and(Vec::is_empty) {
        lines.pop();
    }

    let mut out = Vec::with_capacity(body.len());
    for line in lines {
        out.extend_from_slice(&line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

fn collapse_line(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut pending_space = false;
    for &byte in line {
        if byte == b' ' || byte == b'\t' {
            pending_space = true;
        } else {
            if pending_space {
                out.push(b' ');
            }
            pending_space = false;
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_header_examples() {
        // RFC 6376 section 3.4.5
        assert_eq!(relaxed_header("A", " X"), "a:X\r\n");
        assert_eq!(relaxed_header("B ", " Y\t\r\n\tZ  "), "b:Y Z\r\n");
        assert_eq!(relaxed_header("Subject", ""), "subject:\r\n");
    }

    #[test]
    fn relaxed_body_examples() {
        assert_eq!(relaxed_body(b" C \r\nD \t E\r\n\r\n\r\n"), b" C\r\nD E\r\n");
        assert_eq!(relaxed_body(b""), b"");
        assert_eq!(relaxed_body(b"\r\n\r\n"), b"");
        assert_eq!(relaxed_body(b"no newline"), b"no newline\r\n");
        assert_eq!(relaxed_body(b"lf\nonly\n"), b"lf\r\nonly\r\n");
    }

    #[test]
    fn split_message_keeps_folding() {
        let message = b"From: a@example.com\r\nSubject: one\r\n two\r\nX:\r\n\r\nbody\r\n";
        let (headers, body) = split_message(message);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].name, "From");
        assert_eq!(headers[1].value, " one\r\n two\r\n");
        assert_eq!(headers[2].name, "X");
        assert_eq!(body, b"body\r\n");
    }

    #[test]
    fn split_message_without_body() {
        let (headers, body) = split_message(b"Subject: hi\r\n");
        assert_eq!(headers.len(), 1);
        assert!(body.is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn body_canonicalization_is_idempotent(body in "[ a-z\t\r\n]{0,200}") {
                let once = relaxed_body(body.as_bytes());
                prop_assert_eq!(relaxed_body(&once), once);
            }

            #[test]
            fn folding_does_not_change_header_form(
                words in proptest::collection::vec("[a-z]{1,8}", 1..10)
            ) {
                let flat = words.join(" ");
                let folded = words.join("\r\n ");
                prop_assert_eq!(relaxed_header("X", &flat), relaxed_header("X", &folded));
            }
        }
    }
}
