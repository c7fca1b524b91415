//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses a reply from its lines (CRLF already stripped).
///
/// Lines look like `250-text` for continuations and `250 text` (or a bare
/// `250`) for the final line. Every line must carry the same code.
///
/// # Errors
///
/// Returns a protocol error if there are no lines, a code is not three
/// digits, the separator is neither `-` nor space, or codes disagree.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("empty reply".into()));
    };
    let code = parse_code(first)?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::Protocol(format!(
                "reply code changed mid-reply: {line}"
            )));
        }
        match line.as_bytes().get(3) {
            None => message.push(String::new()),
            Some(b' ' | b'-') => message.push(line[4..].to_string()),
            Some(_) => return Err(Error::Protocol(format!("malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

fn parse_code(line: &str) -> Result<u16> {
    let digits = line
        .get(..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("invalid reply code: {line}")))?;
    digits
        .parse()
        .map_err(|_| Error::Protocol(format!("invalid reply code: {line}")))
}

/// Checks if a line ends a reply: `250 text` or a bare `250`.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() == 3 || (bytes.len() >= 4 && bytes[3] == b' ')
}
