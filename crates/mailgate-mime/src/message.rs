//! Parsing of raw MIME messages.

use std::fmt;

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Multipart nesting deeper than this is rejected.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` value. Unknown values are treated as 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One MIME entity: headers, raw body, and child parts when multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw (still transfer-encoded) body. Empty for multipart entities.
    pub body: Vec<u8>,
    /// Child parts of a multipart entity.
    pub parts: Vec<Part>,
}

impl Part {
    /// Parses an entity from raw bytes, descending into multipart bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart entity has no boundary, contains no
    /// parts, or nests too deeply.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        parse_entity(raw, 0)
    }

    /// The content type, defaulting to `text/plain; charset=us-ascii` when
    /// missing or unparseable (RFC 2045 section 5.2).
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or_else(|| {
                ContentType::new("text", "plain").with_parameter("charset", "us-ascii")
            })
    }

    /// The content disposition, if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns true if this entity has child parts.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if a Base64 body is malformed.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Decodes the body to text using the declared charset, replacing
    /// undecodable bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer encoding cannot be undone.
    pub fn body_text(&self) -> Result<String> {
        let bytes = self.decode_body()?;
        let content_type = self.content_type();
        Ok(decode_charset(&bytes, content_type.charset().unwrap_or("utf-8")))
    }

    /// The attachment file name from `Content-Disposition`, else the
    /// content type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| self.content_type().parameter("name").map(str::to_string))
            .filter(|name| !name.is_empty())
    }

    /// Returns true for leaves that are attachments rather than body text.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        !self.is_multipart()
            && (self.disposition().is_some_and(|d| d.is_attachment()) || self.filename().is_some())
    }

    /// Leaf entities in depth-first order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(part: &'a Part, out: &mut Vec<&'a Part>) {
    if part.parts.is_empty() {
        out.push(part);
    } else {
        for child in &part.parts {
            collect_leaves(child, out);
        }
    }
}

/// Splits raw bytes at the first empty line into header text and body.
fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[], &raw[1..]);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n").map(|i| (i, i + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((end, start)) => (&raw[..end], &raw[start..]),
        None => (raw, &[]),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_entity(raw: &[u8], depth: usize) -> Result<Part> {
    let (header_bytes, body) = split_header_body(raw);
    let headers = Headers::parse(&String::from_utf8_lossy(header_bytes));

    let content_type = headers
        .get("content-type")
        .and_then(|v| ContentType::parse(v).ok());
    let Some(content_type) = content_type.filter(ContentType::is_multipart) else {
        // A top-level leaf ends with the message terminator; nested leaves
        // already lost theirs to the delimiter.
        let body = if depth == 0 {
            strip_trailing_newline(body)
        } else {
            body
        };
        return Ok(Part {
            headers,
            body: body.to_vec(),
            parts: Vec::new(),
        });
    };

    if depth >= MAX_DEPTH {
        return Err(Error::InvalidMultipart("nesting too deep".into()));
    }
    let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
    let parts = split_multipart(body, boundary)?
        .into_iter()
        .map(|chunk| parse_entity(chunk, depth + 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(Part {
        headers,
        body: Vec::new(),
        parts,
    })
}

/// Splits a multipart body into the raw bytes of each part.
///
/// The line break before a delimiter belongs to the delimiter. A missing
/// close delimiter ends the last part at the end of the body.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<&'a [u8]>> {
    let delimiter = format!("--{boundary}");
    let close = format!("--{boundary}--");
    let mut chunks = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut offset = 0;

    while offset < body.len() {
        let line_end = body[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| offset + i + 1);
        let line = String::from_utf8_lossy(&body[offset..line_end]);
        let line = line.trim_end();

        let is_close = line == close;
        if is_close || line == delimiter {
            if let Some(start) = part_start {
                chunks.push(strip_trailing_newline(&body[start..offset]));
            }
            if is_close {
                part_start = None;
                break;
            }
            part_start = Some(line_end);
        }
        offset = line_end;
    }

    if let Some(start) = part_start {
        chunks.push(&body[start.min(body.len())..]);
    }
    if chunks.is_empty() {
        return Err(Error::InvalidMultipart(format!(
            "no parts delimited by boundary {boundary:?}"
        )));
    }
    Ok(chunks)
}

fn strip_trailing_newline(chunk: &[u8]) -> &[u8] {
    chunk
        .strip_suffix(b"\r\n")
        .or_else(|| chunk.strip_suffix(b"\n"))
        .unwrap_or(chunk)
}

/// A decoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name, `"attachment"` when the part names none.
    pub filename: String,
    /// `type/subtype` of the part.
    pub mime_type: String,
    /// Decoded content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Size of the decoded content in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A parsed message: the top-level entity plus convenience accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a complete RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the multipart structure is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Part::parse(raw).map(|root| Self { root })
    }

    /// The top-level entity.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Decoded `Subject` header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers().get("subject").map(decode_rfc2047)
    }

    /// Decoded `From` header.
    #[must_use]
    pub fn from(&self) -> Option<String> {
        self.headers().get("from").map(decode_rfc2047)
    }

    /// Raw `Date` header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.headers().get("date")
    }

    /// Text of the first `text/plain` body part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part's transfer encoding is malformed.
    pub fn text_body(&self) -> Result<Option<String>> {
        self.first_body("plain")
    }

    /// Text of the first `text/html` body part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part's transfer encoding is malformed.
    pub fn html_body(&self) -> Result<Option<String>> {
        self.first_body("html")
    }

    fn first_body(&self, sub_type: &str) -> Result<Option<String>> {
        self.root
            .leaves()
            .into_iter()
            .find(|p| !p.is_attachment() && p.content_type().is("text", sub_type))
            .map(Part::body_text)
            .transpose()
    }

    /// Every attachment leaf, decoded, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment's transfer encoding is malformed.
    pub fn attachments(&self) -> Result<Vec<Attachment>> {
        self.root
            .leaves()
            .into_iter()
            .filter(|p| p.is_attachment())
            .map(|p| {
                Ok(Attachment {
                    filename: p.filename().unwrap_or_else(|| "attachment".to_string()),
                    mime_type: p.content_type().mime_type(),
                    data: p.decode_body()?,
                })
            })
            .collect()
    }
}
