//! Construction and serialization of outgoing MIME documents.

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{encode_base64_lines, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::TransferEncoding;

/// Longest line allowed in a 7bit body (RFC 5322 section 2.1.1).
const MAX_7BIT_LINE: usize = 998;

/// Random characters in a generated boundary.
const BOUNDARY_RANDOM_LEN: usize = 24;

/// Generates a multipart boundary that cannot occur in Base64 or
/// Quoted-Printable output (`=_` starts every boundary).
#[must_use]
pub fn generate_boundary() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("=_mailgate_{random}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Body {
    /// Already transfer-encoded ASCII text.
    Leaf(String),
    Multipart { boundary: String, parts: Vec<Entity> },
}

/// One outgoing MIME entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    headers: Headers,
    body: Body,
}

impl Entity {
    /// A UTF-8 text entity of type `text/<subtype>`.
    ///
    /// Line endings are normalized to CRLF. Pure ASCII with short lines is
    /// sent as 7bit, anything else as quoted-printable.
    #[must_use]
    pub fn text(subtype: &str, text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n").replace('\n', "\r\n");
        let plain = normalized.is_ascii()
            && normalized
                .split("\r\n")
                .all(|line| line.len() <= MAX_7BIT_LINE && !line.contains('\r'));

        let (encoding, body) = if plain {
            (TransferEncoding::SevenBit, normalized)
        } else {
            (
                TransferEncoding::QuotedPrintable,
                encode_quoted_printable(normalized.as_bytes()),
            )
        };

        let content_type = ContentType::new("text", subtype).with_parameter("charset", "utf-8");
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", encoding.to_string());
        Self {
            headers,
            body: Body::Leaf(body),
        }
    }

    /// A Base64 attachment entity.
    ///
    /// `mime_type` defaults to `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name is empty or the MIME type cannot be
    /// parsed.
    pub fn attachment(filename: &str, mime_type: Option<&str>, data: &[u8]) -> Result<Self> {
        if filename.trim().is_empty() {
            return Err(Error::MissingFilename);
        }
        let content_type = match mime_type.map(str::trim) {
            None | Some("") => ContentType::octet_stream(),
            Some(value) => ContentType::parse(value)?,
        }
        .with_parameter("name", filename);

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add(
            "Content-Disposition",
            ContentDisposition::attachment(filename).to_string(),
        );
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        Ok(Self {
            headers,
            body: Body::Leaf(encode_base64_lines(data)),
        })
    }

    /// A `multipart/<subtype>` entity with a freshly generated boundary.
    #[must_use]
    pub fn multipart(subtype: &str, parts: Vec<Self>) -> Self {
        Self::multipart_with_boundary(subtype, generate_boundary(), parts)
    }

    /// A `multipart/<subtype>` entity with a caller-chosen boundary.
    #[must_use]
    pub fn multipart_with_boundary(subtype: &str, boundary: String, parts: Vec<Self>) -> Self {
        let content_type =
            ContentType::new("multipart", subtype).with_parameter("boundary", boundary.clone());
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        Self {
            headers,
            body: Body::Multipart { boundary, parts },
        }
    }

    /// Entity headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Child entities; empty for leaves.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Leaf(_) => &[],
            Body::Multipart { parts, .. } => parts,
        }
    }

    fn write_body(&self, out: &mut String) {
        match &self.body {
            Body::Leaf(text) => out.push_str(text),
            Body::Multipart { boundary, parts } => {
                for part in parts {
                    out.push_str("--");
                    out.push_str(boundary);
                    out.push_str("\r\n");
                    part.write(out);
                    // The CRLF before a delimiter belongs to the delimiter.
                    out.push_str("\r\n");
                }
                out.push_str("--");
                out.push_str(boundary);
                out.push_str("--\r\n");
            }
        }
    }

    fn write(&self, out: &mut String) {
        out.push_str(&self.headers.to_string());
        out.push_str("\r\n");
        self.write_body(out);
    }
}

/// A complete message: top-level headers plus the root entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeDocument {
    headers: Headers,
    root: Entity,
}

impl MimeDocument {
    /// Creates a document from message headers and a root entity.
    ///
    /// The root entity's own headers (`Content-Type` and friends) are
    /// written after the message headers.
    #[must_use]
    pub const fn new(headers: Headers, root: Entity) -> Self {
        Self { headers, root }
    }

    /// Message headers, excluding the root entity's content headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable message headers.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The root entity.
    #[must_use]
    pub const fn root(&self) -> &Entity {
        &self.root
    }

    /// Serializes the document with CRLF line endings, ending in CRLF.
    ///
    /// A single-part body is followed by one terminating CRLF that is not
    /// part of the body; [`Message::parse`](crate::Message::parse) strips it.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.headers.to_string();
        self.root.write(&mut out);
        if matches!(self.root.body, Body::Leaf(_)) {
            out.push_str("\r\n");
        }
        out.into_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn document(root: Entity) -> MimeDocument {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("Subject", "Hello");
        headers.add("MIME-Version", "1.0");
        MimeDocument::new(headers, root)
    }

    #[test]
    fn test_boundary_is_random_and_safe() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("=_mailgate_"));
        assert_eq!(a.len(), "=_mailgate_".len() + BOUNDARY_RANDOM_LEN);
    }

    #[test]
    fn test_ascii_text_is_7bit() {
        let entity = Entity::text("plain", "Hello\nWorld");
        assert_eq!(entity.headers().get("Content-Transfer-Encoding"), Some("7bit"));

        let bytes = document(entity).to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("\r\n\r\nHello\r\nWorld\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_non_ascii_text_is_quoted_printable() {
        let entity = Entity::text("plain", "Grüße\r\n");
        assert_eq!(
            entity.headers().get("Content-Transfer-Encoding"),
            Some("quoted-printable")
        );
        assert_eq!(
            entity.headers().get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );

        let message = Message::parse(&document(entity).to_bytes()).unwrap();
        assert_eq!(message.text_body().unwrap().as_deref(), Some("Grüße\r\n"));
    }

    #[test]
    fn test_long_line_is_quoted_printable() {
        let entity = Entity::text("plain", &"x".repeat(1200));
        assert_eq!(
            entity.headers().get("Content-Transfer-Encoding"),
            Some("quoted-printable")
        );
    }

    #[test]
    fn test_attachment_headers() {
        let entity = Entity::attachment("report.pdf", Some("application/pdf"), b"%PDF").unwrap();
        assert_eq!(
            entity.headers().get("Content-Type"),
            Some("application/pdf; name=report.pdf")
        );
        assert_eq!(
            entity.headers().get("Content-Disposition"),
            Some("attachment; filename=report.pdf")
        );

        let entity = Entity::attachment("blob", None, b"").unwrap();
        assert!(
            entity
                .headers()
                .get("Content-Type")
                .unwrap()
                .starts_with("application/octet-stream")
        );

        assert!(Entity::attachment("", None, b"x").is_err());
        assert!(Entity::attachment("a.bin", Some("garbage"), b"x").is_err());
    }

    #[test]
    fn test_mixed_document_round_trips_through_parser() {
        let data: Vec<u8> = (0..=255).collect();
        let root = Entity::multipart(
            "mixed",
            vec![
                Entity::multipart(
                    "alternative",
                    vec![
                        Entity::text("plain", "Hello"),
                        Entity::text("html", "<p>Hello</p>"),
                    ],
                ),
                Entity::attachment("Übersicht.bin", Some("application/octet-stream"), &data)
                    .unwrap(),
            ],
        );
        assert_eq!(root.parts().len(), 2);

        let bytes = document(root).to_bytes();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.lines().all(|l| l.len() <= 78));

        let message = Message::parse(&bytes).unwrap();
        assert_eq!(message.subject().as_deref(), Some("Hello"));
        assert_eq!(message.text_body().unwrap().as_deref(), Some("Hello"));
        assert_eq!(message.html_body().unwrap().as_deref(), Some("<p>Hello</p>"));

        let attachments = message.attachments().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "Übersicht.bin");
        assert_eq!(attachments[0].data, data);
    }

    #[test]
    fn test_fixed_boundary_output() {
        let root = Entity::multipart_with_boundary(
            "alternative",
            "b1".to_string(),
            vec![Entity::text("plain", "a"), Entity::text("html", "b")],
        );
        let text = String::from_utf8(MimeDocument::new(Headers::new(), root).to_bytes()).unwrap();
        assert_eq!(
            text,
            "Content-Type: multipart/alternative; boundary=b1\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: 7bit\r\n\
\r\n\
a\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
Content-Transfer-Encoding: 7bit\r\n\
\r\n\
b\r\n\
--b1--\r\n"
        );
    }
}
