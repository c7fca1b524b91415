//! # mailgate-mime
//!
//! MIME message parsing and generation for the mail gateway.
//!
//! ## Features
//!
//! - **Message parsing**: nested multipart walking, body and attachment extraction
//! - **Message generation**: text, alternative and mixed documents with attachments
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header words, charsets
//! - **Headers**: ordered, case-preserving header lists with folding
//!
//! ## Parsing
//!
//! ```
//! use mailgate_mime::Message;
//!
//! let raw = b"From: sender@example.com\r\n\
//!             Subject: Test\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Test"));
//! assert_eq!(message.text_body()?.as_deref(), Some("Hello, World!"));
//! # Ok::<(), mailgate_mime::Error>(())
//! ```
//!
//! ## Building
//!
//! ```
//! use mailgate_mime::{Entity, Headers, MimeDocument};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "sender@example.com");
//! headers.add("Subject", "Report");
//!
//! let root = Entity::multipart(
//!     "mixed",
//!     vec![
//!         Entity::text("plain", "See attached."),
//!         Entity::attachment("report.csv", Some("text/csv"), b"a,b\n1,2\n")?,
//!     ],
//! );
//! let bytes = MimeDocument::new(headers, root).to_bytes();
//! assert!(bytes.ends_with(b"\r\n"));
//! # Ok::<(), mailgate_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{Entity, MimeDocument, generate_boundary};
pub use content_type::{ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::{Headers, format_mailbox};
pub use message::{Attachment, Message, Part, TransferEncoding};
