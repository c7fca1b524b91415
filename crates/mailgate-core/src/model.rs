//! Value objects passed in and out of gateway operations.

use mailgate_imap::{ListResponse, MailboxAttribute};
use serde::{Deserialize, Serialize};

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    /// File name shown to the recipient.
    pub name: String,
    /// MIME type; `application/octet-stream` when unset.
    pub mime_type: Option<String>,
    /// Raw content.
    pub data: Vec<u8>,
}

impl OutgoingAttachment {
    /// Creates an attachment.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            data: data.into(),
        }
    }
}

/// An email message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses; envelope only.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub text: String,
    /// Optional HTML alternative.
    pub html: Option<String>,
    /// Attachments in display order.
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingMessage {
    /// Creates a new outgoing message.
    #[must_use]
    pub fn new(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Sets the HTML alternative.
    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Appends an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: OutgoingAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Envelope recipients: to, cc then bcc, trimmed, without duplicates.
    ///
    /// Duplicates are detected case-insensitively; the first spelling wins.
    #[must_use]
    pub fn envelope_recipients(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let mut out = Vec::new();
        for addr in self.to.iter().chain(&self.cc).chain(&self.bcc) {
            let addr = addr.trim();
            if addr.is_empty() {
                continue;
            }
            let key = addr.to_ascii_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                out.push(addr.to_string());
            }
        }
        out
    }
}

/// An attachment extracted from a received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAttachment {
    /// File name.
    pub name: String,
    /// MIME type without parameters.
    pub mime_type: String,
    /// Decoded size in bytes.
    pub size: usize,
    /// Decoded content.
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// A message read from a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sequence number in the folder it was read from.
    pub id: String,
    /// Decoded subject.
    pub subject: String,
    /// Decoded `From` header.
    pub sender: String,
    /// `Date` header as sent.
    pub date: String,
    /// First plain text part.
    pub text_body: Option<String>,
    /// First HTML part.
    pub html_body: Option<String>,
    /// Attachments in message order.
    pub attachments: Vec<InboundAttachment>,
}

/// A mailbox folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Decoded full name.
    pub name: String,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Name attributes as sent, e.g. `\HasNoChildren`.
    pub attributes: Vec<String>,
}

impl Folder {
    /// Whether the folder can be selected.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| MailboxAttribute::parse(a) == MailboxAttribute::NoSelect)
    }
}

impl From<ListResponse> for Folder {
    fn from(list: ListResponse) -> Self {
        Self {
            name: list.mailbox.0,
            delimiter: list.delimiter,
            attributes: list
                .attributes
                .iter()
                .map(|a| a.as_str().to_string())
                .collect(),
        }
    }
}

/// Mailbox usage in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Used storage.
    pub used: u64,
    /// Storage limit.
    pub total: u64,
    /// Remaining storage, zero when over quota.
    pub available: u64,
    /// False when the numbers are defaults rather than server data.
    pub verified: bool,
}

impl QuotaSnapshot {
    /// Snapshot from server-reported usage and limit.
    #[must_use]
    pub const fn measured(used: u64, total: u64) -> Self {
        Self {
            used,
            total,
            available: total.saturating_sub(used),
            verified: true,
        }
    }

    /// Snapshot used when the server cannot report a quota.
    #[must_use]
    pub const fn unverified(default_total: u64) -> Self {
        Self {
            used: 0,
            total: default_total,
            available: default_total,
            verified: false,
        }
    }
}

/// Outcome of a send where every recipient was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Accepted envelope recipients.
    pub delivered: Vec<String>,
    /// `Message-ID` of the sent message.
    pub message_id: String,
}
