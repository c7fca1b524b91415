//! Builds the MIME document for an outgoing message.

use chrono::{DateTime, Utc};
use mailgate_mime::encoding::{base64_len, encode_rfc2047};
use mailgate_mime::{Entity, Headers, MimeDocument, format_mailbox};
use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::account::MailAccount;
use crate::config::TenantMailConfig;
use crate::error::{GatewayError, Result};
use crate::model::OutgoingMessage;

/// Turns an [`OutgoingMessage`] into a [`MimeDocument`].
///
/// Layout: a single `text/plain` part when there is neither HTML nor an
/// attachment, `multipart/alternative` for text with HTML, and a
/// `multipart/mixed` wrapper whenever attachments are present. Bcc
/// recipients never appear in the headers.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    domain: String,
    max_attachment_size: usize,
}

impl MessageComposer {
    /// Creates a composer with explicit limits.
    #[must_use]
    pub fn new(domain: impl Into<String>, max_attachment_size: usize) -> Self {
        Self {
            domain: domain.into(),
            max_attachment_size,
        }
    }

    /// Composer using a tenant's domain and attachment limit.
    #[must_use]
    pub fn for_tenant(config: &TenantMailConfig) -> Self {
        Self::new(config.domain.clone(), config.max_attachment_size)
    }

    /// Composes `message` from `sender`, folding `signature` into the text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::EmptyMessage`] without a body,
    /// [`GatewayError::InvalidAttachment`] for an unnamed, empty or
    /// mistyped attachment, and [`GatewayError::AttachmentTooLarge`] when
    /// the encoded attachments exceed the limit.
    pub fn compose(
        &self,
        sender: &MailAccount,
        message: &OutgoingMessage,
        signature: Option<&str>,
    ) -> Result<MimeDocument> {
        self.compose_at(sender, message, signature, Utc::now())
    }

    /// Like [`MessageComposer::compose`] with a fixed `Date`.
    ///
    /// # Errors
    ///
    /// See [`MessageComposer::compose`].
    pub fn compose_at(
        &self,
        sender: &MailAccount,
        message: &OutgoingMessage,
        signature: Option<&str>,
        date: DateTime<Utc>,
    ) -> Result<MimeDocument> {
        let html = message.html.as_deref().filter(|h| !h.trim().is_empty());
        if message.text.trim().is_empty() && html.is_none() {
            return Err(GatewayError::EmptyMessage);
        }
        self.check_attachments(message)?;

        let text = match signature.map(str::trim_end).filter(|s| !s.is_empty()) {
            Some(signature) if message.text.is_empty() => signature.to_string(),
            Some(signature) => format!("{}\n\n{signature}", message.text.trim_end()),
            None => message.text.clone(),
        };

        let mut body = Entity::text("plain", &text);
        if let Some(html) = html {
            body = Entity::multipart("alternative", vec![body, Entity::text("html", html)]);
        }
        if !message.attachments.is_empty() {
            let mut parts = vec![body];
            for attachment in &message.attachments {
                let mime_type = attachment.mime_type.as_deref();
                let entity = Entity::attachment(&attachment.name, mime_type, &attachment.data)
                    .map_err(|e| {
                        GatewayError::InvalidAttachment(format!("{}: {e}", attachment.name))
                    })?;
                parts.push(entity);
            }
            body = Entity::multipart("mixed", parts);
        }

        Ok(MimeDocument::new(self.headers(sender, message, date), body))
    }

    fn check_attachments(&self, message: &OutgoingMessage) -> Result<()> {
        let mut encoded = 0usize;
        for attachment in &message.attachments {
            if attachment.name.trim().is_empty() {
                return Err(GatewayError::InvalidAttachment("attachment has no name".into()));
            }
            if attachment.data.is_empty() {
                return Err(GatewayError::InvalidAttachment(format!(
                    "{} is empty",
                    attachment.name
                )));
            }
            encoded = encoded.saturating_add(base64_len(attachment.data.len()));
        }

        if encoded > self.max_attachment_size {
            return Err(GatewayError::AttachmentTooLarge {
                size: encoded,
                limit: self.max_attachment_size,
            });
        }
        Ok(())
    }

    fn headers(
        &self,
        sender: &MailAccount,
        message: &OutgoingMessage,
        date: DateTime<Utc>,
    ) -> Headers {
        let mut headers = Headers::new();
        headers.add(
            "From",
            format_mailbox(sender.display_name.as_deref(), &sender.address),
        );
        let to = join_addresses(&message.to);
        if !to.is_empty() {
            headers.add("To", to);
        }
        let cc = join_addresses(&message.cc);
        if !cc.is_empty() {
            headers.add("Cc", cc);
        }
        headers.add("Subject", encode_rfc2047(&message.subject));
        headers.add("Date", date.to_rfc2822());
        headers.add("Message-ID", self.message_id());
        headers.add("MIME-Version", "1.0");
        headers
    }

    fn message_id(&self) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        format!("<{token}@{}>", self.domain)
    }
}

fn join_addresses(addresses: &[String]) -> String {
    addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use mailgate_mime::Message;

    use super::*;
    use crate::model::OutgoingAttachment;

    fn composer() -> MessageComposer {
        MessageComposer::new("uni.example", 1024 * 1024)
    }

    fn sender() -> MailAccount {
        MailAccount::new("alice@uni.example").with_display_name("Alice Martin")
    }

    fn reparse(doc: &MimeDocument) -> Message {
        Message::parse(&doc.to_bytes()).unwrap()
    }

    #[test]
    fn plain_text_only() {
        let message = OutgoingMessage::new("Hello", "Line one\nLine two").to("bob@x.example");
        let doc = composer().compose(&sender(), &message, None).unwrap();
        let parsed = reparse(&doc);

        assert!(!parsed.root().is_multipart());
        assert_eq!(parsed.text_body().unwrap().as_deref(), Some("Line one\r\nLine two"));
        assert_eq!(parsed.html_body().unwrap(), None);
        assert_eq!(parsed.from().as_deref(), Some("Alice Martin <alice@uni.example>"));
        assert_eq!(doc.headers().get("MIME-Version"), Some("1.0"));

        let id = doc.headers().get("Message-ID").unwrap();
        assert!(id.starts_with('<') && id.ends_with("@uni.example>"));
    }

    #[test]
    fn bodies_round_trip_exactly() {
        for text in ["Hello", "Line one\r\n", "Grüße\r\n\r\n", "trailing space "] {
            let single = OutgoingMessage::new("Exact", text).to("bob@x.example");
            let parsed = reparse(&composer().compose(&sender(), &single, None).unwrap());
            assert!(!parsed.root().is_multipart());
            assert_eq!(parsed.text_body().unwrap().as_deref(), Some(text), "single {text:?}");

            let alternative = single.clone().html("<p>x</p>\r\n");
            let parsed = reparse(&composer().compose(&sender(), &alternative, None).unwrap());
            assert!(parsed.root().is_multipart());
            assert_eq!(parsed.text_body().unwrap().as_deref(), Some(text), "multipart {text:?}");
            assert_eq!(parsed.html_body().unwrap().as_deref(), Some("<p>x</p>\r\n"));
        }
    }

    #[test]
    fn parts_survive_reparsing_in_order() {
        let message = OutgoingMessage::new("Report", "See attached.")
            .to("bob@x.example")
            .html("<p>See attached.</p>")
            .attach(OutgoingAttachment::new("a.pdf", Some("application/pdf"), b"%PDF-1.4".to_vec()))
            .attach(OutgoingAttachment::new("b.bin", None, vec![0, 1, 2, 255]));

        let doc = composer().compose(&sender(), &message, None).unwrap();
        let parsed = reparse(&doc);

        assert!(parsed.root().content_type().is("multipart", "mixed"));
        assert!(parsed.root().parts[0].content_type().is("multipart", "alternative"));
        assert_eq!(parsed.text_body().unwrap().as_deref(), Some("See attached."));
        assert_eq!(parsed.html_body().unwrap().as_deref(), Some("<p>See attached.</p>"));

        let attachments = parsed.attachments().unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].filename, "a.pdf");
        assert_eq!(attachments[0].mime_type, "application/pdf");
        assert_eq!(attachments[0].data, b"%PDF-1.4");
        assert_eq!(attachments[1].filename, "b.bin");
        assert_eq!(attachments[1].mime_type, "application/octet-stream");
        assert_eq!(attachments[1].data, vec![0, 1, 2, 255]);
    }

    #[test]
    fn signature_is_folded_into_text() {
        let message = OutgoingMessage::new("Hi", "Body text\n").to("bob@x.example");
        let doc = composer()
            .compose(&sender(), &message, Some("-- \nAlice\n"))
            .unwrap();
        assert_eq!(
            reparse(&doc).text_body().unwrap().as_deref(),
            Some("Body text\r\n\r\n-- \r\nAlice")
        );
    }

    #[test]
    fn bcc_is_not_written() {
        let message = OutgoingMessage::new("Hi", "Body")
            .to("bob@x.example")
            .to("carol@x.example")
            .cc("dave@x.example")
            .bcc("eve@x.example");
        let doc = composer().compose(&sender(), &message, None).unwrap();

        assert_eq!(doc.headers().get("To"), Some("bob@x.example, carol@x.example"));
        assert_eq!(doc.headers().get("Cc"), Some("dave@x.example"));
        assert!(!doc.headers().contains("Bcc"));
        assert!(!String::from_utf8(doc.to_bytes()).unwrap().contains("eve@"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let message = OutgoingMessage::new("Relevé de notes", "Body").to("bob@x.example");
        let doc = composer().compose(&sender(), &message, None).unwrap();

        assert!(doc.headers().get("Subject").unwrap().starts_with("=?utf-8?"));
        assert_eq!(reparse(&doc).subject().as_deref(), Some("Relevé de notes"));
    }

    #[test]
    fn fixed_date() {
        let date = Utc.with_ymd_and_hms(2024, 10, 1, 9, 30, 0).unwrap();
        let message = OutgoingMessage::new("Hi", "Body").to("bob@x.example");
        let doc = composer().compose_at(&sender(), &message, None, date).unwrap();
        let written = DateTime::parse_from_rfc2822(doc.headers().get("Date").unwrap()).unwrap();
        assert_eq!(written, date);
    }

    #[test]
    fn empty_message_is_refused() {
        let message = OutgoingMessage::new("Hi", "  ").to("bob@x.example");
        let err = composer().compose(&sender(), &message, Some("sig")).unwrap_err();
        assert!(matches!(err, GatewayError::EmptyMessage));

        let html_only = OutgoingMessage::new("Hi", "").html("<b>hi</b>");
        composer().compose(&sender(), &html_only, None).unwrap();
    }

    #[test]
    fn invalid_attachments_are_refused() {
        let unnamed = OutgoingMessage::new("Hi", "Body")
            .attach(OutgoingAttachment::new(" ", None, b"x".to_vec()));
        assert!(matches!(
            composer().compose(&sender(), &unnamed, None),
            Err(GatewayError::InvalidAttachment(_))
        ));

        let empty = OutgoingMessage::new("Hi", "Body")
            .attach(OutgoingAttachment::new("a.txt", None, Vec::new()));
        assert!(matches!(
            composer().compose(&sender(), &empty, None),
            Err(GatewayError::InvalidAttachment(_))
        ));

        let mistyped = OutgoingMessage::new("Hi", "Body").attach(OutgoingAttachment::new(
            "a.txt",
            Some("nonsense"),
            b"x".to_vec(),
        ));
        assert!(matches!(
            composer().compose(&sender(), &mistyped, None),
            Err(GatewayError::InvalidAttachment(_))
        ));
    }

    #[test]
    fn oversized_attachments_are_refused() {
        let composer = MessageComposer::new("uni.example", 1024 * 1024);
        let message = OutgoingMessage::new("Hi", "Body")
            .attach(OutgoingAttachment::new("big.bin", None, vec![0u8; 2 * 1024 * 1024]));

        let err = composer.compose(&sender(), &message, None).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::AttachmentTooLarge { size, limit: 1_048_576 } if size > 2 * 1024 * 1024
        ));
    }

    #[test]
    fn limit_counts_encoded_size() {
        // 3 raw bytes become 4 encoded ones.
        let composer = MessageComposer::new("uni.example", 4);
        let fits = OutgoingMessage::new("Hi", "Body")
            .attach(OutgoingAttachment::new("a", None, b"abc".to_vec()));
        composer.compose(&sender(), &fits, None).unwrap();

        let over = OutgoingMessage::new("Hi", "Body")
            .attach(OutgoingAttachment::new("a", None, b"abcd".to_vec()));
        assert!(matches!(
            composer.compose(&sender(), &over, None),
            Err(GatewayError::AttachmentTooLarge { size: 8, limit: 4 })
        ));
    }
}
