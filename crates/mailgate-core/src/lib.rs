//! # mailgate-core
//!
//! Per-tenant email gateway: sends mail through a tenant's SMTP relay and
//! reads the tenant's mailboxes over IMAP.
//!
//! This crate provides:
//! - Tenant configuration and validation ([`TenantMailConfig`])
//! - Mail accounts, signatures and autoreply windows ([`MailAccount`])
//! - Per-call connections with guaranteed cleanup ([`ConnectionManager`])
//! - MIME composition ([`MessageComposer`]) and DKIM signing
//! - Sending ([`MailTransmitter`]), mailbox access ([`MailboxReader`])
//!   and quota reporting ([`QuotaInspector`])
//!
//! Every public operation maps failures onto [`GatewayError`], whose
//! [`ErrorClass`] tells the caller whether to retry.
//!
//! # Example
//!
//! ```no_run
//! use mailgate_core::{
//!     ConnectionManager, MailAccount, MailTransmitter, NetworkConnector, OutgoingMessage,
//!     TenantMailConfig,
//! };
//!
//! # async fn example(config: TenantMailConfig) -> mailgate_core::Result<()> {
//! let transmitter = MailTransmitter::new(ConnectionManager::new(NetworkConnector));
//! let account = MailAccount::new("registrar@uni.example").with_display_name("Registrar");
//! let message = OutgoingMessage::new("Timetable", "The new timetable is attached.")
//!     .to("student@uni.example");
//!
//! let report = transmitter.send(&config, &account, &message).await?;
//! println!("sent {} to {:?}", report.message_id, report.delivered);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod compose;
pub mod config;
pub mod connection;
mod error;
pub mod mailbox;
pub mod model;
pub mod quota;
pub mod transmit;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;

pub use account::{Autoreply, MailAccount, is_valid_address};
pub use compose::MessageComposer;
pub use config::{
    DEFAULT_MAX_ATTACHMENT_SIZE, DEFAULT_QUOTA_KB, DEFAULT_TIMEOUT_SECS, DkimSettings,
    ImapSettings, Security, SmtpSettings, TenantMailConfig, is_valid_domain,
};
pub use connection::{
    ConnectionManager, ImapConnector, ImapSession, NetworkConnector, SmtpConnector, SmtpDelivery,
    SmtpSession,
};
pub use error::{ErrorClass, GatewayError, OperationContext, RejectedRecipient, Result};
pub use mailbox::MailboxReader;
pub use model::{
    DeliveryReport, Folder, InboundAttachment, InboundMessage, OutgoingAttachment,
    OutgoingMessage, QuotaSnapshot,
};
pub use quota::QuotaInspector;
pub use transmit::{MailTransmitter, SIGNED_HEADERS};
