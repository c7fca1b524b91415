//! # mailgate-smtp
//!
//! Async SMTP submission client (RFC 5321) used by the mail gateway.
//!
//! ## Features
//!
//! - **Type-state sessions**: the compiler rejects `DATA` before a recipient
//!   was accepted, or `RCPT TO` outside a mail transaction
//! - **Per-recipient outcomes**: a rejected `RCPT TO` hands the session back
//!   instead of tearing it down, so partial delivery can be reported
//! - **TLS**: implicit TLS and STARTTLS via rustls with webpki roots
//! - **Authentication**: `AUTH PLAIN` and `AUTH LOGIN`, picked from the EHLO advertisement
//! - **Extensions**: SIZE is honoured before the envelope is opened
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgate_smtp::{Address, Client, RcptOutcome};
//! use mailgate_smtp::connection::connect;
//!
//! # async fn run() -> mailgate_smtp::Result<()> {
//! let stream = connect("smtp.example.com", 587).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.ehlo("gateway.example.com").await?;
//! let client = client.starttls("smtp.example.com").await?;
//! let client = client.login("user@example.com", "secret").await?;
//!
//! let message = b"Subject: Test\r\n\r\nHello\r\n";
//! let client = client
//!     .mail_from(Address::new("user@example.com")?, Some(message.len()))
//!     .await?;
//! let client = match client.rcpt_to(Address::new("friend@example.org")?).await? {
//!     RcptOutcome::Accepted(client) => client,
//!     RcptOutcome::Rejected { reply, .. } => panic!("rejected: {reply:?}"),
//! };
//! let client = client.data().await?.send_message(message).await?;
//! client.quit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Session States
//!
//! ```text
//! Connected ── login() ──→ Authenticated
//!     │                          │
//!     └──── mail_from() ─────────┴──→ MailTransaction
//!                                          │
//!                                      rcpt_to()
//!                                          ↓
//!                        Data ←── data() ── RecipientAdded
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RcptOutcome, RecipientAdded,
    ServerInfo, SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
