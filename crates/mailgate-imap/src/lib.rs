//! # mailgate-imap
//!
//! An async IMAP4rev1 (RFC 3501) client covering what a mail gateway needs:
//! mailbox listing and management, search, full-message fetch, flag changes,
//! copy/expunge, and quota queries (RFC 2087).
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   IMAP state transitions (`NotAuthenticated` → `Authenticated` → `Selected`)
//! - **TLS via rustls**: Implicit TLS without an OpenSSL dependency
//! - **Sans-I/O parser**: Protocol parsing separated from network I/O
//! - **Modified UTF-7 mailbox names**: callers work with Unicode names only
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgate_imap::{Client, FetchItems, Mailbox, SearchCriteria, SequenceSet};
//!
//! #[tokio::main]
//! async fn main() -> mailgate_imap::Result<()> {
//!     let stream = mailgate_imap::connection::connect_tls("imap.example.com", 993).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.login("user@example.com", "password").await?;
//!
//!     let mut inbox = client.select(&Mailbox::inbox()).await?;
//!     let unseen = inbox.search(SearchCriteria::Unseen).await?;
//!     if let Some(set) = SequenceSet::from_numbers(&unseen) {
//!         let messages = inbox.fetch(&set, FetchItems::full_message()).await?;
//!         println!("fetched {}", messages.len());
//!     }
//!
//!     inbox.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    Authenticated    │ ─── select() ───→ Selected
//! └─────────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │      Selected       │ ─── close() ───→ Authenticated
//! └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: IMAP command builders and types
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Sans-I/O response parser
//! - [`types`]: Core IMAP types (flags, mailboxes, sequences, quota)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, FetchItems, SearchCriteria, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, FramedStream, ImapStream, MailboxAccess, NotAuthenticated, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, Quota,
    QuotaResource, QuotaRoot, ResponseCode, SeqNum, SequenceSet, Status, Tag,
};
