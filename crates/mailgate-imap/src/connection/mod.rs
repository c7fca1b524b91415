//! IMAP connection management.
//!
//! - TLS/plaintext stream abstraction
//! - Framed, literal-aware I/O
//! - Type-state client

mod client;
mod framed;
mod stream;

pub use client::{Authenticated, Client, MailboxAccess, NotAuthenticated, Selected};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};
