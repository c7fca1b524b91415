//! Core IMAP types (RFC 3501, with RFC 9051 and RFC 9208 additions).

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod quota;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::Flag;
pub use identifiers::{SeqNum, Tag};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use quota::{Quota, QuotaResource, QuotaRoot};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;
