//! Bracketed response codes (RFC 3501 section 7.1).

use super::{Capability, Flag, SeqNum};

/// Response code carried by a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Text that must be shown to the user.
    Alert,
    /// Capability list, usually on the greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// Message could not be parsed by the server.
    Parse,
    /// Flags that can be changed permanently.
    PermanentFlags(Vec<Flag>),
    /// Mailbox selected read-only.
    ReadOnly,
    /// Mailbox selected read-write.
    ReadWrite,
    /// Target mailbox does not exist but may be created.
    TryCreate,
    /// Next UID to be assigned.
    UidNext(u32),
    /// Mailbox UIDVALIDITY.
    UidValidity(u32),
    /// First unseen message.
    Unseen(SeqNum),
    /// Operation would exceed a quota (RFC 9208).
    OverQuota,
    /// Anything else, by name.
    Unknown(String),
}
