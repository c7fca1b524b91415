//! Response data types.

use crate::types::{Capability, Flag, ListResponse, Quota, ResponseCode, SeqNum};

/// FETCH response item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// Message flags.
    Flags(Vec<Flag>),
    /// Internal date, verbatim.
    InternalDate(String),
    /// RFC822.SIZE.
    Rfc822Size(u32),
    /// UID.
    Uid(u32),
    /// `BODY[section]<origin>` (or `RFC822`, reported with an empty section).
    Body {
        /// Section specifier; empty for the whole message.
        section: String,
        /// Partial origin offset.
        origin: Option<u32>,
        /// Section content, `None` for NIL.
        data: Option<Vec<u8>>,
    },
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// Untagged OK.
    Ok {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged NO (warning).
    No {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged BAD.
    Bad {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Pre-authenticated greeting.
    PreAuth {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server is closing the connection.
    Bye {
        /// Response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// CAPABILITY data.
    Capability(Vec<Capability>),
    /// Flags defined in the selected mailbox.
    Flags(Vec<Flag>),
    /// One LIST line.
    List(ListResponse),
    /// SEARCH hits.
    Search(Vec<SeqNum>),
    /// Message count.
    Exists(u32),
    /// Recent count.
    Recent(u32),
    /// A message was expunged.
    Expunge(SeqNum),
    /// FETCH data for one message.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// QUOTA data.
    Quota(Quota),
    /// QUOTAROOT data.
    QuotaRoot {
        /// Mailbox queried.
        mailbox: String,
        /// Quota roots of the mailbox.
        roots: Vec<String>,
    },
    /// Untagged data this client does not interpret, by keyword.
    Other(String),
}
