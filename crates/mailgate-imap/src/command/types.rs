//! Command argument types.

use crate::types::Flag;

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// `FAST` macro (FLAGS INTERNALDATE RFC822.SIZE).
    Fast,
    /// Explicit list of attributes.
    Items(Vec<FetchAttribute>),
}

impl FetchItems {
    /// The whole raw message without setting `\Seen`: `BODY.PEEK[]`.
    #[must_use]
    pub fn full_message() -> Self {
        Self::Items(vec![FetchAttribute::Body {
            section: None,
            peek: true,
        }])
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// Internal date.
    InternalDate,
    /// RFC822 size.
    Rfc822Size,
    /// UID.
    Uid,
    /// Body section.
    Body {
        /// Section specifier; `None` for the whole message.
        section: Option<String>,
        /// Use `BODY.PEEK`, which leaves `\Seen` untouched.
        peek: bool,
    },
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Replace flags.
    SetFlags(Vec<Flag>),
    /// Add flags.
    AddFlags(Vec<Flag>),
    /// Remove flags.
    RemoveFlags(Vec<Flag>),
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with `\Seen`.
    Seen,
    /// Messages without `\Seen`.
    Unseen,
    /// Messages with `\Deleted`.
    Deleted,
    /// Messages without `\Deleted`.
    Undeleted,
}
