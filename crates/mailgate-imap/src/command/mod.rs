//! IMAP command builder.

mod serialize;
mod tag_generator;
mod types;

use crate::Result;
use crate::types::{Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchCriteria, StoreAction};

use serialize::{
    write_astring, write_fetch_items, write_mailbox, write_search_criteria, write_store_action,
};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY.
    Capability,
    /// LOGOUT.
    Logout,
    /// LOGIN.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT.
    Select {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// CREATE.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// LIST.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern, may contain `*` and `%`.
        pattern: String,
    },
    /// GETQUOTAROOT (RFC 2087).
    GetQuotaRoot {
        /// Mailbox whose roots are wanted.
        mailbox: Mailbox,
    },
    /// GETQUOTA (RFC 2087).
    GetQuota {
        /// Quota root name.
        root: String,
    },
    /// EXPUNGE.
    Expunge,
    /// SEARCH.
    Search {
        /// Search keys.
        criteria: SearchCriteria,
    },
    /// FETCH.
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Data items.
        items: FetchItems,
    },
    /// STORE.
    Store {
        /// Messages to update.
        sequence: SequenceSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH echo.
        silent: bool,
    },
    /// COPY.
    Copy {
        /// Messages to copy.
        sequence: SequenceSet,
        /// Destination.
        mailbox: Mailbox,
    },
}

impl Command {
    /// Serializes the command with its tag and trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Protocol`] when an argument contains a line break.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Create { mailbox } => {
                buf.extend_from_slice(b"CREATE ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Delete { mailbox } => {
                buf.extend_from_slice(b"DELETE ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference)?;
                buf.push(b' ');
                write_astring(&mut buf, pattern)?;
            }

            Self::GetQuotaRoot { mailbox } => {
                buf.extend_from_slice(b"GETQUOTAROOT ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::GetQuota { root } => {
                buf.extend_from_slice(b"GETQUOTA ");
                write_astring(&mut buf, root)?;
            }

            Self::Search { criteria } => {
                buf.extend_from_slice(b"SEARCH ");
                write_search_criteria(&mut buf, criteria);
            }

            Self::Fetch { sequence, items } => {
                buf.extend_from_slice(b"FETCH ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }

            Self::Store {
                sequence,
                action,
                silent,
            } => {
                buf.extend_from_slice(b"STORE ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(&mut buf, action, *silent);
            }

            Self::Copy { sequence, mailbox } => {
                buf.extend_from_slice(b"COPY ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_mailbox(&mut buf, mailbox)?;
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Command name for logging; never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::List { .. } => "LIST",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::GetQuota { .. } => "GETQUOTA",
            Self::Expunge => "EXPUNGE",
            Self::Search { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
            Self::Copy { .. } => "COPY",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Flag, SeqNum};

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001").unwrap()).unwrap()
    }

    #[test]
    fn login_quotes_password() {
        let cmd = Command::Login {
            username: "alice@example.com".to_string(),
            password: "s3cret pass".to_string(),
        };
        assert_eq!(wire(&cmd), "A0001 LOGIN alice@example.com \"s3cret pass\"\r\n");
        assert_eq!(cmd.name(), "LOGIN");
    }

    #[test]
    fn select_and_copy_encode_mailbox() {
        let cmd = Command::Select {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(wire(&cmd), "A0001 SELECT INBOX\r\n");

        let cmd = Command::Copy {
            sequence: SequenceSet::range(2, 4).unwrap(),
            mailbox: Mailbox::new("Entwürfe"),
        };
        assert_eq!(wire(&cmd), "A0001 COPY 2:4 Entw&APw-rfe\r\n");
    }

    #[test]
    fn list_all() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".to_string(),
        };
        assert_eq!(wire(&cmd), "A0001 LIST \"\" \"*\"\r\n");
    }

    #[test]
    fn quota_commands() {
        let cmd = Command::GetQuotaRoot {
            mailbox: Mailbox::inbox(),
        };
        assert_eq!(wire(&cmd), "A0001 GETQUOTAROOT INBOX\r\n");

        let cmd = Command::GetQuota {
            root: String::new(),
        };
        assert_eq!(wire(&cmd), "A0001 GETQUOTA \"\"\r\n");
    }

    #[test]
    fn selected_state_commands() {
        let set = SequenceSet::from_numbers(&[SeqNum::new(1).unwrap(), SeqNum::new(3).unwrap()])
            .unwrap();

        let cmd = Command::Search {
            criteria: SearchCriteria::Unseen,
        };
        assert_eq!(wire(&cmd), "A0001 SEARCH UNSEEN\r\n");

        let cmd = Command::Fetch {
            sequence: set.clone(),
            items: FetchItems::full_message(),
        };
        assert_eq!(wire(&cmd), "A0001 FETCH 1,3 BODY.PEEK[]\r\n");

        let cmd = Command::Store {
            sequence: set,
            action: StoreAction::AddFlags(vec![Flag::Deleted]),
            silent: true,
        };
        assert_eq!(wire(&cmd), "A0001 STORE 1,3 +FLAGS.SILENT (\\Deleted)\r\n");

        assert_eq!(wire(&Command::Expunge), "A0001 EXPUNGE\r\n");
    }

    #[test]
    fn injected_line_break_is_refused() {
        let cmd = Command::Create {
            mailbox: Mailbox::new("x\r\nA0002 DELETE INBOX"),
        };
        assert!(cmd.serialize("A0001").is_err());
    }
}
