//! Command serialization helpers.

use crate::types::{Flag, Mailbox};
use crate::{Error, Result};

use super::types::{FetchAttribute, FetchItems, SearchCriteria, StoreAction};

/// Writes an astring, quoting when the text is not a plain atom.
///
/// CR and LF cannot be carried by a quoted string and are refused.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::Protocol(
            "line breaks are not allowed in command arguments".to_string(),
        ));
    }
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
    Ok(())
}

/// Writes a mailbox name in its modified UTF-7 wire form.
///
/// Control characters would survive the UTF-7 step as an encoded run, so
/// they are refused on the raw name.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) -> Result<()> {
    if mailbox.as_str().chars().any(char::is_control) {
        return Err(Error::Protocol(
            "control characters are not allowed in mailbox names".to_string(),
        ));
    }
    write_astring(buf, &mailbox.encoded())
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized flag list.
pub fn write_flag_list(buf: &mut Vec<u8>, flags: &[Flag]) {
    buf.push(b'(');
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes FETCH items.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::Fast => buf.extend_from_slice(b"FAST"),
        FetchItems::Items(attrs) => match attrs.as_slice() {
            [single] => write_fetch_attribute(buf, single),
            _ => {
                buf.push(b'(');
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    write_fetch_attribute(buf, attr);
                }
                buf.push(b')');
            }
        },
    }
}

fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Body { section, peek } => {
            let prefix: &[u8] = if *peek { b"BODY.PEEK[" } else { b"BODY[" };
            buf.extend_from_slice(prefix);
            if let Some(s) = section {
                buf.extend_from_slice(s.as_bytes());
            }
            buf.push(b']');
        }
    }
}

/// Writes a STORE data item.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    let (prefix, flags) = match action {
        StoreAction::SetFlags(f) => ("FLAGS", f),
        StoreAction::AddFlags(f) => ("+FLAGS", f),
        StoreAction::RemoveFlags(f) => ("-FLAGS", f),
    };
    buf.extend_from_slice(prefix.as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.push(b' ');
    write_flag_list(buf, flags);
}

/// Writes SEARCH criteria.
pub fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Seen => buf.extend_from_slice(b"SEEN"),
        SearchCriteria::Unseen => buf.extend_from_slice(b"UNSEEN"),
        SearchCriteria::Deleted => buf.extend_from_slice(b"DELETED"),
        SearchCriteria::Undeleted => buf.extend_from_slice(b"UNDELETED"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn atoms_are_bare() {
        assert_eq!(astring("alice@example.com"), "alice@example.com");
        assert_eq!(astring("INBOX"), "INBOX");
    }

    #[test]
    fn specials_are_quoted() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("p\"w\\d"), "\"p\\\"w\\\\d\"");
        assert_eq!(astring("*"), "\"*\"");
        assert_eq!(astring("pässword"), "\"pässword\"");
    }

    #[test]
    fn line_breaks_are_refused() {
        let mut buf = Vec::new();
        assert!(write_astring(&mut buf, "evil\r\nA1 DELETE INBOX").is_err());
    }

    #[test]
    fn mailbox_uses_wire_form() {
        let mut buf = Vec::new();
        write_mailbox(&mut buf, &Mailbox::new("Entwürfe")).unwrap();
        assert_eq!(buf, b"Entw&APw-rfe");
    }

    #[test]
    fn mailbox_control_characters_are_refused() {
        let mut buf = Vec::new();
        assert!(write_mailbox(&mut buf, &Mailbox::new("Inbox\tOld")).is_err());
        assert!(write_mailbox(&mut buf, &Mailbox::new("x\r\nA0002 DELETE INBOX")).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn store_actions() {
        let mut buf = Vec::new();
        write_store_action(&mut buf, &StoreAction::AddFlags(vec![Flag::Seen]), true);
        assert_eq!(buf, b"+FLAGS.SILENT (\\Seen)");

        let mut buf = Vec::new();
        write_store_action(
            &mut buf,
            &StoreAction::RemoveFlags(vec![Flag::Seen, Flag::Flagged]),
            false,
        );
        assert_eq!(buf, b"-FLAGS (\\Seen \\Flagged)");
    }

    #[test]
    fn search_keys() {
        let mut buf = Vec::new();
        write_search_criteria(&mut buf, &SearchCriteria::Undeleted);
        assert_eq!(buf, b"UNDELETED");
    }

    #[test]
    fn fetch_items() {
        let mut buf = Vec::new();
        write_fetch_items(&mut buf, &FetchItems::full_message());
        assert_eq!(buf, b"BODY.PEEK[]");

        let mut buf = Vec::new();
        write_fetch_items(
            &mut buf,
            &FetchItems::Items(vec![FetchAttribute::Uid, FetchAttribute::Flags]),
        );
        assert_eq!(buf, b"(UID FLAGS)");
    }
}
