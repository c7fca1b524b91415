//! MIME header handling.

use std::fmt;

use crate::encoding::{encode_rfc2047, needs_rfc2047};

/// Soft limit for folded header lines (RFC 5322 section 2.1.1).
const FOLD_WIDTH: usize = 78;

/// Ordered collection of header fields.
///
/// Field names keep their original case and order; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Sets a header, replacing every existing field of that name.
    ///
    /// The new field takes the position of the first replaced one, or is
    /// appended when none existed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(pos) => {
                self.fields[pos].1 = value;
                let mut index = 0;
                self.fields.retain(|(n, _)| {
                    let keep = index <= pos || !n.eq_ignore_ascii_case(&name);
                    index += 1;
                    keep
                });
            }
            None => self.fields.push((name, value)),
        }
    }

    /// Inserts a field before all others.
    pub fn prepend(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(0, (name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns true if a field with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Parses a header block.
    ///
    /// Folded continuation lines are unfolded. Parsing stops at the first
    /// empty line; lines without a colon are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some(field) = current.take() {
                headers.fields.push(field);
            }
            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some(field) = current {
            headers.fields.push(field);
        }
        headers
    }
}

/// Formats a mailbox as `Display Name <address>` or a bare address.
///
/// Names with non-ASCII text become encoded words; names with RFC 5322
/// specials are quoted.
#[must_use]
pub fn format_mailbox(display_name: Option<&str>, address: &str) -> String {
    match display_name.map(str::trim) {
        None | Some("") => address.to_string(),
        Some(name) if needs_rfc2047(name) => format!("{} <{address}>", encode_rfc2047(name)),
        Some(name) if name.contains(|c: char| "()<>[]:;@\\,.\"".contains(c)) => {
            let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\" <{address}>")
        }
        Some(name) => format!("{name} <{address}>"),
    }
}

/// Folds a header line at whitespace so lines stay near 78 characters.
///
/// Values that already carry line breaks are left alone.
fn fold(name: &str, value: &str) -> String {
    let mut out = format!("{name}:");
    if value.contains('\n') {
        out.push(' ');
        out.push_str(value);
        return out;
    }

    let mut column = out.len();
    for (i, word) in value.split(' ').enumerate() {
        if i > 0 && column + 1 + word.len() > FOLD_WIDTH {
            out.push_str("\r\n");
            column = 0;
        }
        out.push(' ');
        out.push_str(word);
        column += 1 + word.len();
    }
    out
}

impl fmt::Display for Headers {
    /// Writes each field as a folded, CRLF-terminated line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{}\r\n", fold(name, value))?;
        }
        Ok(())
    }
}
