//! MIME content type and disposition handling.

use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::{decode_charset, decode_rfc2047, needs_rfc2047};
use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lower-cased.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lower-cased.
    pub sub_type: String,
    /// Parameters keyed by lower-cased name.
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_ascii_lowercase(),
            sub_type: sub_type.into().to_ascii_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    /// `text/plain; charset=utf-8`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// `text/html; charset=utf-8`.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// `application/octet-stream`.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks the type and subtype, ignoring case.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type)
            && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Parses a `Content-Type` value: `type/subtype; param1=value1; ...`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();
        let type_str = segments.next().unwrap_or_default();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(m, s)| (m.trim(), s.trim()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(s.trim().to_string()))?;

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = parse_parameters(segments);
        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        write_parameters(f, &self.parameters)
    }
}

/// `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// `inline`, `attachment`, or an extension token, lower-cased.
    pub kind: String,
    /// Parameters keyed by lower-cased name.
    pub parameters: BTreeMap<String, String>,
}

impl ContentDisposition {
    /// `attachment; filename="..."`.
    #[must_use]
    pub fn attachment(filename: &str) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("filename".to_string(), filename.to_string());
        Self {
            kind: "attachment".to_string(),
            parameters,
        }
    }

    /// Returns true for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// The decoded `filename` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }

    /// Parses a `Content-Disposition` value. Never fails: an empty kind means
    /// the header was blank.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut segments = split_parameters(s).into_iter();
        let kind = segments.next().unwrap_or_default().to_ascii_lowercase();
        Self {
            kind,
            parameters: parse_parameters(segments),
        }
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        write_parameters(f, &self.parameters)
    }
}

/// Splits on `;` outside quoted strings, trimming each segment.
fn split_parameters(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    segments.push(current.trim().to_string());
    segments
}

/// Parses `key=value` segments.
///
/// Quoted values are unescaped and RFC 2047 decoded; RFC 2231 extended
/// values (`key*=charset''percent-encoded`) and continuations (`key*0`,
/// `key*1*`) are joined and decoded.
fn parse_parameters(segments: impl Iterator<Item = String>) -> BTreeMap<String, String> {
    let mut plain = BTreeMap::new();
    let mut extended: BTreeMap<String, Vec<(u32, bool, String)>> = BTreeMap::new();

    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim());

        match key.split_once('*') {
            None => {
                plain.insert(key, decode_rfc2047(&value));
            }
            Some((base, rest)) => {
                let encoded = rest.ends_with('*') || rest.is_empty();
                let index = rest.trim_end_matches('*').parse().unwrap_or(0);
                extended
                    .entry(base.to_string())
                    .or_default()
                    .push((index, encoded, value));
            }
        }
    }

    for (key, mut pieces) in extended {
        pieces.sort_by_key(|(index, _, _)| *index);
        let mut charset = String::from("utf-8");
        let mut bytes = Vec::new();
        for (i, (_, encoded, value)) in pieces.iter().enumerate() {
            let mut value = value.as_str();
            if i == 0 && *encoded {
                // charset'language'value
                let mut parts = value.splitn(3, '\'');
                if let (Some(cs), Some(_), Some(v)) = (parts.next(), parts.next(), parts.next()) {
                    if !cs.is_empty() {
                        charset = cs.to_string();
                    }
                    value = v;
                }
            }
            if *encoded {
                bytes.extend(percent_decode(value));
            } else {
                bytes.extend_from_slice(value.as_bytes());
            }
        }
        plain.insert(key, decode_charset(&bytes, &charset));
    }
    plain
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = bytes.get(i + 1..i + 3)
            && let Some(byte) = std::str::from_utf8(hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Writes `; key=value` pairs, quoting or RFC 2047 encoding as needed.
fn write_parameters(
    f: &mut fmt::Formatter<'_>,
    parameters: &BTreeMap<String, String>,
) -> fmt::Result {
    for (key, value) in parameters {
        if needs_rfc2047(value) {
            // RFC 2047 words inside quotes are what most clients expect for filenames.
            let encoded = crate::encoding::encode_rfc2047(value).replace("\r\n ", " ");
            write!(f, "; {key}=\"{encoded}\"")?;
        } else if value.is_empty()
            || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
        {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "; {key}=\"{escaped}\"")?;
        } else {
            write!(f, "; {key}={value}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_plain() {
        let ct = ContentType::text_plain();
        assert!(ct.is("TEXT", "Plain"));
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/HTML; Charset=\"ISO-8859-1\"").unwrap();
        assert_eq!(ct.mime_type(), "text/html");
        assert_eq!(ct.charset(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_content_type_parse_boundary_with_semicolon() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"a;b=c\"; x=1").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("a;b=c"));
        assert_eq!(ct.parameter("X"), Some("1"));
    }

    #[test]
    fn test_content_type_parse_rejects_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("").is_err());
    }

    #[test]
    fn test_display_quotes_specials() {
        let ct = ContentType::new("multipart", "mixed").with_parameter("boundary", "=_x y");
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=\"=_x y\"");
        assert_eq!(ContentType::parse(&ct.to_string()).unwrap(), ct);
    }

    #[test]
    fn test_disposition_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"report 2024.pdf\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename(), Some("report 2024.pdf"));

        let cd = ContentDisposition::parse("INLINE");
        assert!(!cd.is_attachment());
        assert!(cd.filename().is_none());
    }

    #[test]
    fn test_disposition_encoded_filenames() {
        let cd = ContentDisposition::parse("attachment; filename=\"=?utf-8?B?w7xiZXIudHh0?=\"");
        assert_eq!(cd.filename(), Some("über.txt"));

        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''%C3%BCber%20x.txt");
        assert_eq!(cd.filename(), Some("über x.txt"));

        let cd = ContentDisposition::parse(
            "attachment; filename*0*=utf-8''long%20; filename*1=name.txt",
        );
        assert_eq!(cd.filename(), Some("long name.txt"));
    }

    #[test]
    fn test_disposition_display_encodes_non_ascii() {
        let cd = ContentDisposition::attachment("Übersicht.pdf");
        let text = cd.to_string();
        assert!(text.starts_with("attachment; filename=\"=?utf-8?B?"));
        assert_eq!(ContentDisposition::parse(&text).filename(), Some("Übersicht.pdf"));

        let cd = ContentDisposition::attachment("plain.txt");
        assert_eq!(cd.to_string(), "attachment; filename=plain.txt");
    }
}
