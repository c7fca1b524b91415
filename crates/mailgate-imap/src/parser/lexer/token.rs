//! IMAP token types.

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom, including flag names such as `\Seen` and `\*`.
    Atom(&'a str),
    /// Quoted string, unescaped.
    QuotedString(String),
    /// Literal payload `{n}\r\n<n bytes>`.
    Literal(Vec<u8>),
    /// Number; 63-bit values occur in QUOTA responses.
    Number(u64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL`
    Nil,
    /// CRLF.
    Crlf,
    /// End of input.
    Eof,
}
